//! SQLite-backed itinerary store.
//!
//! Concurrency note: handlers are stateless per invocation and take no
//! in-process locks; the pool's per-statement atomicity is the only
//! serialization. Dedup is enforced by the `UNIQUE(owner_id, name)`
//! constraint so concurrent inserts of the same name cannot both land.
//! Index-addressed operations re-fetch the sorted view and then mutate by
//! row id — two separate statements, racy by design against concurrent
//! edits from the same owner.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::info;

use crate::traits::{
    AddOutcome, CommentOutcome, EditCommentOutcome, ItineraryStore, PlaceCandidate, PlaceRecord,
    RemoveOutcome, COMMENT_SEPARATOR,
};
use crate::types::OwnerId;

pub struct SqliteItineraryStore {
    pool: SqlitePool,
}

impl SqliteItineraryStore {
    pub async fn new(db_path: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        migrate(&pool).await?;
        Ok(Self { pool })
    }
}

/// Idempotent migration, safe to run on every start.
async fn migrate(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS places (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_id TEXT NOT NULL,
            name TEXT NOT NULL,
            lat REAL,
            lng REAL,
            comment TEXT,
            created_at TEXT NOT NULL,
            UNIQUE(owner_id, name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_places_owner ON places(owner_id, lat)")
        .execute(pool)
        .await?;

    info!("Places table migration complete");
    Ok(())
}

fn join_comments(comments: &[String]) -> Option<String> {
    if comments.is_empty() {
        None
    } else {
        Some(comments.join(&COMMENT_SEPARATOR.to_string()))
    }
}

fn split_comments(raw: Option<String>) -> Vec<String> {
    match raw {
        Some(s) if !s.is_empty() => s.split(COMMENT_SEPARATOR).map(str::to_string).collect(),
        _ => Vec::new(),
    }
}

fn record_from_row(row: &SqliteRow) -> anyhow::Result<PlaceRecord> {
    let created_raw: String = row.try_get("created_at")?;
    let created_at = DateTime::parse_from_rfc3339(&created_raw)?.with_timezone(&Utc);
    Ok(PlaceRecord {
        id: row.try_get("id")?,
        owner: row.try_get("owner_id")?,
        name: row.try_get("name")?,
        lat: row.try_get("lat")?,
        lng: row.try_get("lng")?,
        comments: split_comments(row.try_get("comment")?),
        created_at,
    })
}

#[async_trait]
impl ItineraryStore for SqliteItineraryStore {
    async fn add(&self, owner: &OwnerId, place: &PlaceCandidate) -> anyhow::Result<AddOutcome> {
        let result = sqlx::query(
            "INSERT INTO places (owner_id, name, lat, lng, comment, created_at)
             VALUES (?, ?, ?, ?, NULL, ?)
             ON CONFLICT(owner_id, name) DO NOTHING",
        )
        .bind(owner.as_key())
        .bind(&place.name)
        .bind(place.coords.map(|c| c.lat))
        .bind(place.coords.map(|c| c.lng))
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(if result.rows_affected() == 0 {
            AddOutcome::DuplicateSkipped
        } else {
            AddOutcome::Added
        })
    }

    async fn list(&self, owner: &OwnerId) -> anyhow::Result<Vec<PlaceRecord>> {
        let rows = sqlx::query(
            "SELECT id, owner_id, name, lat, lng, comment, created_at
             FROM places
             WHERE owner_id = ?
             ORDER BY COALESCE(lat, 0.0) ASC, id ASC",
        )
        .bind(owner.as_key())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(record_from_row).collect()
    }

    async fn delete_by_index(
        &self,
        owner: &OwnerId,
        index: usize,
    ) -> anyhow::Result<RemoveOutcome> {
        let records = self.list(owner).await?;
        if index == 0 || index > records.len() {
            return Ok(RemoveOutcome::InvalidIndex);
        }
        // Delete by stored identity, not by position.
        let record = records[index - 1].clone();
        sqlx::query("DELETE FROM places WHERE id = ?")
            .bind(record.id)
            .execute(&self.pool)
            .await?;
        Ok(RemoveOutcome::Removed(record))
    }

    async fn add_comment(
        &self,
        owner: &OwnerId,
        index: usize,
        text: &str,
    ) -> anyhow::Result<CommentOutcome> {
        let records = self.list(owner).await?;
        if index == 0 || index > records.len() {
            return Ok(CommentOutcome::InvalidIndex);
        }
        let record = &records[index - 1];
        if record.comments.iter().any(|c| c == text) {
            return Ok(CommentOutcome::DuplicateComment);
        }
        let mut comments = record.comments.clone();
        comments.push(text.to_string());
        sqlx::query("UPDATE places SET comment = ? WHERE id = ?")
            .bind(join_comments(&comments))
            .bind(record.id)
            .execute(&self.pool)
            .await?;
        Ok(CommentOutcome::Updated)
    }

    async fn edit_comment(
        &self,
        owner: &OwnerId,
        index: usize,
        old: &str,
        new: &str,
    ) -> anyhow::Result<EditCommentOutcome> {
        let records = self.list(owner).await?;
        if index == 0 || index > records.len() {
            return Ok(EditCommentOutcome::InvalidIndex);
        }
        let record = &records[index - 1];
        let Some(pos) = record.comments.iter().position(|c| c == old) else {
            return Ok(EditCommentOutcome::CommentNotFound);
        };
        // Replace the first exact match only; order and the other entries
        // stay untouched.
        let mut comments = record.comments.clone();
        comments[pos] = new.to_string();
        sqlx::query("UPDATE places SET comment = ? WHERE id = ?")
            .bind(join_comments(&comments))
            .bind(record.id)
            .execute(&self.pool)
            .await?;
        Ok(EditCommentOutcome::Updated)
    }

    async fn clear_all(&self, owner: &OwnerId) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM places WHERE owner_id = ?")
            .bind(owner.as_key())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
