use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{LatLng, OwnerId};

/// Separator joining comment entries in storage and in rendered lists
/// (full-width pipe, U+FF5C).
pub const COMMENT_SEPARATOR: char = '｜';

/// A stored place, scoped to one owner.
///
/// `name` is the canonical display name after title cleaning; together with
/// the owner it forms the dedup identity. Coordinates are optional: a place
/// that failed geocoding is kept without them and sorts with a latitude
/// fallback of 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceRecord {
    pub id: i64,
    pub owner: String,
    pub name: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub comments: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl PlaceRecord {
    pub fn coords(&self) -> Option<LatLng> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(LatLng { lat, lng }),
            _ => None,
        }
    }
}

/// A resolved place, ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceCandidate {
    pub name: String,
    pub coords: Option<LatLng>,
}

/// Outcome of an insert. A second insert of the same cleaned name for the
/// same owner is skipped, never overwritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    DuplicateSkipped,
}

/// Outcome of an index-addressed delete.
#[derive(Debug, Clone)]
pub enum RemoveOutcome {
    Removed(PlaceRecord),
    InvalidIndex,
}

/// Outcome of appending a comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentOutcome {
    Updated,
    InvalidIndex,
    DuplicateComment,
}

/// Outcome of replacing one comment entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditCommentOutcome {
    Updated,
    InvalidIndex,
    CommentNotFound,
}

/// Per-owner ordered collection of place records.
///
/// The 1-based index shown to users is derived from the latitude-ascending
/// sorted view and is only valid for the lifetime of one command:
/// index-addressed operations re-fetch and re-sort before resolving the
/// index, then mutate by stored identity, not by position.
#[async_trait]
pub trait ItineraryStore: Send + Sync {
    async fn add(&self, owner: &OwnerId, place: &PlaceCandidate) -> anyhow::Result<AddOutcome>;

    /// Records sorted by latitude ascending (south to north), missing
    /// latitude treated as 0, creation order as tie-break.
    async fn list(&self, owner: &OwnerId) -> anyhow::Result<Vec<PlaceRecord>>;

    async fn delete_by_index(
        &self,
        owner: &OwnerId,
        index: usize,
    ) -> anyhow::Result<RemoveOutcome>;

    async fn add_comment(
        &self,
        owner: &OwnerId,
        index: usize,
        text: &str,
    ) -> anyhow::Result<CommentOutcome>;

    async fn edit_comment(
        &self,
        owner: &OwnerId,
        index: usize,
        old: &str,
        new: &str,
    ) -> anyhow::Result<EditCommentOutcome>;

    /// Deletes every record for the owner. Only called after the two-step
    /// confirmation. Returns the number of records removed.
    async fn clear_all(&self, owner: &OwnerId) -> anyhow::Result<u64>;
}

/// Administrative subdivision joining coordinates to forecast data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct District {
    /// County/city level, e.g. `臺北市`.
    pub county: String,
    /// Township level when the geocoder provides one, e.g. `信義區`.
    pub township: Option<String>,
}

/// Free-text place search plus forward and reverse geocoding.
#[async_trait]
pub trait PlaceDirectory: Send + Sync {
    /// Canonical display name for a free-text query, if the upstream search
    /// has any candidate.
    async fn find_place(&self, query: &str) -> anyhow::Result<Option<String>>;

    async fn geocode(&self, query: &str) -> anyhow::Result<Option<LatLng>>;

    async fn reverse_district(&self, coords: LatLng) -> anyhow::Result<Option<District>>;
}

/// One forecast period (today / tomorrow).
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodForecast {
    pub label: String,
    pub description: String,
    pub min_temp: Option<f64>,
    pub max_temp: Option<f64>,
    /// Precipitation probability in percent.
    pub rain_chance: Option<u8>,
}

/// Short-horizon conditions for a township.
#[derive(Debug, Clone, PartialEq)]
pub struct Nowcast {
    pub temperature: Option<f64>,
    pub rain_chance: Option<u8>,
}

/// Forecast and nowcast data keyed by administrative district name.
#[async_trait]
pub trait ForecastSource: Send + Sync {
    /// Next-two-period summary for a county/city. `None` when the dataset
    /// has no entry for that name.
    async fn forecast(&self, county: &str) -> anyhow::Result<Option<Vec<PeriodForecast>>>;

    /// Immediate conditions for a township. `None` when the dataset has no
    /// entry for that name.
    async fn nowcast(&self, township: &str) -> anyhow::Result<Option<Nowcast>>;
}

/// Outbound messaging gateway: delivers at most one reply per inbound event,
/// addressed by its single-use reply token.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn reply(&self, reply_token: &str, text: &str) -> anyhow::Result<()>;
}
