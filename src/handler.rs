//! Per-message dispatch: classify the text, run the matching operation
//! against the store / resolver / weather service, render the reply.
//!
//! Each invocation is stateless; no session state is carried between
//! messages. Storage failures collapse to a generic failure reply and a
//! log line — they never escape to the transport.

use std::sync::Arc;

use tracing::{error, info};

use crate::commands::{self, Capabilities, Intent, WeatherTarget};
use crate::format::{self, BatchAddReport};
use crate::resolver::PlaceResolver;
use crate::traits::{
    AddOutcome, CommentOutcome, EditCommentOutcome, ItineraryStore, RemoveOutcome,
};
use crate::types::OwnerId;
use crate::weather::WeatherService;

pub struct MessageHandler {
    store: Arc<dyn ItineraryStore>,
    resolver: PlaceResolver,
    weather: WeatherService,
    caps: Capabilities,
}

impl MessageHandler {
    pub fn new(
        store: Arc<dyn ItineraryStore>,
        resolver: PlaceResolver,
        weather: WeatherService,
        caps: Capabilities,
    ) -> Self {
        Self {
            store,
            resolver,
            weather,
            caps,
        }
    }

    /// Handle one inbound text message and produce the reply text.
    pub async fn handle(&self, owner: &OwnerId, text: &str) -> String {
        let intent = commands::classify(text, self.caps);
        match self.dispatch(owner, intent).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(owner = %owner, error = %e, "command failed");
                format::generic_failure()
            }
        }
    }

    async fn dispatch(&self, owner: &OwnerId, intent: Intent) -> anyhow::Result<String> {
        match intent {
            Intent::AddPlaces(lines) => self.add_places(owner, lines).await,
            Intent::ShowList => Ok(format::render_list(&self.store.list(owner).await?)),
            Intent::ClearRequest => Ok(format::clear_warning()),
            Intent::ClearConfirm => {
                let count = self.store.clear_all(owner).await?;
                info!(owner = %owner, count, "cleared all places");
                Ok(format::cleared(count))
            }
            Intent::DeleteByIndex(index) => {
                match self.store.delete_by_index(owner, index).await? {
                    RemoveOutcome::Removed(record) => Ok(format::deleted(&record.name)),
                    RemoveOutcome::InvalidIndex => Ok(format::invalid_index()),
                }
            }
            Intent::AddComment { index, text } => {
                match self.store.add_comment(owner, index, &text).await? {
                    CommentOutcome::Updated => Ok(format::comment_added(index, &text)),
                    CommentOutcome::InvalidIndex => Ok(format::invalid_index()),
                    CommentOutcome::DuplicateComment => Ok(format::comment_duplicate(index)),
                }
            }
            Intent::EditComment { index, old, new } => {
                match self.store.edit_comment(owner, index, &old, &new).await? {
                    EditCommentOutcome::Updated => Ok(format::comment_edited(index, &old, &new)),
                    EditCommentOutcome::InvalidIndex => Ok(format::invalid_index()),
                    EditCommentOutcome::CommentNotFound => Ok(format::comment_not_found(&old)),
                }
            }
            Intent::WeatherQuery(target) => self.weather_report(owner, target).await,
            Intent::Malformed(usage) => Ok(format::usage(usage)),
            Intent::Help | Intent::Unknown => Ok(format::render_help()),
        }
    }

    /// Batch add: every line is attempted in order; per-line failures are
    /// collected into the report, never propagated.
    async fn add_places(&self, owner: &OwnerId, lines: Vec<String>) -> anyhow::Result<String> {
        let mut report = BatchAddReport::default();
        for line in &lines {
            let place = match self.resolver.resolve(line).await {
                Ok(place) => place,
                Err(failure) => {
                    info!(input = %line, reason = %failure, "input line failed to resolve");
                    report.failed.push(line.clone());
                    continue;
                }
            };
            match self.store.add(owner, &place).await {
                Ok(AddOutcome::Added) => report.added.push(place.name),
                Ok(AddOutcome::DuplicateSkipped) => report.duplicates.push(place.name),
                Err(e) => {
                    error!(owner = %owner, place = %place.name, error = %e, "insert failed");
                    report.failed.push(line.clone());
                }
            }
        }
        Ok(format::render_batch_add(&report))
    }

    async fn weather_report(
        &self,
        owner: &OwnerId,
        target: Option<WeatherTarget>,
    ) -> anyhow::Result<String> {
        match target {
            None => {
                let records = self.store.list(owner).await?;
                let mut reports = Vec::with_capacity(records.len());
                for record in &records {
                    reports
                        .push(self.weather.report_for(&record.name, record.coords()).await);
                }
                Ok(format::render_weather(&reports))
            }
            Some(WeatherTarget::Index(index)) => {
                let records = self.store.list(owner).await?;
                if index == 0 || index > records.len() {
                    return Ok(format::invalid_index());
                }
                let record = &records[index - 1];
                let report = self.weather.report_for(&record.name, record.coords()).await;
                Ok(format::render_weather(std::slice::from_ref(&report)))
            }
            Some(WeatherTarget::Query(query)) => {
                let report = self.weather.report_for_query(&query).await;
                Ok(format::render_weather(std::slice::from_ref(&report)))
            }
        }
    }
}
