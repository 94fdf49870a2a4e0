//! The shared adapter driver. Source adapters only fetch and map; the
//! filter chain, deduplication gate, past-event cutoff, venue split and
//! packaging live here so every source behaves identically.
//!
//! One invocation emits at most one unit: the first record that clears
//! every filter is packaged and returned immediately, and the remaining
//! records wait for the next scheduled invocation. This bounds the work
//! per run and spreads a large backlog across many ticks; do not "fix" it.

use crate::config::Settings;
use crate::context::{store_venue_context, JobContextStore};
use crate::error::Result;
use crate::http::HttpFetcher;
use crate::identifier;
use crate::sanitize;
use crate::tracker::ProcessedItemTracker;
use crate::types::{FetchContext, OutputUnit, RawRecord, StandardizedEvent, UnitContent, UnitMetadata};
use crate::venue;
use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, error, info, warn};

/// Environment handed to adapters during a fetch.
pub struct SourceEnv<'a> {
    pub http: &'a HttpFetcher,
    pub settings: &'a Settings,
}

/// Injected collaborators for one pipeline invocation.
pub struct Collaborators<'a> {
    pub http: &'a HttpFetcher,
    pub settings: &'a Settings,
    pub tracker: &'a dyn ProcessedItemTracker,
    pub job_context: &'a dyn JobContextStore,
}

/// Core trait every event source implements. Adapters handle validation,
/// transport and field mapping; everything else is the driver's job.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Unique identifier for this source type
    fn source_type(&self) -> &'static str;

    /// Check required handler config; a failure here is a configuration
    /// error the adapter will not retry.
    fn validate_config(&self, config: &serde_json::Value) -> Result<()>;

    /// Fetch raw records from the external source, in source order.
    async fn fetch_raw(&self, ctx: &FetchContext, env: &SourceEnv<'_>) -> Result<Vec<RawRecord>>;

    /// Map one raw record to the standardized schema. `None` discards the
    /// record silently.
    fn map_record(&self, record: &RawRecord, ctx: &FetchContext) -> Option<StandardizedEvent>;
}

fn config_str<'a>(config: &'a serde_json::Value, key: &str) -> &'a str {
    config.get(key).and_then(|v| v.as_str()).unwrap_or("")
}

/// Runs one scheduled invocation of a source. Never propagates an error:
/// configuration, transport and parse failures are logged and degrade to
/// an empty result, to be retried implicitly on the next tick.
pub async fn run_source(
    source: &dyn EventSource,
    ctx: &FetchContext,
    collab: &Collaborators<'_>,
) -> Vec<OutputUnit> {
    if let Err(e) = source.validate_config(&ctx.config) {
        warn!(source = source.source_type(), "Invalid handler config: {e}");
        return Vec::new();
    }

    let env = SourceEnv {
        http: collab.http,
        settings: collab.settings,
    };
    let records = match source.fetch_raw(ctx, &env).await {
        Ok(records) => records,
        Err(e) => {
            error!(source = source.source_type(), "Fetch failed: {e}");
            return Vec::new();
        }
    };
    debug!(
        source = source.source_type(),
        count = records.len(),
        "Fetched raw records"
    );

    let today = collab.settings.today();
    let scope = ctx.dedup_scope();
    let include_csv = config_str(&ctx.config, "include_keywords");
    let exclude_csv = config_str(&ctx.config, "exclude_keywords");

    for record in &records {
        let Some(mut event) = source.map_record(record, ctx) else {
            continue;
        };

        event.title = sanitize::sanitize_text(&event.title);
        if event.title.is_empty()
            || sanitize::is_skip_title(&event.title, &collab.settings.skip_titles)
        {
            continue;
        }

        let search_text = format!("{} {}", event.title, event.description);
        if !sanitize::keyword_match(&search_text, include_csv) {
            continue;
        }
        if sanitize::keyword_excluded(&search_text, exclude_csv) {
            continue;
        }

        let event_identifier = identifier::generate(&event.title, &event.start_date, &event.venue);

        match collab.tracker.is_processed(&event_identifier, &scope).await {
            Ok(true) => continue,
            Ok(false) => {}
            Err(e) => {
                error!(source = source.source_type(), "Processed-item lookup failed: {e}");
                return Vec::new();
            }
        }

        if sanitize::is_past_event(&event.start_date, today) {
            debug!(title = %event.title, date = %event.start_date, "Skipping past event");
            continue;
        }

        if let Err(e) = collab
            .tracker
            .mark_processed(&event_identifier, &scope, ctx.job_id.as_deref())
            .await
        {
            error!(source = source.source_type(), "Failed to mark item processed: {e}");
            return Vec::new();
        }

        // URLs and coordinates pass the shared gates before the event
        // leaves the adapter; anything malformed is cleared, not fixed.
        event.ticket_url = sanitize::sanitize_url(&event.ticket_url);
        event.source_url = sanitize::sanitize_url(&event.source_url);
        event.image = sanitize::sanitize_url(&event.image);
        event.venue_website = sanitize::sanitize_url(&event.venue_website);
        if !event.venue_coordinates.is_empty()
            && sanitize::parse_coordinates(&event.venue_coordinates).is_none()
        {
            event.venue_coordinates.clear();
        }

        let venue_metadata = venue::extract_venue_metadata(&event);
        if let Some(job_id) = ctx.job_id.as_deref() {
            if let Err(e) =
                store_venue_context(collab.job_context, job_id, &event, &venue_metadata).await
            {
                warn!(source = source.source_type(), "Venue context merge failed: {e}");
            }
        }

        let original_title = event.title.clone();
        let imported_at = chrono::Utc::now();
        venue::strip_venue_metadata(&mut event);

        let body = json!({
            "event": event,
            "venue_metadata": venue_metadata,
            "provenance": {
                "source_type": source.source_type(),
                "imported_at": imported_at,
            },
        })
        .to_string();

        info!(
            source = source.source_type(),
            title = %original_title,
            identifier = %event_identifier,
            "Emitting one event"
        );

        // Single-item-per-invocation policy: remaining records are picked
        // up on later ticks once this one is marked processed.
        return vec![OutputUnit {
            content: UnitContent {
                title: original_title.clone(),
                body,
            },
            metadata: UnitMetadata {
                source_type: source.source_type().to_string(),
                pipeline_id: ctx.pipeline_id,
                flow_id: ctx.flow_id,
                original_title,
                event_identifier,
                import_timestamp: imported_at,
            },
        }];
    }

    debug!(source = source.source_type(), "No record survived the filters");
    Vec::new()
}
