//! GoDaddy Websites + Marketing calendar adapter. The site widget exposes
//! a plain JSON feed of calendar entries.

use crate::error::{HarvestError, Result};
use crate::handlers::required_str;
use crate::mapping::{self, FieldPaths};
use crate::pipeline::{EventSource, SourceEnv};
use crate::types::{FetchContext, RawRecord, StandardizedEvent};
use tracing::{info, instrument};

const FIELD_MAP: FieldPaths = &[
    ("title", &["/title", "/name"]),
    ("description", &["/desc", "/description"]),
    ("ticket_url", &["/url"]),
    ("source_url", &["/url"]),
];

pub struct GoDaddySource;

impl GoDaddySource {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GoDaddySource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl EventSource for GoDaddySource {
    fn source_type(&self) -> &'static str {
        super::GODADDY
    }

    fn validate_config(&self, config: &serde_json::Value) -> Result<()> {
        required_str(config, "url")?;
        Ok(())
    }

    #[instrument(skip(self, ctx, env))]
    async fn fetch_raw(&self, ctx: &FetchContext, env: &SourceEnv<'_>) -> Result<Vec<RawRecord>> {
        let url = required_str(&ctx.config, "url")?;
        let data = env.http.get_json(&url).await?;

        let records = if let Some(events) = data.get("events").and_then(|v| v.as_array()) {
            events.to_vec()
        } else if let Some(events) = data.get("data").and_then(|v| v.as_array()) {
            events.to_vec()
        } else if let Some(items) = data.as_array() {
            items.to_vec()
        } else {
            return Err(HarvestError::MissingField("events array not found".into()));
        };

        info!("Fetched {} events from GoDaddy calendar", records.len());
        Ok(records)
    }

    fn map_record(&self, record: &RawRecord, _ctx: &FetchContext) -> Option<StandardizedEvent> {
        let mut event = mapping::apply(FIELD_MAP, record);

        if let Some(start) = record
            .get("start")
            .or_else(|| record.get("startDate"))
            .and_then(|v| v.as_str())
        {
            let (date, time) = mapping::split_datetime(start);
            event.start_date = date;
            event.start_time = time;
        }
        if let Some(end) = record
            .get("end")
            .or_else(|| record.get("endDate"))
            .and_then(|v| v.as_str())
        {
            let (date, time) = mapping::split_datetime(end);
            event.end_date = date;
            event.end_time = time;
        }

        // Location is a single free-form line
        if let Some(location) = record.get("location").and_then(|v| v.as_str()) {
            match location.split_once(',') {
                Some((name, rest)) => {
                    event.venue = name.trim().to_string();
                    event.venue_address = rest.trim().to_string();
                }
                None => event.venue = location.trim().to_string(),
            }
        }

        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_calendar_entry() {
        let ctx = FetchContext {
            pipeline_id: 1,
            config: json!({"url": "https://site.example/calendar.json"}),
            flow_step_id: None,
            flow_id: 1,
            job_id: None,
        };
        let record = json!({
            "title": "Wine Tasting",
            "desc": "Five pours",
            "start": "2026-09-18T18:00:00",
            "end": "2026-09-18T20:00:00",
            "location": "The Cellar, 12 Vine St",
            "url": "https://site.example/wine"
        });
        let event = GoDaddySource::new().map_record(&record, &ctx).unwrap();
        assert_eq!(event.title, "Wine Tasting");
        assert_eq!(event.start_date, "2026-09-18");
        assert_eq!(event.start_time, "18:00");
        assert_eq!(event.venue, "The Cellar");
        assert_eq!(event.venue_address, "12 Vine St");
    }
}
