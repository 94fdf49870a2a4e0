//! Google Calendar v3 adapter: public calendars read with an API key.

use crate::error::{HarvestError, Result};
use crate::handlers::required_str;
use crate::mapping::{self, FieldPaths};
use crate::pipeline::{EventSource, SourceEnv};
use crate::types::{FetchContext, RawRecord, StandardizedEvent};
use tracing::{info, instrument};

const FIELD_MAP: FieldPaths = &[
    ("title", &["/summary"]),
    ("description", &["/description"]),
    ("source_url", &["/htmlLink"]),
    ("organizer", &["/organizer/displayName"]),
];

pub struct GoogleCalendarSource;

impl GoogleCalendarSource {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GoogleCalendarSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Google packs start/end as either `{"date": ...}` (all-day) or
/// `{"dateTime": ...}`.
fn calendar_datetime(record: &RawRecord, key: &str) -> (String, String) {
    if let Some(date) = record
        .pointer(&format!("/{key}/date"))
        .and_then(|v| v.as_str())
    {
        return (date.to_string(), String::new());
    }
    if let Some(datetime) = record
        .pointer(&format!("/{key}/dateTime"))
        .and_then(|v| v.as_str())
    {
        return mapping::split_datetime(datetime);
    }
    (String::new(), String::new())
}

#[async_trait::async_trait]
impl EventSource for GoogleCalendarSource {
    fn source_type(&self) -> &'static str {
        super::GOOGLE_CALENDAR
    }

    fn validate_config(&self, config: &serde_json::Value) -> Result<()> {
        required_str(config, "calendar_id")?;
        required_str(config, "api_key")?;
        Ok(())
    }

    #[instrument(skip(self, ctx, env))]
    async fn fetch_raw(&self, ctx: &FetchContext, env: &SourceEnv<'_>) -> Result<Vec<RawRecord>> {
        let calendar_id = required_str(&ctx.config, "calendar_id")?;
        let api_key = required_str(&ctx.config, "api_key")?;
        let time_min = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        let url = format!(
            "https://www.googleapis.com/calendar/v3/calendars/{}/events?key={}&singleEvents=true&orderBy=startTime&maxResults=50&timeMin={}",
            calendar_id.replace('@', "%40"),
            api_key,
            time_min
        );

        let data = env.http.get_json(&url).await?;
        let items = data
            .get("items")
            .and_then(|v| v.as_array())
            .ok_or_else(|| HarvestError::MissingField("items array not found".into()))?;

        info!("Fetched {} events from Google Calendar", items.len());
        Ok(items.to_vec())
    }

    fn map_record(&self, record: &RawRecord, _ctx: &FetchContext) -> Option<StandardizedEvent> {
        // Cancelled occurrences come through with a status and no summary
        if record.get("status").and_then(|v| v.as_str()) == Some("cancelled") {
            return None;
        }

        let mut event = mapping::apply(FIELD_MAP, record);

        let (start_date, start_time) = calendar_datetime(record, "start");
        let (end_date, end_time) = calendar_datetime(record, "end");
        event.start_date = start_date;
        event.start_time = start_time;
        event.end_date = end_date;
        event.end_time = end_time;

        // A calendar "location" is one free-form line: the first comma
        // segment names the venue, the remainder is the address.
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

    fn ctx() -> FetchContext {
        FetchContext {
            pipeline_id: 1,
            config: json!({"calendar_id": "c@group.calendar.google.com", "api_key": "k"}),
            flow_step_id: None,
            flow_id: 1,
            job_id: None,
        }
    }

    #[test]
    fn maps_timed_event_and_splits_location() {
        let record = json!({
            "summary": "Open Mic",
            "description": "Signups at 7",
            "location": "Blue Room, 123 Pine St, Seattle, WA",
            "htmlLink": "https://calendar.google.com/event?eid=1",
            "start": {"dateTime": "2026-04-03T19:00:00-07:00"},
            "end": {"dateTime": "2026-04-03T22:00:00-07:00"}
        });
        let event = GoogleCalendarSource::new().map_record(&record, &ctx()).unwrap();
        assert_eq!(event.title, "Open Mic");
        assert_eq!(event.start_date, "2026-04-03");
        assert_eq!(event.start_time, "19:00");
        assert_eq!(event.end_time, "22:00");
        assert_eq!(event.venue, "Blue Room");
        assert_eq!(event.venue_address, "123 Pine St, Seattle, WA");
    }

    #[test]
    fn all_day_events_have_empty_times() {
        let record = json!({
            "summary": "Street Fair",
            "start": {"date": "2026-07-04"},
            "end": {"date": "2026-07-05"}
        });
        let event = GoogleCalendarSource::new().map_record(&record, &ctx()).unwrap();
        assert_eq!(event.start_date, "2026-07-04");
        assert!(event.start_time.is_empty());
    }

    #[test]
    fn cancelled_occurrences_are_discarded() {
        let record = json!({"status": "cancelled", "summary": "Gone"});
        assert!(GoogleCalendarSource::new().map_record(&record, &ctx()).is_none());
    }
}
