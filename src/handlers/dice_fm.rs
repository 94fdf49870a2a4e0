//! Dice.fm partner events API adapter.

use crate::error::{HarvestError, Result};
use crate::handlers::{optional_str, required_str};
use crate::mapping::{self, FieldPaths};
use crate::pipeline::{EventSource, SourceEnv};
use crate::types::{FetchContext, RawRecord, StandardizedEvent};
use tracing::{info, instrument};

const EVENTS_ENDPOINT: &str = "https://partners-endpoint.dice.fm/api/v2/events";

const FIELD_MAP: FieldPaths = &[
    ("title", &["/name"]),
    ("description", &["/description"]),
    ("venue", &["/venues/0/name"]),
    ("venue_city", &["/venues/0/city/name"]),
    ("venue_country", &["/venues/0/city/country_name"]),
    ("ticket_url", &["/url"]),
    ("source_url", &["/url"]),
    ("image", &["/event_images/square", "/event_images/landscape"]),
    ("performer", &["/artists/0/name"]),
];

pub struct DiceFmSource;

impl DiceFmSource {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DiceFmSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl EventSource for DiceFmSource {
    fn source_type(&self) -> &'static str {
        super::DICE_FM
    }

    fn validate_config(&self, config: &serde_json::Value) -> Result<()> {
        required_str(config, "api_key")?;
        Ok(())
    }

    #[instrument(skip(self, ctx, env))]
    async fn fetch_raw(&self, ctx: &FetchContext, env: &SourceEnv<'_>) -> Result<Vec<RawRecord>> {
        let api_key = required_str(&ctx.config, "api_key")?;
        let mut url = format!("{EVENTS_ENDPOINT}?page[size]=50");
        let city = optional_str(&ctx.config, "city");
        if !city.is_empty() {
            url.push_str(&format!("&filter[cities][]={city}"));
        }

        let data = env
            .http
            .get_json_with(&url, &[("x-api-key", api_key.as_str())])
            .await?;
        let events = data
            .get("data")
            .and_then(|v| v.as_array())
            .ok_or_else(|| HarvestError::MissingField("data array not found".into()))?;

        info!("Fetched {} events from Dice.fm", events.len());
        Ok(events.to_vec())
    }

    fn map_record(&self, record: &RawRecord, _ctx: &FetchContext) -> Option<StandardizedEvent> {
        let mut event = mapping::apply(FIELD_MAP, record);

        if let Some(start) = record
            .pointer("/dates/event_start_date")
            .or_else(|| record.get("date"))
            .and_then(|v| v.as_str())
        {
            let (date, time) = mapping::split_datetime(start);
            event.start_date = date;
            event.start_time = time;
        }
        if let Some(end) = record
            .pointer("/dates/event_end_date")
            .and_then(|v| v.as_str())
        {
            let (date, time) = mapping::split_datetime(end);
            event.end_date = date;
            event.end_time = time;
        }

        // Ticket prices are integer cents
        if let Some(amount) = record
            .pointer("/ticket_types/0/price/amount")
            .and_then(|v| v.as_i64())
        {
            event.price = format!("{:.2}", amount as f64 / 100.0);
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
            config: json!({"api_key": "k"}),
            flow_step_id: None,
            flow_id: 1,
            job_id: None,
        }
    }

    #[test]
    fn maps_dice_record_with_cent_prices() {
        let record = json!({
            "name": "Club Night",
            "url": "https://dice.fm/event/abc",
            "dates": {
                "event_start_date": "2026-06-12T22:00:00Z",
                "event_end_date": "2026-06-13T03:00:00Z"
            },
            "venues": [{"name": "Substation", "city": {"name": "Seattle", "country_name": "United States"}}],
            "ticket_types": [{"price": {"amount": 1550}}],
            "event_images": {"square": "https://img.example/sq.jpg"}
        });
        let event = DiceFmSource::new().map_record(&record, &ctx()).unwrap();
        assert_eq!(event.title, "Club Night");
        assert_eq!(event.start_date, "2026-06-12");
        assert_eq!(event.start_time, "22:00");
        assert_eq!(event.end_date, "2026-06-13");
        assert_eq!(event.price, "15.50");
        assert_eq!(event.venue, "Substation");
    }

    #[test]
    fn validate_config_requires_api_key() {
        assert!(DiceFmSource::new().validate_config(&json!({})).is_err());
    }
}
