//! Ticketmaster Discovery API v2 adapter.

use crate::error::{HarvestError, Result};
use crate::handlers::{optional_str, required_str};
use crate::mapping::{self, FieldPaths};
use crate::pipeline::{EventSource, SourceEnv};
use crate::types::{FetchContext, RawRecord, StandardizedEvent};
use tracing::{info, instrument};

const EVENTS_ENDPOINT: &str = "https://app.ticketmaster.com/discovery/v2/events.json";

const FIELD_MAP: FieldPaths = &[
    ("title", &["/name"]),
    ("description", &["/info", "/description", "/pleaseNote"]),
    ("start_date", &["/dates/start/localDate"]),
    ("end_date", &["/dates/end/localDate"]),
    ("venue", &["/_embedded/venues/0/name"]),
    ("venue_address", &["/_embedded/venues/0/address/line1"]),
    ("venue_city", &["/_embedded/venues/0/city/name"]),
    ("venue_state", &["/_embedded/venues/0/state/stateCode"]),
    ("venue_zip", &["/_embedded/venues/0/postalCode"]),
    ("venue_country", &["/_embedded/venues/0/country/countryCode"]),
    ("venue_website", &["/_embedded/venues/0/url"]),
    ("ticket_url", &["/url"]),
    ("source_url", &["/url"]),
    ("image", &["/images/0/url"]),
    ("performer", &["/_embedded/attractions/0/name"]),
];

pub struct TicketmasterSource;

impl TicketmasterSource {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TicketmasterSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl EventSource for TicketmasterSource {
    fn source_type(&self) -> &'static str {
        super::TICKETMASTER
    }

    fn validate_config(&self, config: &serde_json::Value) -> Result<()> {
        required_str(config, "api_key")?;
        Ok(())
    }

    #[instrument(skip(self, ctx, env))]
    async fn fetch_raw(&self, ctx: &FetchContext, env: &SourceEnv<'_>) -> Result<Vec<RawRecord>> {
        let api_key = required_str(&ctx.config, "api_key")?;
        let mut url = format!("{EVENTS_ENDPOINT}?apikey={api_key}&sort=date,asc&size=50");

        let city = optional_str(&ctx.config, "city");
        if !city.is_empty() {
            url.push_str(&format!("&city={city}"));
        }
        let geo_point = optional_str(&ctx.config, "geo_point");
        if !geo_point.is_empty() {
            url.push_str(&format!("&geoPoint={geo_point}"));
        }
        let classification = optional_str(&ctx.config, "classification");
        if !classification.is_empty() {
            url.push_str(&format!("&classificationName={classification}"));
        }

        let data = env.http.get_json(&url).await?;
        let events = data
            .pointer("/_embedded/events")
            .and_then(|v| v.as_array())
            .ok_or_else(|| HarvestError::MissingField("_embedded.events not found".into()))?;

        info!("Fetched {} events from Ticketmaster", events.len());
        Ok(events.to_vec())
    }

    fn map_record(&self, record: &RawRecord, _ctx: &FetchContext) -> Option<StandardizedEvent> {
        let mut event = mapping::apply(FIELD_MAP, record);

        // localTime is HH:MM:SS
        if let Some(time) = record
            .pointer("/dates/start/localTime")
            .and_then(|v| v.as_str())
        {
            event.start_time = time.chars().take(5).collect();
        }

        if let (Some(lat), Some(lng)) = (
            record.pointer("/_embedded/venues/0/location/latitude"),
            record.pointer("/_embedded/venues/0/location/longitude"),
        ) {
            let lat = lat.as_str().map(str::to_string).or_else(|| lat.as_f64().map(|f| f.to_string()));
            let lng = lng.as_str().map(str::to_string).or_else(|| lng.as_f64().map(|f| f.to_string()));
            if let (Some(lat), Some(lng)) = (lat, lng) {
                event.venue_coordinates = format!("{lat},{lng}");
            }
        }

        if let Some(min) = record.pointer("/priceRanges/0/min").and_then(|v| v.as_f64()) {
            event.price = format!("{min:.2}");
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
    fn validate_config_requires_api_key() {
        let source = TicketmasterSource::new();
        assert!(source.validate_config(&json!({"api_key": "abc"})).is_ok());
        assert!(source.validate_config(&json!({"api_key": ""})).is_err());
        assert!(source.validate_config(&json!({})).is_err());
    }

    #[test]
    fn maps_discovery_record() {
        let record = json!({
            "name": "Jazz Night",
            "url": "https://www.ticketmaster.com/event/1",
            "info": "An evening of jazz",
            "images": [{"url": "https://img.example/1.jpg"}],
            "priceRanges": [{"min": 25.0, "max": 60.0}],
            "dates": {"start": {"localDate": "2026-05-01", "localTime": "19:30:00"}},
            "_embedded": {
                "venues": [{
                    "name": "Blue Room",
                    "postalCode": "98101",
                    "city": {"name": "Seattle"},
                    "state": {"stateCode": "WA"},
                    "country": {"countryCode": "US"},
                    "address": {"line1": "123 Pine St"},
                    "location": {"latitude": "47.61", "longitude": "-122.33"}
                }],
                "attractions": [{"name": "The Quartet"}]
            }
        });
        let event = TicketmasterSource::new().map_record(&record, &ctx()).unwrap();
        assert_eq!(event.title, "Jazz Night");
        assert_eq!(event.start_date, "2026-05-01");
        assert_eq!(event.start_time, "19:30");
        assert_eq!(event.venue, "Blue Room");
        assert_eq!(event.venue_coordinates, "47.61,-122.33");
        assert_eq!(event.price, "25.00");
        assert_eq!(event.performer, "The Quartet");
    }
}
