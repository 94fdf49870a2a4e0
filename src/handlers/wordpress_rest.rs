//! Generic WordPress REST adapter. Understands The Events Calendar's
//! `/wp-json/tribe/events/v1/events` shape as well as plain REST
//! collections whose items carry `title.rendered`.

use crate::error::{HarvestError, Result};
use crate::handlers::required_str;
use crate::mapping::{self, FieldPaths};
use crate::pipeline::{EventSource, SourceEnv};
use crate::sanitize;
use crate::types::{FetchContext, RawRecord, StandardizedEvent};
use tracing::{info, instrument};

const FIELD_MAP: FieldPaths = &[
    ("title", &["/title/rendered", "/title"]),
    (
        "description",
        &["/description", "/excerpt/rendered", "/content/rendered"],
    ),
    ("venue", &["/venue/venue"]),
    ("venue_address", &["/venue/address"]),
    ("venue_city", &["/venue/city"]),
    ("venue_state", &["/venue/state_province", "/venue/state"]),
    ("venue_zip", &["/venue/zip"]),
    ("venue_country", &["/venue/country"]),
    ("venue_phone", &["/venue/phone"]),
    ("venue_website", &["/venue/website"]),
    ("ticket_url", &["/website", "/url"]),
    ("source_url", &["/url", "/link"]),
    ("image", &["/image/url"]),
    ("price", &["/cost"]),
    ("organizer", &["/organizer/0/organizer"]),
];

pub struct WordPressRestSource;

impl WordPressRestSource {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WordPressRestSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl EventSource for WordPressRestSource {
    fn source_type(&self) -> &'static str {
        super::WORDPRESS_REST
    }

    fn validate_config(&self, config: &serde_json::Value) -> Result<()> {
        required_str(config, "url")?;
        Ok(())
    }

    #[instrument(skip(self, ctx, env))]
    async fn fetch_raw(&self, ctx: &FetchContext, env: &SourceEnv<'_>) -> Result<Vec<RawRecord>> {
        let mut url = required_str(&ctx.config, "url")?;
        // A bare site URL gets the standard Events Calendar route
        if !url.contains("/wp-json") {
            url = format!(
                "{}/wp-json/tribe/events/v1/events",
                url.trim_end_matches('/')
            );
        }

        let data = env.http.get_json(&url).await?;
        let records = if let Some(events) = data.get("events").and_then(|v| v.as_array()) {
            events.to_vec()
        } else if let Some(items) = data.as_array() {
            items.to_vec()
        } else {
            return Err(HarvestError::MissingField(
                "neither an events array nor a collection found".into(),
            ));
        };

        info!("Fetched {} events from WordPress REST", records.len());
        Ok(records)
    }

    fn map_record(&self, record: &RawRecord, _ctx: &FetchContext) -> Option<StandardizedEvent> {
        let mut event = mapping::apply(FIELD_MAP, record);
        // Rendered fields arrive as HTML fragments
        event.description = sanitize::clean_html(&event.description);

        if let Some(start) = record.get("start_date").and_then(|v| v.as_str()) {
            let (date, time) = mapping::split_datetime(start);
            event.start_date = date;
            event.start_time = time;
        }
        if let Some(end) = record.get("end_date").and_then(|v| v.as_str()) {
            let (date, time) = mapping::split_datetime(end);
            event.end_date = date;
            event.end_time = time;
        }

        if let (Some(lat), Some(lng)) = (
            record.pointer("/venue/geo_lat"),
            record.pointer("/venue/geo_lng"),
        ) {
            if let (Some(lat), Some(lng)) = (lat.as_f64(), lng.as_f64()) {
                event.venue_coordinates = format!("{lat},{lng}");
            }
        }

        Some(event)
    }
}
