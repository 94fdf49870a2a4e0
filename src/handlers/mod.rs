//! Per-source fetch adapters. Each implements `EventSource`: validate the
//! handler config, fetch raw records, and map them to the standardized
//! schema. The shared driver in `pipeline` does the rest.

pub mod dice_fm;
pub mod godaddy;
pub mod google_calendar;
pub mod ics_feed;
pub mod recurring;
pub mod ticketmaster;
pub mod web_scraper;
pub mod wordpress_rest;

use crate::error::{HarvestError, Result};
use crate::pipeline::EventSource;

pub const TICKETMASTER: &str = "ticketmaster";
pub const DICE_FM: &str = "dice_fm";
pub const GOOGLE_CALENDAR: &str = "google_calendar";
pub const ICS_FEED: &str = "ics_feed";
pub const WORDPRESS_REST: &str = "wordpress_rest";
pub const GODADDY: &str = "godaddy";
pub const WEB_SCRAPER: &str = "web_scraper";
pub const RECURRING: &str = "recurring";

pub const SOURCE_TYPES: &[&str] = &[
    TICKETMASTER,
    DICE_FM,
    GOOGLE_CALENDAR,
    ICS_FEED,
    WORDPRESS_REST,
    GODADDY,
    WEB_SCRAPER,
    RECURRING,
];

pub fn create_source(source_type: &str) -> Option<Box<dyn EventSource>> {
    match source_type {
        TICKETMASTER => Some(Box::new(ticketmaster::TicketmasterSource::new())),
        DICE_FM => Some(Box::new(dice_fm::DiceFmSource::new())),
        GOOGLE_CALENDAR => Some(Box::new(google_calendar::GoogleCalendarSource::new())),
        ICS_FEED => Some(Box::new(ics_feed::IcsFeedSource::new())),
        WORDPRESS_REST => Some(Box::new(wordpress_rest::WordPressRestSource::new())),
        GODADDY => Some(Box::new(godaddy::GoDaddySource::new())),
        WEB_SCRAPER => Some(Box::new(web_scraper::WebScraperSource::new())),
        RECURRING => Some(Box::new(recurring::RecurringSource::new())),
        _ => None,
    }
}

/// Required string config value; missing or empty is a configuration error.
pub(crate) fn required_str(config: &serde_json::Value, key: &str) -> Result<String> {
    match config.get(key).and_then(|v| v.as_str()) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(HarvestError::Config(format!(
            "required handler setting '{key}' is missing or empty"
        ))),
    }
}

/// Optional string config value, empty string when absent.
pub(crate) fn optional_str(config: &serde_json::Value, key: &str) -> String {
    config
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn factory_knows_every_source_type() {
        for source_type in SOURCE_TYPES {
            let source = create_source(source_type).unwrap();
            assert_eq!(source.source_type(), *source_type);
        }
        assert!(create_source("facebook").is_none());
    }

    #[test]
    fn required_str_rejects_missing_and_empty() {
        let config = json!({"url": "https://example.com", "blank": "  "});
        assert_eq!(
            required_str(&config, "url").unwrap(),
            "https://example.com"
        );
        assert!(required_str(&config, "blank").is_err());
        assert!(required_str(&config, "absent").is_err());
    }
}
