//! Declarative field mapping from raw JSON records to the standardized
//! event schema. Most JSON sources differ only in where they put each
//! field, so adapters describe that as data (target field -> candidate
//! JSON pointers, first non-empty wins) instead of repeating mapping code.

use crate::types::{RawRecord, StandardizedEvent};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Target field name paired with candidate JSON pointers, tried in order.
pub type FieldPaths = &'static [(&'static str, &'static [&'static str])];

/// Mapping for records whose keys already follow the standardized
/// snake_case names (ICS, scraper and recurring adapters build these).
pub const GENERIC_MAP: FieldPaths = &[
    ("title", &["/title", "/summary", "/name"]),
    ("description", &["/description"]),
    ("start_date", &["/start_date"]),
    ("end_date", &["/end_date"]),
    ("start_time", &["/start_time"]),
    ("end_time", &["/end_time"]),
    ("venue", &["/venue", "/location"]),
    ("venue_address", &["/venue_address", "/address"]),
    ("venue_city", &["/venue_city", "/city"]),
    ("venue_state", &["/venue_state", "/state"]),
    ("venue_zip", &["/venue_zip", "/zip"]),
    ("venue_country", &["/venue_country", "/country"]),
    ("venue_phone", &["/venue_phone", "/phone"]),
    ("venue_website", &["/venue_website", "/website"]),
    ("venue_coordinates", &["/venue_coordinates", "/coordinates"]),
    ("ticket_url", &["/ticket_url", "/url"]),
    ("image", &["/image"]),
    ("price", &["/price"]),
    ("performer", &["/performer"]),
    ("organizer", &["/organizer"]),
    ("source_url", &["/source_url", "/url"]),
];

fn lookup(record: &RawRecord, paths: &[&str]) -> Option<String> {
    for path in paths {
        if let Some(value) = record.pointer(path) {
            match value {
                Value::String(s) if !s.trim().is_empty() => return Some(s.clone()),
                Value::Number(n) => return Some(n.to_string()),
                _ => {}
            }
        }
    }
    None
}

fn set_field(event: &mut StandardizedEvent, field: &str, value: String) {
    match field {
        "title" => event.title = value,
        "description" => event.description = value,
        "start_date" => event.start_date = value,
        "end_date" => event.end_date = value,
        "start_time" => event.start_time = value,
        "end_time" => event.end_time = value,
        "venue" => event.venue = value,
        "venue_address" => event.venue_address = value,
        "venue_city" => event.venue_city = value,
        "venue_state" => event.venue_state = value,
        "venue_zip" => event.venue_zip = value,
        "venue_country" => event.venue_country = value,
        "venue_phone" => event.venue_phone = value,
        "venue_website" => event.venue_website = value,
        "venue_coordinates" => event.venue_coordinates = value,
        "ticket_url" => event.ticket_url = value,
        "image" => event.image = value,
        "price" => event.price = value,
        "performer" => event.performer = value,
        "organizer" => event.organizer = value,
        "source_url" => event.source_url = value,
        _ => {}
    }
}

/// Applies a field map to one raw record. Missing fields stay empty.
pub fn apply(map: FieldPaths, record: &RawRecord) -> StandardizedEvent {
    let mut event = StandardizedEvent::default();
    for (field, paths) in map {
        if let Some(value) = lookup(record, paths) {
            set_field(&mut event, field, value);
        }
    }
    event
}

static DATETIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4}-\d{2}-\d{2})(?:[T ](\d{2}:\d{2}))?").unwrap());

/// Splits an ISO-ish datetime string into (`YYYY-MM-DD`, `HH:MM`). Either
/// part may come back empty when the input does not carry it.
pub fn split_datetime(raw: &str) -> (String, String) {
    match DATETIME_RE.captures(raw.trim()) {
        Some(caps) => {
            let date = caps[1].to_string();
            let time = caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default();
            (date, time)
        }
        None => (String::new(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn apply_uses_first_non_empty_candidate() {
        let record = json!({
            "title": "",
            "summary": "Jazz Night",
            "start_date": "2026-05-01",
            "price": 25.5
        });
        let event = apply(GENERIC_MAP, &record);
        assert_eq!(event.title, "Jazz Night");
        assert_eq!(event.start_date, "2026-05-01");
        assert_eq!(event.price, "25.5");
        assert!(event.venue.is_empty());
    }

    #[test]
    fn apply_reaches_nested_paths() {
        const MAP: FieldPaths = &[
            ("title", &["/name"]),
            ("venue", &["/_embedded/venues/0/name"]),
        ];
        let record = json!({
            "name": "Show",
            "_embedded": {"venues": [{"name": "Blue Room"}]}
        });
        let event = apply(MAP, &record);
        assert_eq!(event.venue, "Blue Room");
    }

    #[test]
    fn split_datetime_handles_common_forms() {
        assert_eq!(
            split_datetime("2026-05-01T19:30:00-07:00"),
            ("2026-05-01".to_string(), "19:30".to_string())
        );
        assert_eq!(
            split_datetime("2026-05-01 19:30:00"),
            ("2026-05-01".to_string(), "19:30".to_string())
        );
        assert_eq!(
            split_datetime("2026-05-01"),
            ("2026-05-01".to_string(), String::new())
        );
        assert_eq!(split_datetime("next friday"), (String::new(), String::new()));
    }
}
