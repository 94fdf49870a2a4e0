//! Generic iCalendar feed adapter. Feeds are plain text: folded lines are
//! unfolded, VEVENT blocks are collected, and each property of interest is
//! lifted into a standardized-key record for the generic field map.

use crate::error::Result;
use crate::handlers::required_str;
use crate::mapping;
use crate::pipeline::{EventSource, SourceEnv};
use crate::types::{FetchContext, RawRecord, StandardizedEvent};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

pub struct IcsFeedSource;

impl IcsFeedSource {
    pub fn new() -> Self {
        Self
    }
}

impl Default for IcsFeedSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Rejoins folded lines: a line starting with a space or tab continues the
/// previous one (RFC 5545 3.1).
fn unfold(raw: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for line in raw.replace("\r\n", "\n").split('\n') {
        if let Some(rest) = line.strip_prefix(' ').or_else(|| line.strip_prefix('\t')) {
            if let Some(last) = lines.last_mut() {
                last.push_str(rest);
                continue;
            }
        }
        lines.push(line.to_string());
    }
    lines
}

/// Splits `NAME;PARAM=V;PARAM=V:value` into (name, params, value).
fn parse_property(line: &str) -> Option<(String, Vec<(String, String)>, String)> {
    let colon = line.find(':')?;
    let (head, value) = line.split_at(colon);
    let value = value[1..].to_string();
    let mut parts = head.split(';');
    let name = parts.next()?.trim().to_uppercase();
    let params = parts
        .filter_map(|p| {
            p.split_once('=')
                .map(|(k, v)| (k.trim().to_uppercase(), v.trim().to_string()))
        })
        .collect();
    Some((name, params, value))
}

/// `20260501` or `20260501T193000(Z)` into (`YYYY-MM-DD`, `HH:MM`).
/// Anything after the `T` that is not four ASCII digits degrades to an
/// all-day date; feeds can carry arbitrary bytes there.
fn parse_ics_datetime(value: &str) -> (String, String) {
    let v = value.trim();
    let bytes = v.as_bytes();
    if bytes.len() < 8 || !bytes[..8].iter().all(u8::is_ascii_digit) {
        return (String::new(), String::new());
    }
    let date = format!("{}-{}-{}", &v[..4], &v[4..6], &v[6..8]);
    let time = if bytes.get(8) == Some(&b'T')
        && bytes
            .get(9..13)
            .map_or(false, |b| b.iter().all(u8::is_ascii_digit))
    {
        format!("{}:{}", &v[9..11], &v[11..13])
    } else {
        String::new()
    };
    (date, time)
}

/// Unescapes TEXT values: `\n`, `\,`, `\;`, `\\`.
fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(escaped) => out.push(escaped),
            None => out.push('\\'),
        }
    }
    out
}

/// Parses every VEVENT in a feed into standardized-key records.
pub(crate) fn parse_events(feed: &str) -> Vec<RawRecord> {
    let mut events = Vec::new();
    let mut current: Option<serde_json::Map<String, Value>> = None;

    for line in unfold(feed) {
        let Some((name, params, value)) = parse_property(&line) else {
            continue;
        };
        match name.as_str() {
            "BEGIN" if value.trim().eq_ignore_ascii_case("VEVENT") => {
                current = Some(serde_json::Map::new());
            }
            "END" if value.trim().eq_ignore_ascii_case("VEVENT") => {
                if let Some(record) = current.take() {
                    events.push(Value::Object(record));
                }
            }
            _ => {
                let Some(record) = current.as_mut() else {
                    continue;
                };
                match name.as_str() {
                    "SUMMARY" => {
                        record.insert("title".into(), json!(unescape_text(&value)));
                    }
                    "DESCRIPTION" => {
                        record.insert("description".into(), json!(unescape_text(&value)));
                    }
                    "LOCATION" => {
                        // First comma segment names the venue, the rest is
                        // the address.
                        let location = unescape_text(&value);
                        match location.split_once(',') {
                            Some((venue, rest)) => {
                                record.insert("venue".into(), json!(venue.trim()));
                                record.insert("venue_address".into(), json!(rest.trim()));
                            }
                            None => {
                                record.insert("venue".into(), json!(location.trim()));
                            }
                        }
                    }
                    "DTSTART" => {
                        let (date, time) = parse_ics_datetime(&value);
                        record.insert("start_date".into(), json!(date));
                        record.insert("start_time".into(), json!(time));
                    }
                    "DTEND" => {
                        let (date, time) = parse_ics_datetime(&value);
                        record.insert("end_date".into(), json!(date));
                        record.insert("end_time".into(), json!(time));
                    }
                    "URL" => {
                        record.insert("url".into(), json!(value.trim()));
                    }
                    "GEO" => {
                        if let Some((lat, lng)) = value.split_once(';') {
                            record.insert(
                                "coordinates".into(),
                                json!(format!("{},{}", lat.trim(), lng.trim())),
                            );
                        }
                    }
                    "ORGANIZER" => {
                        if let Some((_, cn)) = params.iter().find(|(k, _)| k == "CN") {
                            record.insert("organizer".into(), json!(cn.trim_matches('"')));
                        }
                    }
                    _ => {}
                }
            }
        }
    }
    events
}

#[async_trait::async_trait]
impl EventSource for IcsFeedSource {
    fn source_type(&self) -> &'static str {
        super::ICS_FEED
    }

    fn validate_config(&self, config: &serde_json::Value) -> Result<()> {
        required_str(config, "url")?;
        Ok(())
    }

    #[instrument(skip(self, ctx, env))]
    async fn fetch_raw(&self, ctx: &FetchContext, env: &SourceEnv<'_>) -> Result<Vec<RawRecord>> {
        let url = required_str(&ctx.config, "url")?;
        let feed = env.http.get_text(&url).await?;
        let events = parse_events(&feed);
        info!("Parsed {} VEVENTs from feed", events.len());
        if events.is_empty() {
            warn!("No events found - the feed may be empty or malformed");
        }
        Ok(events)
    }

    fn map_record(&self, record: &RawRecord, _ctx: &FetchContext) -> Option<StandardizedEvent> {
        Some(mapping::apply(mapping::GENERIC_MAP, record))
    }
}
