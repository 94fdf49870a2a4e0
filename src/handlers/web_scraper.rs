//! Config-driven HTML scraper. Selectors come from the handler config, so
//! one adapter covers any listing page with a repeating event element.

use crate::error::{HarvestError, Result};
use crate::handlers::{optional_str, required_str};
use crate::mapping;
use crate::pipeline::{EventSource, SourceEnv};
use crate::types::{FetchContext, RawRecord, StandardizedEvent};
use chrono::NaiveDate;
use scraper::{Html, Selector};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

pub struct WebScraperSource;

impl WebScraperSource {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WebScraperSource {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_selector(raw: &str) -> Result<Selector> {
    Selector::parse(raw)
        .map_err(|e| HarvestError::Config(format!("invalid CSS selector '{raw}': {e}")))
}

const OPTIONAL_SELECTOR_KEYS: [&str; 5] = [
    "title_selector",
    "date_selector",
    "time_selector",
    "description_selector",
    "link_selector",
];

fn select_text(element: &scraper::ElementRef, selector: &Option<Selector>) -> String {
    match selector {
        Some(sel) => element
            .select(sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .unwrap_or_default(),
        None => String::new(),
    }
}

fn select_href(element: &scraper::ElementRef, selector: &Option<Selector>) -> String {
    match selector {
        Some(sel) => element
            .select(sel)
            .next()
            .and_then(|el| el.value().attr("href"))
            .unwrap_or("")
            .to_string(),
        None => String::new(),
    }
}

/// Parses a scraped date string with the configured format, falling back
/// to a couple of common ones.
fn parse_date(raw: &str, format: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(raw, format)
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
        .or_else(|_| NaiveDate::parse_from_str(raw, "%B %d, %Y"))
        .ok()
}

/// Pure parse step, separated from transport so it can be tested against
/// fixture HTML.
pub(crate) fn parse_page(html: &str, config: &Value) -> Result<Vec<RawRecord>> {
    let event_selector = parse_selector(&required_str(config, "event_selector")?)?;

    let maybe = |key: &str| -> Result<Option<Selector>> {
        let raw = optional_str(config, key);
        if raw.is_empty() {
            Ok(None)
        } else {
            parse_selector(&raw).map(Some)
        }
    };
    let title_selector = maybe("title_selector")?;
    let date_selector = maybe("date_selector")?;
    let time_selector = maybe("time_selector")?;
    let description_selector = maybe("description_selector")?;
    let link_selector = maybe("link_selector")?;

    let date_format = {
        let raw = optional_str(config, "date_format");
        if raw.is_empty() {
            "%Y-%m-%d".to_string()
        } else {
            raw
        }
    };
    let venue = optional_str(config, "venue");

    let document = Html::parse_document(html);
    let mut records = Vec::new();
    for element in document.select(&event_selector) {
        let title = match &title_selector {
            Some(_) => select_text(&element, &title_selector),
            None => element.text().collect::<String>().trim().to_string(),
        };

        let date_text = select_text(&element, &date_selector);
        let start_date = parse_date(&date_text, &date_format)
            .map(|d| d.to_string())
            .unwrap_or_default();

        records.push(json!({
            "title": title,
            "description": select_text(&element, &description_selector),
            "start_date": start_date,
            "start_time": select_text(&element, &time_selector),
            "venue": venue,
            "url": select_href(&element, &link_selector),
        }));
    }
    Ok(records)
}

#[async_trait::async_trait]
impl EventSource for WebScraperSource {
    fn source_type(&self) -> &'static str {
        super::WEB_SCRAPER
    }

    fn validate_config(&self, config: &serde_json::Value) -> Result<()> {
        required_str(config, "url")?;
        parse_selector(&required_str(config, "event_selector")?)?;
        // A bad optional selector is a configuration mistake, not a fetch
        // failure; reject it before any network call
        for key in OPTIONAL_SELECTOR_KEYS {
            let raw = optional_str(config, key);
            if !raw.is_empty() {
                parse_selector(&raw)?;
            }
        }
        Ok(())
    }

    #[instrument(skip(self, ctx, env))]
    async fn fetch_raw(&self, ctx: &FetchContext, env: &SourceEnv<'_>) -> Result<Vec<RawRecord>> {
        let url = required_str(&ctx.config, "url")?;
        let html = env.http.get_text(&url).await?;
        let records = parse_page(&html, &ctx.config)?;
        info!("Scraped {} events from {}", records.len(), url);
        if records.is_empty() {
            warn!("No events found - the page structure may have changed");
        }
        Ok(records)
    }

    fn map_record(&self, record: &RawRecord, _ctx: &FetchContext) -> Option<StandardizedEvent> {
        let event = mapping::apply(mapping::GENERIC_MAP, record);
        // A scraped record without a parseable date is useless downstream
        if event.start_date.is_empty() {
            return None;
        }
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <div class="event">
            <h2 class="title">Jazz Night</h2>
            <span class="date">2026-05-01</span>
            <span class="time">20:00</span>
            <p class="blurb">Late set</p>
            <a class="more" href="https://venue.example/jazz">details</a>
          </div>
          <div class="event">
            <h2 class="title">Mystery Show</h2>
            <span class="date">sometime soon</span>
          </div>
        </body></html>
    "#;

    fn config() -> Value {
        json!({
            "url": "https://venue.example/calendar",
            "event_selector": "div.event",
            "title_selector": "h2.title",
            "date_selector": "span.date",
            "time_selector": "span.time",
            "description_selector": "p.blurb",
            "link_selector": "a.more",
            "venue": "The Corner Stage"
        })
    }

    #[test]
    fn scrapes_configured_selectors() {
        let records = parse_page(PAGE, &config()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["title"], "Jazz Night");
        assert_eq!(records[0]["start_date"], "2026-05-01");
        assert_eq!(records[0]["start_time"], "20:00");
        assert_eq!(records[0]["venue"], "The Corner Stage");
        assert_eq!(records[0]["url"], "https://venue.example/jazz");
    }

    #[test]
    fn unparseable_dates_are_discarded_at_mapping() {
        let records = parse_page(PAGE, &config()).unwrap();
        let ctx = FetchContext {
            pipeline_id: 1,
            config: config(),
            flow_step_id: None,
            flow_id: 1,
            job_id: None,
        };
        let source = WebScraperSource::new();
        assert!(source.map_record(&records[0], &ctx).is_some());
        assert!(source.map_record(&records[1], &ctx).is_none());
    }

    #[test]
    fn invalid_selector_is_a_config_error() {
        let mut bad = config();
        bad["event_selector"] = json!("div[[[");
        assert!(parse_page(PAGE, &bad).is_err());
        assert!(WebScraperSource::new().validate_config(&bad).is_err());
    }

    #[test]
    fn invalid_optional_selector_fails_validation() {
        let source = WebScraperSource::new();
        for key in OPTIONAL_SELECTOR_KEYS {
            let mut bad = config();
            bad[key] = json!("h2[[[");
            assert!(
                source.validate_config(&bad).is_err(),
                "{key} should be rejected up front"
            );
        }
        // An absent optional selector stays valid
        let mut minimal = config();
        minimal["title_selector"] = json!("");
        assert!(source.validate_config(&minimal).is_ok());
    }
}
