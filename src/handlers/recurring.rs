//! Recurring single-occurrence generator. Fetches nothing: it computes
//! the next future occurrence of a configured weekday and runs it through
//! the same dedup/emit contract as any fetched event.

use crate::error::{HarvestError, Result};
use crate::handlers::{optional_str, required_str};
use crate::mapping;
use crate::pipeline::{EventSource, SourceEnv};
use crate::types::{FetchContext, RawRecord, StandardizedEvent};
use chrono::{Datelike, NaiveDate, Weekday};
use serde_json::json;
use tracing::{debug, instrument};

pub struct RecurringSource;

impl RecurringSource {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RecurringSource {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_weekday(raw: &str) -> Result<Weekday> {
    match raw.trim().to_lowercase().as_str() {
        "monday" | "mon" => Ok(Weekday::Mon),
        "tuesday" | "tue" => Ok(Weekday::Tue),
        "wednesday" | "wed" => Ok(Weekday::Wed),
        "thursday" | "thu" => Ok(Weekday::Thu),
        "friday" | "fri" => Ok(Weekday::Fri),
        "saturday" | "sat" => Ok(Weekday::Sat),
        "sunday" | "sun" => Ok(Weekday::Sun),
        other => Err(HarvestError::Config(format!("unknown weekday '{other}'"))),
    }
}

/// Next occurrence of the weekday on or after today; today itself counts.
pub(crate) fn next_occurrence(today: NaiveDate, weekday: Weekday) -> NaiveDate {
    let days_ahead = (weekday.num_days_from_monday() + 7
        - today.weekday().num_days_from_monday())
        % 7;
    today + chrono::Duration::days(days_ahead as i64)
}

#[async_trait::async_trait]
impl EventSource for RecurringSource {
    fn source_type(&self) -> &'static str {
        super::RECURRING
    }

    fn validate_config(&self, config: &serde_json::Value) -> Result<()> {
        required_str(config, "title")?;
        parse_weekday(&required_str(config, "weekday")?)?;
        Ok(())
    }

    #[instrument(skip(self, ctx, env))]
    async fn fetch_raw(&self, ctx: &FetchContext, env: &SourceEnv<'_>) -> Result<Vec<RawRecord>> {
        let title = required_str(&ctx.config, "title")?;
        let weekday = parse_weekday(&required_str(&ctx.config, "weekday")?)?;

        let today = env.settings.today();
        let occurrence = next_occurrence(today, weekday);

        // Expired series stop generating, silently
        let expiration = optional_str(&ctx.config, "expiration_date");
        if !expiration.is_empty() {
            match NaiveDate::parse_from_str(&expiration, "%Y-%m-%d") {
                Ok(cutoff) if occurrence > cutoff => {
                    debug!(%occurrence, %cutoff, "Recurring series expired");
                    return Ok(Vec::new());
                }
                Ok(_) => {}
                Err(_) => {
                    return Err(HarvestError::Config(format!(
                        "invalid expiration_date '{expiration}'"
                    )));
                }
            }
        }

        Ok(vec![json!({
            "title": title,
            "description": optional_str(&ctx.config, "description"),
            "start_date": occurrence.to_string(),
            "start_time": optional_str(&ctx.config, "start_time"),
            "end_time": optional_str(&ctx.config, "end_time"),
            "venue": optional_str(&ctx.config, "venue"),
            "venue_address": optional_str(&ctx.config, "venue_address"),
            "venue_city": optional_str(&ctx.config, "venue_city"),
            "venue_state": optional_str(&ctx.config, "venue_state"),
            "venue_zip": optional_str(&ctx.config, "venue_zip"),
            "url": optional_str(&ctx.config, "url"),
        })])
    }

    fn map_record(&self, record: &RawRecord, _ctx: &FetchContext) -> Option<StandardizedEvent> {
        Some(mapping::apply(mapping::GENERIC_MAP, record))
    }
}
