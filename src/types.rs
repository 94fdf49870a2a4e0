use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw event data as returned from external APIs/feeds/scrapers
pub type RawRecord = serde_json::Value;

/// The canonical event record every source adapter produces. Empty strings
/// mean "absent" and are skipped during serialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StandardizedEvent {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// `YYYY-MM-DD`
    #[serde(skip_serializing_if = "String::is_empty")]
    pub start_date: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub end_date: String,
    /// `HH:MM`, 24-hour; empty means all-day / unspecified
    #[serde(skip_serializing_if = "String::is_empty")]
    pub start_time: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub end_time: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub venue: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub venue_address: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub venue_city: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub venue_state: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub venue_zip: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub venue_country: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub venue_phone: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub venue_website: String,
    /// `"lat,lng"`, validated lazily by the pipeline
    #[serde(skip_serializing_if = "String::is_empty")]
    pub venue_coordinates: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ticket_url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub image: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub price: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub performer: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub organizer: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub source_url: String,
}

/// Venue fields carried separately from the event body. `None` means
/// unknown; empty strings never travel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VenueMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<String>,
}

impl VenueMetadata {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.address.is_none()
            && self.city.is_none()
            && self.state.is_none()
            && self.zip.is_none()
            && self.country.is_none()
            && self.phone.is_none()
            && self.website.is_none()
            && self.coordinates.is_none()
            && self.capacity.is_none()
    }
}

/// The single unit of work a fetch invocation may emit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputUnit {
    pub content: UnitContent,
    pub metadata: UnitMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitContent {
    pub title: String,
    /// JSON string carrying the venue-stripped event, its venue metadata
    /// and provenance
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitMetadata {
    pub source_type: String,
    pub pipeline_id: i64,
    pub flow_id: i64,
    pub original_title: String,
    pub event_identifier: String,
    pub import_timestamp: DateTime<Utc>,
}

/// Per-invocation parameters handed down by the orchestrator.
#[derive(Debug, Clone)]
pub struct FetchContext {
    pub pipeline_id: i64,
    pub config: serde_json::Value,
    pub flow_step_id: Option<String>,
    pub flow_id: i64,
    pub job_id: Option<String>,
}

impl FetchContext {
    /// Deduplication scope. Processed-state is per flow-step; when no step
    /// id was provided we fall back to the pipeline so dedup still works.
    pub fn dedup_scope(&self) -> String {
        self.flow_step_id
            .clone()
            .unwrap_or_else(|| format!("pipeline:{}", self.pipeline_id))
    }
}
