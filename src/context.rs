//! Job-scoped shared context. Venue metadata extracted during a fetch is
//! merged here so downstream steps in the same job run can consume it.
//! Merges are a non-destructive union; existing keys always win.

use crate::error::Result;
use crate::types::{StandardizedEvent, VenueMetadata};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

#[async_trait]
pub trait JobContextStore: Send + Sync {
    /// Merge entries into the job's context. Keys already present are kept;
    /// nested objects are unioned one level deep with the same rule.
    async fn merge(&self, job_id: &str, entries: Map<String, Value>) -> Result<()>;

    async fn get(&self, job_id: &str) -> Result<Option<Map<String, Value>>>;
}

/// In-memory job context for development and testing.
#[derive(Default)]
pub struct InMemoryJobContext {
    jobs: Mutex<HashMap<String, Map<String, Value>>>,
}

impl InMemoryJobContext {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobContextStore for InMemoryJobContext {
    async fn merge(&self, job_id: &str, entries: Map<String, Value>) -> Result<()> {
        let mut jobs = self.jobs.lock().unwrap();
        let context = jobs.entry(job_id.to_string()).or_default();
        for (key, value) in entries {
            match context.get_mut(&key) {
                None => {
                    context.insert(key, value);
                }
                Some(Value::Object(existing)) => {
                    if let Value::Object(incoming) = value {
                        for (inner_key, inner_value) in incoming {
                            existing.entry(inner_key).or_insert(inner_value);
                        }
                    }
                }
                // Existing scalar wins
                Some(_) => {}
            }
        }
        Ok(())
    }

    async fn get(&self, job_id: &str) -> Result<Option<Map<String, Value>>> {
        let jobs = self.jobs.lock().unwrap();
        Ok(jobs.get(job_id).cloned())
    }
}

fn push_entry(map: &mut Map<String, Value>, key: &str, value: &Option<String>) {
    if let Some(v) = value {
        if !v.trim().is_empty() {
            map.insert(key.to_string(), Value::String(v.clone()));
        }
    }
}

/// Merges the event's venue metadata into the shared job context: a
/// flattened `venue_*` map plus a nested `venue_context` object carrying
/// the same data under unprefixed keys. Empty values are dropped. No-op
/// when the job id is not a positive integer or nothing non-empty remains.
pub async fn store_venue_context(
    store: &dyn JobContextStore,
    job_id: &str,
    event: &StandardizedEvent,
    venue: &VenueMetadata,
) -> Result<()> {
    match job_id.trim().parse::<i64>() {
        Ok(id) if id > 0 => {}
        _ => {
            debug!(job_id, "Skipping venue context: job id is not a positive integer");
            return Ok(());
        }
    }

    let mut nested = Map::new();
    push_entry(&mut nested, "name", &venue.name);
    push_entry(&mut nested, "address", &venue.address);
    push_entry(&mut nested, "city", &venue.city);
    push_entry(&mut nested, "state", &venue.state);
    push_entry(&mut nested, "zip", &venue.zip);
    push_entry(&mut nested, "country", &venue.country);
    push_entry(&mut nested, "phone", &venue.phone);
    push_entry(&mut nested, "website", &venue.website);
    push_entry(&mut nested, "coordinates", &venue.coordinates);
    push_entry(&mut nested, "capacity", &venue.capacity);

    if nested.is_empty() {
        debug!(job_id, event = %event.title, "Skipping venue context: no non-empty venue fields");
        return Ok(());
    }

    let mut entries = Map::new();
    for (key, value) in &nested {
        entries.insert(format!("venue_{key}"), value.clone());
    }
    entries.insert("venue_context".to_string(), Value::Object(nested));

    store.merge(job_id, entries).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn merge_is_non_destructive() {
        let store = InMemoryJobContext::new();
        let mut first = Map::new();
        first.insert("venue_name".to_string(), json!("Blue Room"));
        store.merge("12", first).await.unwrap();

        let mut second = Map::new();
        second.insert("venue_name".to_string(), json!("Other Hall"));
        second.insert("venue_city".to_string(), json!("Seattle"));
        store.merge("12", second).await.unwrap();

        let context = store.get("12").await.unwrap().unwrap();
        assert_eq!(context["venue_name"], json!("Blue Room"));
        assert_eq!(context["venue_city"], json!("Seattle"));
    }

    #[tokio::test]
    async fn nested_objects_union_with_existing_winning() {
        let store = InMemoryJobContext::new();
        let mut first = Map::new();
        first.insert("venue_context".to_string(), json!({"name": "Blue Room"}));
        store.merge("12", first).await.unwrap();

        let mut second = Map::new();
        second.insert(
            "venue_context".to_string(),
            json!({"name": "Other Hall", "city": "Seattle"}),
        );
        store.merge("12", second).await.unwrap();

        let context = store.get("12").await.unwrap().unwrap();
        assert_eq!(context["venue_context"]["name"], json!("Blue Room"));
        assert_eq!(context["venue_context"]["city"], json!("Seattle"));
    }

    #[tokio::test]
    async fn venue_context_drops_empty_fields() {
        let store = InMemoryJobContext::new();
        let event = StandardizedEvent {
            title: "Show".to_string(),
            ..Default::default()
        };
        let venue = VenueMetadata {
            name: Some("Blue Room".to_string()),
            city: Some("  ".to_string()),
            ..Default::default()
        };
        store_venue_context(&store, "42", &event, &venue)
            .await
            .unwrap();

        let context = store.get("42").await.unwrap().unwrap();
        assert_eq!(context["venue_name"], json!("Blue Room"));
        assert!(!context.contains_key("venue_city"));
        assert_eq!(context["venue_context"], json!({"name": "Blue Room"}));
    }

    #[tokio::test]
    async fn non_numeric_or_empty_job_id_is_a_no_op() {
        let store = InMemoryJobContext::new();
        let event = StandardizedEvent::default();
        let venue = VenueMetadata {
            name: Some("Blue Room".to_string()),
            ..Default::default()
        };

        store_venue_context(&store, "job-abc", &event, &venue)
            .await
            .unwrap();
        store_venue_context(&store, "0", &event, &venue)
            .await
            .unwrap();
        store_venue_context(&store, "-3", &event, &venue)
            .await
            .unwrap();

        assert!(store.get("job-abc").await.unwrap().is_none());
        assert!(store.get("0").await.unwrap().is_none());
        assert!(store.get("-3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn all_empty_venue_is_a_no_op() {
        let store = InMemoryJobContext::new();
        store_venue_context(
            &store,
            "42",
            &StandardizedEvent::default(),
            &VenueMetadata::default(),
        )
        .await
        .unwrap();
        assert!(store.get("42").await.unwrap().is_none());
    }
}
