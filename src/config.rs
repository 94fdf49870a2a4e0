use crate::error::{HarvestError, Result};
use chrono::{FixedOffset, NaiveDate, Utc};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Global settings shared by every pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// UTC offset in hours used to decide what "today" means for the
    /// past-event cutoff.
    #[serde(default)]
    pub utc_offset_hours: i32,
    /// Extra placeholder titles to skip, on top of the builtin list.
    #[serde(default)]
    pub skip_titles: Vec<String>,
}

fn default_user_agent() -> String {
    "event-harvester/0.1".to_string()
}

fn default_timeout() -> u64 {
    15
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_seconds: default_timeout(),
            utc_offset_hours: 0,
            skip_titles: Vec::new(),
        }
    }
}

impl Settings {
    /// Today's date in the configured timezone.
    pub fn today(&self) -> NaiveDate {
        let secs = self.utc_offset_hours.clamp(-23, 23) * 3600;
        let offset = FixedOffset::east_opt(secs)
            .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"));
        Utc::now().with_timezone(&offset).date_naive()
    }
}

/// One configured import pipeline: a source type plus its handler config
/// and the flow/step identifiers that scope deduplication.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub source: String,
    #[serde(default)]
    pub pipeline_id: i64,
    #[serde(default)]
    pub flow_id: i64,
    #[serde(default)]
    pub flow_step_id: Option<String>,
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub handler: toml::Table,
}

impl PipelineConfig {
    /// Handler config as JSON, with `env:NAME` string values resolved from
    /// the environment so secrets stay out of the config file.
    pub fn handler_json(&self) -> Result<serde_json::Value> {
        let mut value = serde_json::to_value(&self.handler)?;
        resolve_env_refs(&mut value);
        Ok(value)
    }
}

fn resolve_env_refs(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::String(s) => {
            if let Some(var) = s.strip_prefix("env:") {
                match std::env::var(var) {
                    Ok(resolved) => *s = resolved,
                    Err(_) => {
                        warn!("Environment variable {} is not set", var);
                        *s = String::new();
                    }
                }
            }
        }
        serde_json::Value::Object(map) => {
            for (_, v) in map.iter_mut() {
                resolve_env_refs(v);
            }
        }
        serde_json::Value::Array(items) => {
            for v in items.iter_mut() {
                resolve_env_refs(v);
            }
        }
        _ => {}
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default, rename = "pipeline")]
    pub pipelines: Vec<PipelineConfig>,
}

impl Config {
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            HarvestError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn find_pipeline(&self, name: &str) -> Option<&PipelineConfig> {
        self.pipelines.iter().find(|p| p.name == name)
    }
}
