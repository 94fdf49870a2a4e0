//! Shared HTTP client: one `reqwest::Client` per process with the
//! configured User-Agent and a bounded timeout. Adapters open, fetch and
//! release their connection within a single invocation; a timeout is a
//! normal failure, not a fatal one.

use crate::config::Settings;
use crate::error::{HarvestError, Result};
use std::time::Duration;

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()?;
        Ok(Self { client })
    }

    pub async fn get_json(&self, url: &str) -> Result<serde_json::Value> {
        self.get_json_with(url, &[]).await
    }

    pub async fn get_json_with(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<serde_json::Value> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::Source {
                message: format!("GET {url} returned {status}"),
            });
        }
        Ok(response.json().await?)
    }

    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::Source {
                message: format!("GET {url} returned {status}"),
            });
        }
        Ok(response.text().await?)
    }
}
