// Pushes a collected batch to the ingest endpoint. Best-effort, at-most-once.

use std::time::Duration;

use crate::models::MetricPoint;
use crate::version;

pub struct Sender {
    client: reqwest::Client,
    api_url: String,
}

impl Sender {
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(version::agent_user_agent())
            .build()?;
        Ok(Self {
            client,
            api_url: api_url.into(),
        })
    }

    /// POST the batch once. Failures are logged, never returned; the result says whether it was accepted.
    pub async fn send(&self, points: &[MetricPoint]) -> bool {
        tracing::info!(points_count = points.len(), url = %self.api_url, "sending metrics");
        match self.client.post(&self.api_url).json(points).send().await {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                tracing::error!(status = %resp.status(), "send metrics rejected");
                false
            }
            Err(e) => {
                tracing::error!(error = %e, "send metrics failed");
                false
            }
        }
    }
}
