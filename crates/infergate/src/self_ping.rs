//! Periodic GET against this service's own public URL so the host does not
//! suspend it for inactivity.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::BrokerConfig;
use crate::error::BrokerError;
use crate::scheduler::{Job, ScheduledTask};

const SELF_PING_TIMEOUT: Duration = Duration::from_secs(30);

pub struct SelfPingJob {
    client: reqwest::Client,
    url: String,
}

impl SelfPingJob {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Job for SelfPingJob {
    fn name(&self) -> &'static str {
        "self-ping"
    }

    async fn run(&self) -> Result<(), BrokerError> {
        let response = self
            .client
            .get(&self.url)
            .timeout(SELF_PING_TIMEOUT)
            .send()
            .await
            .map_err(|e| BrokerError::Internal(format!("self-ping to {} failed: {e}", self.url)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BrokerError::Internal(format!(
                "self-ping to {} returned {status}",
                self.url
            )));
        }

        tracing::debug!(url = %self.url, status = %status, "Self-ping succeeded");
        Ok(())
    }
}

pub fn spawn_self_ping(config: &BrokerConfig, client: reqwest::Client) -> ScheduledTask {
    let job = SelfPingJob::new(client, config.self_url());
    tracing::info!(url = %job.url(), "Self-ping enabled");
    ScheduledTask::spawn(Arc::new(job), config.self_ping_interval)
}
