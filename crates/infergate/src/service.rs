//! BrokerService: owns the proxy and the background schedules.
//!
//! This service owns:
//! - The shared, immutable configuration
//! - The prediction proxy (token exchange + forwarding)
//! - The warm-up and self-ping schedules
//! - Stopping the schedules once the transport has shut down
//!
//! Transports hold an `Arc<BrokerService>` and delegate request handling to it.

use std::sync::{Arc, Mutex};

use crate::config::BrokerConfig;
use crate::error::Result;
use crate::proxy::PredictionProxy;
use crate::scheduler::ScheduledTask;
use crate::self_ping::spawn_self_ping;
use crate::warmup::spawn_warmup;

pub struct BrokerService {
    proxy: Arc<PredictionProxy>,
    tasks: Mutex<Vec<ScheduledTask>>,
}

impl BrokerService {
    pub fn new(config: BrokerConfig) -> Result<Self> {
        let proxy = Arc::new(PredictionProxy::new(Arc::new(config))?);
        Ok(Self::with_proxy(proxy))
    }

    pub fn with_proxy(proxy: Arc<PredictionProxy>) -> Self {
        Self {
            proxy,
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &BrokerConfig {
        self.proxy.config()
    }

    pub fn proxy(&self) -> &Arc<PredictionProxy> {
        &self.proxy
    }

    /// Log which optional settings are present. Never logs their values.
    pub fn log_configuration(&self) {
        let config = self.config();
        tracing::info!(
            credential_present = config.credential.is_some(),
            deployment_url_present = config.deployment_url.is_some(),
            iam_url = %config.iam_url,
            predict_timeout_secs = config.predict_timeout.as_secs_f64(),
            "Broker configuration loaded"
        );
    }

    /// Start warm-up (when configured) and self-ping schedules.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_background_tasks(&self) {
        let mut started = Vec::with_capacity(2);
        if let Some(task) = spawn_warmup(Arc::clone(&self.proxy)) {
            started.push(task);
        }
        started.push(spawn_self_ping(self.config(), self.proxy.client().clone()));

        self.tasks_guard().extend(started);
    }

    pub fn background_task_names(&self) -> Vec<&'static str> {
        self.tasks_guard().iter().map(|t| t.name()).collect()
    }

    /// Cancel all schedules and wait for them to stop.
    pub async fn shutdown(&self) {
        let tasks = std::mem::take(&mut *self.tasks_guard());
        for task in tasks {
            task.shutdown().await;
        }
    }

    fn tasks_guard(&self) -> std::sync::MutexGuard<'_, Vec<ScheduledTask>> {
        // A panic while holding the lock cannot leave the Vec half-updated.
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn background_tasks_without_deployment_only_self_ping() {
        let service = BrokerService::new(BrokerConfig::default()).unwrap();
        service.start_background_tasks();
        assert_eq!(service.background_task_names(), vec!["self-ping"]);

        service.shutdown().await;
        assert!(service.background_task_names().is_empty());
    }

    #[tokio::test]
    async fn background_tasks_with_full_config() {
        let config = BrokerConfig::default()
            .with_credential("k")
            .with_deployment_url("http://127.0.0.1:1/predictions");
        let service = BrokerService::new(config).unwrap();
        service.start_background_tasks();
        assert_eq!(service.background_task_names(), vec!["warmup", "self-ping"]);

        service.shutdown().await;
    }
}
