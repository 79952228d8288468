//! Periodic synthetic predictions that keep the deployment from going cold.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::BrokerError;
use crate::proxy::PredictionProxy;
use crate::request::PredictionRequest;
use crate::scheduler::{Job, ScheduledTask};

/// Feature schema of the production model, in column order.
pub const WARMUP_FIELDS: [&str; 16] = [
    "age",
    "hypertension",
    "heart_disease",
    "bmi",
    "HbA1c_level",
    "blood_glucose_level",
    "age_bmi",
    "hba1c_glucose",
    "ht_hd",
    "bmi_squared",
    "glucose_squared",
    "gender_Male",
    "gender_Other",
    "smoking_history_former",
    "smoking_history_never",
    "smoking_history_unknown",
];

pub struct WarmupJob {
    proxy: Arc<PredictionProxy>,
    request: PredictionRequest,
    deadline: Duration,
}

impl WarmupJob {
    pub fn new(proxy: Arc<PredictionProxy>) -> Result<Self, BrokerError> {
        let deadline = proxy.config().warmup_timeout;
        Ok(Self {
            proxy,
            request: PredictionRequest::zeroed(&WARMUP_FIELDS)?,
            deadline,
        })
    }

    pub fn request(&self) -> &PredictionRequest {
        &self.request
    }
}

#[async_trait]
impl Job for WarmupJob {
    fn name(&self) -> &'static str {
        "warmup"
    }

    /// The deadline bounds the whole firing, token exchange included.
    async fn run(&self) -> Result<(), BrokerError> {
        let url = self.proxy.deployment_url()?;
        let firing = async {
            let token = self.proxy.tokens().acquire_token().await?;
            self.proxy
                .forward(url, &token, &self.request, self.deadline)
                .await
        };
        tokio::time::timeout(self.deadline, firing)
            .await
            .map_err(|_| BrokerError::Timeout(self.deadline))??;
        tracing::info!("Warm-up ping sent to inference endpoint");
        Ok(())
    }
}

/// Start the warm-up schedule, or return `None` when it cannot run.
pub fn spawn_warmup(proxy: Arc<PredictionProxy>) -> Option<ScheduledTask> {
    let config = proxy.config();
    if !config.warmup_enabled() {
        tracing::warn!("Warm-up disabled: IBM_DEPLOYMENT_URL or IBM_API_KEY missing");
        return None;
    }
    let period = config.warmup_interval;

    match WarmupJob::new(Arc::clone(&proxy)) {
        Ok(job) => Some(ScheduledTask::spawn(Arc::new(job), period)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to build warm-up request");
            None
        }
    }
}
