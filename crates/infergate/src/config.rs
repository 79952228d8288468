//! Process-wide broker configuration.
//!
//! Built once at startup and shared read-only behind an `Arc`. Optional
//! values (credential, deployment URL) stay optional here: their absence
//! fails individual requests or disables warm-up instead of aborting boot.

use std::time::Duration;

use crate::error::{BrokerError, Result};
use crate::token::Credential;
use crate::transport::ServerConfig;

pub const DEFAULT_IAM_URL: &str = "https://iam.cloud.ibm.com/identity/token";

/// Forwarding deadline, sized to absorb a cold start of the deployment.
pub const DEFAULT_PREDICT_TIMEOUT: Duration = Duration::from_secs(90);
pub const DEFAULT_WARMUP_TIMEOUT: Duration = Duration::from_secs(25);
pub const DEFAULT_WARMUP_INTERVAL: Duration = Duration::from_secs(4 * 60);
pub const DEFAULT_SELF_PING_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// API key exchanged for bearer tokens (`IBM_API_KEY`).
    pub credential: Option<Credential>,
    /// Inference deployment URL (`IBM_DEPLOYMENT_URL`).
    pub deployment_url: Option<String>,
    /// Identity token endpoint.
    pub iam_url: String,
    /// Externally reachable base URL of this service, used for self-pings.
    pub public_url: Option<String>,
    pub server: ServerConfig,
    pub predict_timeout: Duration,
    pub warmup_timeout: Duration,
    pub warmup_interval: Duration,
    pub self_ping_interval: Duration,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            credential: None,
            deployment_url: None,
            iam_url: DEFAULT_IAM_URL.to_string(),
            public_url: None,
            server: ServerConfig::default(),
            predict_timeout: DEFAULT_PREDICT_TIMEOUT,
            warmup_timeout: DEFAULT_WARMUP_TIMEOUT,
            warmup_interval: DEFAULT_WARMUP_INTERVAL,
            self_ping_interval: DEFAULT_SELF_PING_INTERVAL,
        }
    }
}

impl BrokerConfig {
    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(Credential::new(credential));
        self
    }

    pub fn with_deployment_url(mut self, url: impl Into<String>) -> Self {
        self.deployment_url = Some(url.into());
        self
    }

    pub fn with_iam_url(mut self, url: impl Into<String>) -> Self {
        self.iam_url = url.into();
        self
    }

    pub fn with_public_url(mut self, url: impl Into<String>) -> Self {
        self.public_url = Some(url.into());
        self
    }

    pub fn with_predict_timeout(mut self, timeout: Duration) -> Self {
        self.predict_timeout = timeout;
        self
    }

    /// Warm-up needs both a deployment to call and a credential to call it with.
    pub fn warmup_enabled(&self) -> bool {
        self.deployment_url.is_some() && self.credential.is_some()
    }

    /// Target of the self-ping, falling back to the local listener.
    pub fn self_url(&self) -> String {
        self.public_url
            .clone()
            .unwrap_or_else(|| format!("http://127.0.0.1:{}/", self.server.port))
    }

    /// Reject malformed values at boot. Missing optional values are not errors.
    pub fn validate(&self) -> Result<()> {
        check_url("identity endpoint URL", &self.iam_url)?;
        if let Some(ref url) = self.deployment_url {
            check_url("IBM_DEPLOYMENT_URL", url)?;
        }
        if let Some(ref url) = self.public_url {
            check_url("public URL", url)?;
        }

        for (name, value) in [
            ("predict timeout", self.predict_timeout),
            ("warm-up timeout", self.warmup_timeout),
            ("warm-up interval", self.warmup_interval),
            ("self-ping interval", self.self_ping_interval),
        ] {
            if value.is_zero() {
                return Err(BrokerError::Config(format!("{name} must be greater than zero")));
            }
        }

        Ok(())
    }
}

fn check_url(name: &str, value: &str) -> Result<()> {
    let url = reqwest::Url::parse(value)
        .map_err(|e| BrokerError::Config(format!("{name} is not a valid URL ({value}): {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(BrokerError::Config(format!(
            "{name} must use http or https, got {other}"
        ))),
    }
}
