//! PredictionProxy: validate, authenticate, forward under a deadline.

use std::sync::Arc;
use std::time::Duration;

use crate::config::BrokerConfig;
use crate::error::{BrokerError, Result};
use crate::request::PredictionRequest;
use crate::token::{AccessToken, TokenProvider};
use crate::version::user_agent;

pub struct PredictionProxy {
    config: Arc<BrokerConfig>,
    tokens: TokenProvider,
    client: reqwest::Client,
}

impl PredictionProxy {
    pub fn new(config: Arc<BrokerConfig>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent())
            .build()
            .map_err(|e| BrokerError::Internal(format!("failed to create HTTP client: {e}")))?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: Arc<BrokerConfig>, client: reqwest::Client) -> Self {
        let tokens = TokenProvider::new(&config, client.clone());
        Self {
            config,
            tokens,
            client,
        }
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    pub fn tokens(&self) -> &TokenProvider {
        &self.tokens
    }

    pub(crate) fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn deployment_url(&self) -> Result<&str> {
        self.config
            .deployment_url
            .as_deref()
            .ok_or_else(|| BrokerError::Config("IBM_DEPLOYMENT_URL not set".to_string()))
    }

    /// Handle one raw `/predict` body end to end.
    ///
    /// Validation and configuration failures return before any network call.
    pub async fn predict(&self, body: &[u8]) -> Result<serde_json::Value> {
        let request = PredictionRequest::from_slice(body)?;
        let url = self.deployment_url()?;
        let token = self.tokens.acquire_token().await?;
        self.forward(url, &token, &request, self.config.predict_timeout)
            .await
    }

    /// Send one request to the inference endpoint, bounded by `deadline`.
    ///
    /// On expiry the in-flight call is dropped, which aborts the connection.
    pub async fn forward(
        &self,
        url: &str,
        token: &AccessToken,
        request: &PredictionRequest,
        deadline: Duration,
    ) -> Result<serde_json::Value> {
        let call = async {
            let response = self
                .client
                .post(url)
                .bearer_auth(token.secret())
                .json(&request.to_payload())
                .send()
                .await
                .map_err(|e| BrokerError::Internal(format!("inference request failed: {e}")))?;

            let status = response.status();
            let body = response.text().await.map_err(|e| {
                BrokerError::Internal(format!("failed to read inference response: {e}"))
            })?;
            Ok::<_, BrokerError>((status, body))
        };

        let (status, body) = tokio::time::timeout(deadline, call)
            .await
            .map_err(|_| BrokerError::Timeout(deadline))??;

        if !status.is_success() {
            tracing::error!(status = %status, body = %body, "Model API call failed");
            return Err(BrokerError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let result = serde_json::from_str(&body).map_err(|e| {
            BrokerError::Internal(format!("inference endpoint returned invalid JSON: {e}"))
        })?;
        tracing::debug!(status = %status, fields = request.len(), "Received prediction");
        Ok(result)
    }
}
