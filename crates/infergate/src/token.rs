//! Credential to bearer token exchange against the identity endpoint.
//!
//! Every call performs a fresh round trip. Tokens are never cached, logged,
//! or persisted.

use std::fmt;

use serde::Deserialize;

use crate::config::BrokerConfig;
use crate::error::{BrokerError, Result};

/// Grant type for exchanging an API key at the identity endpoint.
pub const APIKEY_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";

/// Long-lived API key. Immutable for the life of the process.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Short-lived bearer token minted by the identity endpoint.
pub struct AccessToken(String);

impl AccessToken {
    pub(crate) fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

fn parse_access_token(body: &str) -> Option<AccessToken> {
    let parsed: TokenResponse = serde_json::from_str(body).ok()?;
    parsed
        .access_token
        .filter(|t| !t.is_empty())
        .map(AccessToken)
}

pub struct TokenProvider {
    client: reqwest::Client,
    iam_url: String,
    credential: Option<Credential>,
}

impl TokenProvider {
    pub fn new(config: &BrokerConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            iam_url: config.iam_url.clone(),
            credential: config.credential.clone(),
        }
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    pub async fn acquire_token(&self) -> Result<AccessToken> {
        let credential = self
            .credential
            .as_ref()
            .ok_or_else(|| BrokerError::Config("missing credential (IBM_API_KEY)".to_string()))?;

        let response = self
            .client
            .post(&self.iam_url)
            .form(&[
                ("grant_type", APIKEY_GRANT_TYPE),
                ("apikey", credential.expose()),
            ])
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Identity endpoint unreachable");
                BrokerError::auth("identity endpoint unreachable")
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            tracing::error!(status = %status, error = %e, "Failed to read identity response");
            BrokerError::auth("identity response could not be read")
        })?;

        match parse_access_token(&body) {
            Some(token) => {
                tracing::debug!(status = %status, "Obtained access token");
                Ok(token)
            }
            None => {
                tracing::error!(status = %status, body = %body, "Failed to fetch access token");
                Err(BrokerError::Auth {
                    reason: "identity endpoint returned no access token".to_string(),
                    body: Some(body),
                })
            }
        }
    }
}
