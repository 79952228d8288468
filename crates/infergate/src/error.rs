//! Broker error taxonomy and its client-facing JSON envelope.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// Required configuration is missing or malformed.
    #[error("server misconfigured: {0}")]
    Config(String),

    /// The client payload failed shape or value checks.
    #[error("invalid input: {0}")]
    Validation(String),

    /// The identity endpoint was unreachable or returned no token.
    ///
    /// `body` holds the raw identity response for server-side logs only.
    #[error("could not obtain access token: {reason}")]
    Auth {
        reason: String,
        body: Option<String>,
    },

    /// The inference endpoint answered with a non-success status.
    #[error("inference endpoint returned status {status}")]
    Upstream { status: u16, body: String },

    #[error("request to model timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, BrokerError>;

/// JSON body returned to callers for every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl BrokerError {
    pub fn auth(reason: impl Into<String>) -> Self {
        Self::Auth {
            reason: reason.into(),
            body: None,
        }
    }

    /// True for errors caused by the caller rather than the broker or its upstreams.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Config(_) | Self::Auth { .. } | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            // Pass the upstream status through unless it is not an error code.
            Self::Upstream { status, .. } => StatusCode::from_u16(*status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        match self {
            Self::Validation(reason) => ErrorEnvelope {
                error: "Invalid input",
                details: Some(reason.clone()),
                message: Some("Please fill all fields correctly before submitting.".to_string()),
            },
            Self::Config(reason) => ErrorEnvelope {
                error: "Server misconfigured",
                details: Some(reason.clone()),
                message: None,
            },
            // The identity response body never leaves the server.
            Self::Auth { reason, .. } => ErrorEnvelope {
                error: "Authentication failed",
                details: Some(reason.clone()),
                message: None,
            },
            Self::Upstream { body, .. } => ErrorEnvelope {
                error: "Model API call failed",
                details: Some(body.clone()),
                message: None,
            },
            Self::Timeout(_) => ErrorEnvelope {
                error: "Model API call failed",
                details: Some("Request to model timed out.".to_string()),
                message: None,
            },
            Self::Internal(reason) => ErrorEnvelope {
                error: "Internal error",
                details: Some(reason.clone()),
                message: None,
            },
        }
    }
}

impl IntoResponse for BrokerError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.envelope())).into_response()
    }
}
