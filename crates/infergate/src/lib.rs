//! infergate: token-brokering proxy for a hosted inference endpoint.
//!
//! Validates prediction requests, exchanges an API key for a short-lived
//! bearer token, forwards under a deadline, and keeps the deployment warm
//! with background schedules.

pub mod config;
pub mod error;
mod health;
pub mod proxy;
pub mod request;
pub mod scheduler;
pub mod self_ping;
pub mod service;
pub mod token;
pub mod transport;
mod version;
pub mod warmup;

pub use config::BrokerConfig;
pub use error::{BrokerError, ErrorEnvelope};
pub use health::HealthResponse;
pub use proxy::PredictionProxy;
pub use request::PredictionRequest;
pub use scheduler::{Job, ScheduledTask};
pub use service::BrokerService;
pub use token::{AccessToken, Credential, TokenProvider};
pub use version::{INFERGATE_VERSION, user_agent};
