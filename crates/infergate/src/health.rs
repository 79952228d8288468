//! Liveness response served on `GET /`.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::version::INFERGATE_VERSION;

pub const ALIVE_STATUS: &str = "Backend is alive";

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// RFC 3339 timestamp in UTC.
    pub time: String,
    pub version: &'static str,
}

impl HealthResponse {
    pub fn alive() -> Self {
        Self {
            status: ALIVE_STATUS,
            time: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            version: INFERGATE_VERSION,
        }
    }
}
