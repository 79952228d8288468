//! Version information for infergate.

/// Broker version from Cargo.toml
pub const INFERGATE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent sent on every outbound request.
pub fn user_agent() -> String {
    format!("infergate/{}", INFERGATE_VERSION)
}
