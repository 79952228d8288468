//! Transport layer for infergate.
//!
//! Currently provides HTTP transport via axum.

pub mod http;

pub use http::{ServerConfig, routes, serve, serve_listener};
