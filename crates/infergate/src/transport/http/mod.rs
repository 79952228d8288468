//! HTTP transport: axum routes and server lifecycle.

mod routes;
mod server;

pub use routes::routes;
pub use server::{ServerConfig, serve, serve_listener};
