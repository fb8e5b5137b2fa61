//! Recipe API auth core
//!
//! Registration, login and role-gated access for the recipe HTTP API.
//! Exposes the router so binaries and tests share one wiring.

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod middleware;

pub use app::App;
pub use config::{AppConfig, ServerArgs};
