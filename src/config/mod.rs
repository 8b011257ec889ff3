//! # Controller Configuration
//!
//! Controller-level configuration loaded from environment variables (populated from a
//! ConfigMap via `envFrom` in the deployment).
//!
//! All configuration has sensible defaults and can be overridden via environment variables.

mod controller;
mod demo;
mod env;
mod server;

pub use controller::{BaselineMode, ControllerConfig, LogFormat};
pub use demo::DemoConfig;
pub use server::ServerConfig;

/// Load configuration from environment variables with defaults
#[must_use]
pub fn load_config() -> (ControllerConfig, ServerConfig) {
    (ControllerConfig::from_env(), ServerConfig::from_env())
}
