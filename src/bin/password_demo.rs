//! # Password Demo
//!
//! Serves the mounted password file and counts accesses. Deploy it with the
//! watched secret mounted at `SECRET_PATH` to see a rotation reach a workload.

use anyhow::{Context, Result};
use secret_rotation_monitor::config::{ControllerConfig, DemoConfig};
use secret_rotation_monitor::demo::{serve, DemoState};
use secret_rotation_monitor::observability::logging::init_tracing;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let log_format = ControllerConfig::from_env().log_format;
    init_tracing(log_format, "password_demo=info,secret_rotation_monitor=info")
        .context("Failed to initialize tracing subscriber")?;

    let config = DemoConfig::from_env();
    info!(path = %config.secret_path.display(), "Serving secret file");

    let state = Arc::new(DemoState::new(&config.secret_path).context("Failed to register demo metrics")?);
    serve(config.socket_addr(), state).await
}
