//! # Secret Rotation Monitor
//!
//! A Kubernetes controller that watches `Secret` resources and reports which
//! workloads consume a changed secret and how ready their pods are.
//!
//! ## Overview
//!
//! For every create or update of a watched secret the controller:
//!
//! 1. **Detects changed keys** - Compares per-key SHA-256 fingerprints against a baseline
//! 2. **Finds consumers** - Deployments, StatefulSets and DaemonSets in the same namespace
//!    that mount the secret as a volume or projected source
//! 3. **Classifies pods** - Ready, partially ready, or not running
//!
//! Observations are logged; outcomes are counted in `reconciles_total`.
//!
//! ## Endpoints
//!
//! - `/metrics` - Prometheus metrics
//! - `/healthz` - Liveness probe
//! - `/readyz` - Readiness probe

use anyhow::Result;
use secret_rotation_monitor::runtime::{initialize, run_watch_loop};

#[tokio::main]
async fn main() -> Result<()> {
    let init = initialize().await?;
    run_watch_loop(init.secrets, init.context, init.server_state).await
}
