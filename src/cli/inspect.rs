//! # Inspect Command
//!
//! One-off reconciliation pass for a single secret.

use anyhow::{Context, Result};
use kube::Client;
use secret_rotation_monitor::config::BaselineMode;
use secret_rotation_monitor::controller::reconciler::{
    reconcile, KubeClusterReader, Reconciler, SecretKey,
};
use secret_rotation_monitor::observability::metrics::ControllerMetrics;
use std::sync::Arc;

/// Run a pass against a second live read and print what it found
pub async fn inspect_command(client: Client, key: SecretKey) -> Result<()> {
    // Counters are thrown away with the process
    let metrics = ControllerMetrics::new().context("Failed to register metrics")?;
    let reconciler = Reconciler::new(
        Arc::new(KubeClusterReader::new(client)),
        Arc::new(metrics),
        BaselineMode::SecondRead,
    );

    println!("🔍 Inspecting Secret '{key}'");
    println!();

    let report = reconcile(&reconciler, &key)
        .await
        .with_context(|| format!("Failed to inspect Secret '{key}'"))?;

    print!("{report}");

    if !report.deleted {
        let summary = report.summary();
        println!();
        if summary.all_ready() {
            println!("✅ All {} pods ready", summary.total());
        } else {
            println!(
                "⚠️  {} ready, {} partially ready, {} not running",
                summary.ready, summary.partially_ready, summary.not_running
            );
        }
    }

    Ok(())
}
