//! # Consumers Command
//!
//! Lists the workloads in a secret's namespace that mount it.

use anyhow::{Context, Result};
use kube::Client;
use secret_rotation_monitor::controller::reconciler::{
    find_consumers, ClusterReader, KubeClusterReader, SecretKey,
};

pub async fn consumers_command(client: Client, key: SecretKey) -> Result<()> {
    let reader = KubeClusterReader::new(client);

    let workloads = reader
        .list_workloads(&key.namespace)
        .await
        .with_context(|| format!("Failed to list workloads in namespace '{}'", key.namespace))?;
    let consumers = find_consumers(&key, workloads);

    if consumers.is_empty() {
        println!("No workloads in namespace '{}' mount Secret '{}'", key.namespace, key.name);
        return Ok(());
    }

    println!("{:<14} {:<40} SELECTOR", "KIND", "NAME");
    for workload in consumers {
        let selector = workload.label_selector();
        println!(
            "{:<14} {:<40} {}",
            workload.kind.as_str(),
            workload.name,
            if selector.is_empty() { "<none>" } else { selector.as_str() }
        );
    }

    Ok(())
}
