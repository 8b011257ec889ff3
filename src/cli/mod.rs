//! # SRMCTL CLI
//!
//! Command-line interface for the Secret Rotation Monitor.
//!
//! Runs the same correlation the controller runs, once, against the current
//! kubeconfig context. Nothing in the cluster is modified.
//!
//! ## Usage
//!
//! ```bash
//! # Show changed keys, consumers and pod readiness for a secret
//! srmctl inspect db-creds --namespace payments
//!
//! # List the workloads that mount a secret
//! srmctl consumers db-creds -n payments
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kube::Client;
use secret_rotation_monitor::controller::reconciler::SecretKey;

mod consumers;
mod inspect;

/// Secret Rotation Monitor CLI
#[derive(Parser)]
#[command(name = "srmctl")]
#[command(
    about = "Secret Rotation Monitor CLI",
    long_about = None,
    after_help = "\
Examples:
  srmctl inspect db-creds
  srmctl consumers db-creds --namespace payments
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Kubernetes namespace (defaults to current context namespace)
    #[arg(short, long, global = true)]
    namespace: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one reconciliation pass for a secret and print the report
    ///
    /// Changes are detected against a second live read, so a secret that is
    /// not being rotated right now reports no changed keys.
    Inspect {
        /// Name of the Secret
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// List the workloads that mount a secret
    Consumers {
        /// Name of the Secret
        #[arg(value_name = "NAME")]
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_existing| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "srmctl=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client. Ensure kubeconfig is configured.")?;

    let namespace = cli
        .namespace
        .unwrap_or_else(|| client.default_namespace().to_string());

    match cli.command {
        Commands::Inspect { name } => {
            inspect::inspect_command(client, SecretKey::new(namespace, name)).await
        }
        Commands::Consumers { name } => {
            consumers::consumers_command(client, SecretKey::new(namespace, name)).await
        }
    }
}
