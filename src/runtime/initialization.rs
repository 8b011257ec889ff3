//! # Initialization
//!
//! Controller initialization logic including rustls setup, tracing, metrics,
//! server startup, and Kubernetes client setup.

use crate::config::{load_config, ServerConfig};
use crate::controller::reconciler::{KubeClusterReader, Reconciler};
use crate::controller::server::{start_server, ServerState};
use crate::observability::logging::{init_tracing, DEFAULT_LOG_FILTER};
use crate::observability::metrics::ControllerMetrics;
use crate::runtime::context::ControllerContext;
use anyhow::{Context, Result};
use k8s_openapi::api::core::v1::Secret;
use kube::{api::Api, Client};
use std::sync::Arc;
use tracing::{error, info};

/// Initialization result containing all necessary components for the controller
pub struct InitializationResult {
    /// Kubernetes client
    pub client: Client,
    /// API for the watched secrets (all namespaces or `WATCH_NAMESPACE`)
    pub secrets: Api<Secret>,
    /// Context shared with reconcile and error-policy callbacks
    pub context: Arc<ControllerContext>,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("server_ready", &self.server_state.is_ready())
            .field("config", &self.context.config)
            .finish_non_exhaustive()
    }
}

/// Initialize the controller runtime
///
/// This function handles:
/// - rustls crypto provider setup
/// - Tracing subscriber setup
/// - Metrics registration
/// - HTTP server startup
/// - Kubernetes client creation
/// - Reconciler setup
///
/// # Errors
///
/// Fails if any of the above cannot be set up.
pub async fn initialize() -> Result<InitializationResult> {
    // Must happen before anything that opens a TLS connection
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_existing| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    let (controller_config, server_config) = load_config();

    init_tracing(controller_config.log_format, DEFAULT_LOG_FILTER)
        .context("Failed to initialize tracing subscriber")?;

    info!("Starting Secret Rotation Monitor");
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );
    info!(
        baseline_mode = %controller_config.baseline_mode,
        namespace = controller_config.watch_namespace.as_deref().unwrap_or("*"),
        label_selector = controller_config.watch_label_selector.as_deref().unwrap_or(""),
        concurrency = controller_config.max_concurrent_reconciliations,
        "Controller configuration loaded"
    );

    let metrics =
        Arc::new(ControllerMetrics::new().context("Failed to register controller metrics")?);
    let server_state = Arc::new(ServerState::new(metrics.registry().clone()));

    // Start HTTP server for metrics and probes, and wait for it to bind
    let server_addr = server_config.socket_addr();
    let server_state_clone = Arc::clone(&server_state);
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_addr, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });
    wait_for_server_ready(&server_state, &server_handle, &server_config).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let secrets: Api<Secret> = match controller_config.watch_namespace.as_deref() {
        Some(namespace) => Api::namespaced(client.clone(), namespace),
        None => Api::all(client.clone()),
    };

    let reconciler = Arc::new(Reconciler::new(
        Arc::new(KubeClusterReader::new(client.clone())),
        metrics,
        controller_config.baseline_mode,
    ));
    let context = Arc::new(ControllerContext::new(reconciler, controller_config));

    info!("Controller initialized, starting watch loop...");

    Ok(InitializationResult {
        client,
        secrets,
        context,
        server_state,
    })
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &ServerState,
    server_handle: &tokio::task::JoinHandle<()>,
    server_config: &ServerConfig,
) -> Result<()> {
    let startup_timeout = server_config.startup_timeout();
    let poll_interval = server_config.poll_interval();
    let start_time = std::time::Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state.is_ready() {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }
}
