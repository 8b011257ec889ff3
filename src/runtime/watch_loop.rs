//! # Watch Loop
//!
//! Controller watch loop that monitors `Secret` resources and triggers a
//! reconciliation pass when one is created or changes.
//!
//! The kube-runtime controller never runs two passes for the same secret at
//! once, which the change detection relies on. Passes for different secrets run
//! concurrently up to `MAX_CONCURRENT_RECONCILIATIONS`.

use crate::controller::reconciler::{reconcile_with_timeout, ReconcilerError, SecretKey};
use crate::controller::server::ServerState;
use crate::runtime::context::ControllerContext;
use crate::runtime::error_policy::{handle_controller_stream_error, handle_reconciliation_error};
use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use kube::api::Api;
use kube_runtime::reflector::Store;
use kube_runtime::{controller, controller::Action, watcher, Controller};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn, Instrument};

/// Run the controller watch loop
///
/// Restarts the controller whenever its stream ends, until a shutdown signal
/// marks the server as not ready.
///
/// # Errors
///
/// Currently always returns `Ok` once shutdown completes.
pub async fn run_watch_loop(
    secrets: Api<Secret>,
    context: Arc<ControllerContext>,
    server_state: Arc<ServerState>,
) -> Result<(), anyhow::Error> {
    // Mark not ready on SIGINT/SIGTERM so probes stop routing while we drain
    let shutdown_server_state = Arc::clone(&server_state);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Received shutdown signal (SIGINT/SIGTERM), initiating graceful shutdown...");
        shutdown_server_state.set_ready(false);
        info!("Marked server as not ready, waiting for in-flight reconciliations to complete...");
    });

    let mut watcher_config = watcher::Config::default().any_semantic();
    if let Some(selector) = context.config.watch_label_selector.as_deref() {
        watcher_config = watcher_config.labels(selector);
    }
    let controller_config =
        controller::Config::default().concurrency(context.config.max_concurrent_reconciliations);

    loop {
        if !server_state.is_ready() {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        let watch_span = tracing::span!(
            tracing::Level::INFO,
            "controller.watch",
            operation = "watch_loop"
        );

        info!("Starting controller watch loop...");
        let stream_context = Arc::clone(&context);
        let controller = Controller::new(secrets.clone(), watcher_config.clone())
            .with_config(controller_config.clone());

        // Deleted secrets are never reconciled, so their state is pruned against
        // the controller's own view of what still exists
        let pruner = tokio::spawn(prune_stale_entries(
            controller.store(),
            Arc::clone(&context),
            context.config.cache_prune_interval(),
        ));

        controller
            .shutdown_on_signal()
            .run(reconcile_secret, handle_reconciliation_error, Arc::clone(&context))
            .for_each(|result| {
                match result {
                    Ok((obj_ref, _action)) => {
                        debug!(resource = %obj_ref, "watch.event.reconciled");
                    }
                    Err(e) => handle_controller_stream_error(e, &stream_context),
                }
                futures::future::ready(())
            })
            .instrument(watch_span)
            .await;

        pruner.abort();

        if !server_state.is_ready() {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        let delay = context.config.watch_restart_delay();
        warn!(
            "Controller watch stream ended, restarting in {} seconds...",
            delay.as_secs()
        );
        tokio::time::sleep(delay).await;
    }

    info!("Controller stopped gracefully");
    Ok(())
}

/// Reconcile callback handed to the controller
async fn reconcile_secret(
    secret: Arc<Secret>,
    ctx: Arc<ControllerContext>,
) -> Result<Action, ReconcilerError> {
    let key = SecretKey::from_secret(&secret);
    let resource_version = secret
        .metadata
        .resource_version
        .as_deref()
        .unwrap_or("unknown");
    debug!(
        resource.name = key.name.as_str(),
        resource.namespace = key.namespace.as_str(),
        resource.version = resource_version,
        "watch.event.received"
    );

    reconcile_with_timeout(&ctx.reconciler, &key, ctx.config.reconcile_timeout()).await?;
    ctx.backoff.reset(&key);

    // Nothing to poll for: the next change to the secret triggers the next pass
    Ok(Action::await_change())
}

/// Periodically drop per-secret state for secrets missing from `store`
///
/// Waits for the initial list so a fresh store does not wipe everything.
async fn prune_stale_entries(store: Store<Secret>, ctx: Arc<ControllerContext>, every: Duration) {
    if store.wait_until_ready().await.is_err() {
        return;
    }

    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let live: HashSet<SecretKey> = store
            .state()
            .iter()
            .map(|secret| SecretKey::from_secret(secret))
            .collect();
        let pruned = ctx.prune_to(&live);
        if pruned > 0 {
            debug!(pruned, watched = live.len(), "dropped state of deleted secrets");
        }
    }
}

/// Resolves on SIGINT, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
