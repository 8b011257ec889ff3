//! # Error Policy
//!
//! Requeue decisions for failed passes and handling of errors surfaced by the
//! controller stream. The reconciler itself never retries; redelivery happens here.

use crate::constants::DEFAULT_NAMESPACE;
use crate::controller::reconciler::{reconcile_with_timeout, ReconcilerError, SecretKey};
use crate::runtime::context::ControllerContext;
use k8s_openapi::api::core::v1::Secret;
use kube_runtime::controller::{self, Action};
use kube_runtime::watcher;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Requeue reason for ordinary failures
pub const REQUEUE_ERROR_BACKOFF: &str = "error-backoff";
/// Requeue reason for passes that hit the deadline
pub const REQUEUE_CANCELLED: &str = "cancelled";

/// Handle reconciliation errors with Fibonacci backoff
///
/// Backoff state is tracked per secret so one failing secret does not slow
/// down the others. Cancelled passes are retried after the minimum delay.
pub fn handle_reconciliation_error(
    secret: Arc<Secret>,
    error: &ReconcilerError,
    ctx: Arc<ControllerContext>,
) -> Action {
    let key = SecretKey::from_secret(&secret);

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.name = key.name.as_str(),
        resource.namespace = key.namespace.as_str(),
        error = %error
    );
    let _error_guard = error_span.enter();

    let (delay, reason) = match error {
        ReconcilerError::Cancelled { .. } => (ctx.backoff.min_delay(), REQUEUE_CANCELLED),
        _ => (ctx.backoff.next_backoff(&key), REQUEUE_ERROR_BACKOFF),
    };

    let next_trigger_time = chrono::Utc::now()
        + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero());
    info!(
        "🔄 Retrying {} in {}s (next attempt {}, trigger source: {})",
        key,
        delay.as_secs(),
        next_trigger_time.to_rfc3339(),
        reason
    );

    ctx.reconciler.metrics().record_requeue(reason);
    Action::requeue(delay)
}

/// Handle an error item from the controller stream
///
/// Reconciler failures have already gone through [`handle_reconciliation_error`]
/// and are only logged at debug level here. A queued secret that has disappeared
/// gets a deletion pass on its own task so the stream keeps being polled.
pub fn handle_controller_stream_error(
    error: controller::Error<ReconcilerError, watcher::Error>,
    ctx: &Arc<ControllerContext>,
) {
    match error {
        controller::Error::ReconcilerFailed(e, obj_ref) => {
            debug!(resource = %obj_ref, error = %e, "watch.event.reconciliation_failed");
        }
        controller::Error::ObjectNotFound(obj_ref) => {
            let key = SecretKey::new(
                obj_ref
                    .namespace
                    .clone()
                    .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
                obj_ref.name.clone(),
            );
            info!(secret = %key, "queued secret no longer exists");
            spawn_deletion_pass(Arc::clone(ctx), key);
        }
        controller::Error::QueueError(e) => {
            warn!(error = %e, "watch.error.queue");
        }
        other => {
            error!("Controller stream error: {}", other);
        }
    }
}

/// Run a pass for a secret that has gone away and drop its backoff state
///
/// The pass finds the secret missing and evicts its cached fingerprints.
pub fn spawn_deletion_pass(ctx: Arc<ControllerContext>, key: SecretKey) -> JoinHandle<()> {
    tokio::spawn(async move {
        match reconcile_with_timeout(&ctx.reconciler, &key, ctx.config.reconcile_timeout()).await {
            Ok(_) => ctx.backoff.reset(&key),
            Err(e) => warn!(secret = %key, error = %e, "deletion pass failed"),
        }
    })
}
