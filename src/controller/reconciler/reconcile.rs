//! # Reconcile
//!
//! One reconciliation pass for one secret:
//!
//! 1. Fetch the secret. NotFound ends the pass as a deletion.
//! 2. Obtain a baseline (fingerprint cache, or a best-effort second read). A
//!    cache miss, e.g. the first pass after a restart, is reported as a first
//!    observation of every key.
//! 3. Detect changed keys.
//! 4. List workloads in the secret's namespace and keep the consumers.
//! 5. List and classify each consumer's pods, failing fast on the first error.
//!
//! The outcome is recorded once, after every read has finished, and the
//! collected observations are emitted only when the pass succeeded. Dropping the
//! pass future at any await point therefore records and emits nothing.

use crate::config::BaselineMode;
use crate::controller::reconciler::changes::{
    detect_changes, detect_changes_against, KeyFingerprints, SecretSnapshot,
};
use crate::controller::reconciler::readiness::classify;
use crate::controller::reconciler::report::{ConsumerReport, PassReport};
use crate::controller::reconciler::types::{
    ReconcileOutcome, Reconciler, ReconcilerError, SecretKey,
};
use crate::controller::reconciler::workloads::find_consumers;
use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use tracing::{debug, error, info_span, warn, Instrument};

/// A finished pass plus what to remember about it
#[derive(Debug)]
struct CompletedPass {
    report: PassReport,
    /// Fingerprints of the current snapshot; `None` when the secret is gone
    fingerprints: Option<KeyFingerprints>,
}

/// Run one reconciliation pass and record its outcome
///
/// # Errors
///
/// Returns the first read error encountered. The failure is already counted in
/// the outcome metrics when this returns.
pub async fn reconcile(ctx: &Reconciler, key: &SecretKey) -> Result<PassReport, ReconcilerError> {
    let span = info_span!(
        "reconcile.pass",
        secret.namespace = %key.namespace,
        secret.name = %key.name,
        baseline = ctx.baseline_mode.as_str()
    );

    async move {
        let start = Instant::now();
        let result = run_pass(ctx, key).await;
        ctx.metrics
            .observe_pass_duration(start.elapsed().as_secs_f64());

        match result {
            Ok(pass) => {
                ctx.metrics.record_outcome(ReconcileOutcome::Success);
                match pass.fingerprints {
                    Some(fingerprints) if ctx.baseline_mode == BaselineMode::Cache => {
                        ctx.cache.store(key.clone(), fingerprints);
                    }
                    Some(_) => {}
                    None => {
                        ctx.cache.evict(key);
                    }
                }
                pass.report.emit();
                Ok(pass.report)
            }
            Err(e) => {
                if let Some(outcome) = e.outcome() {
                    ctx.metrics.record_outcome(outcome);
                }
                error!(error = %e, reason = e.reason(), "❌ reconciliation pass failed");
                Err(e)
            }
        }
    }
    .instrument(span)
    .await
}

/// Run [`reconcile`] under a deadline
///
/// On expiry the pass is dropped and nothing is recorded.
///
/// # Errors
///
/// Returns [`ReconcilerError::Cancelled`] when the deadline passes, otherwise
/// whatever the pass returned.
pub async fn reconcile_with_timeout(
    ctx: &Reconciler,
    key: &SecretKey,
    timeout: Duration,
) -> Result<PassReport, ReconcilerError> {
    match tokio::time::timeout(timeout, reconcile(ctx, key)).await {
        Ok(result) => result,
        Err(_elapsed) => {
            warn!(secret = %key, ?timeout, "⏱️  reconciliation pass timed out");
            Err(ReconcilerError::Cancelled {
                key: key.clone(),
                timeout,
            })
        }
    }
}

async fn run_pass(ctx: &Reconciler, key: &SecretKey) -> Result<CompletedPass, ReconcilerError> {
    let current = ctx
        .reader
        .get_secret(key)
        .await
        .map_err(|source| ReconcilerError::SecretRead {
            key: key.clone(),
            source,
        })?;

    let Some(current) = current else {
        return Ok(CompletedPass {
            report: PassReport::deleted(key.clone()),
            fingerprints: None,
        });
    };
    debug!(keys = current.len(), "fetched secret");

    let fingerprints = KeyFingerprints::of(&current);
    let (changed_keys, first_observation) = match ctx.baseline_mode {
        BaselineMode::Cache => {
            let baseline = ctx.cache.get(key);
            (
                detect_changes_against(baseline.as_ref(), &fingerprints),
                baseline.is_none(),
            )
        }
        BaselineMode::SecondRead => (changes_against_second_read(ctx, key, &current).await, false),
    };

    let workloads = ctx
        .reader
        .list_workloads(&key.namespace)
        .await
        .map_err(|source| ReconcilerError::WorkloadList {
            namespace: key.namespace.clone(),
            source,
        })?;

    let mut consumers = Vec::new();
    for workload in find_consumers(key, workloads) {
        if workload.selector.is_empty() {
            // An empty selector would match every pod in the namespace
            consumers.push(ConsumerReport {
                workload,
                pods: Vec::new(),
            });
            continue;
        }

        let pods = ctx
            .reader
            .list_pods(&workload.namespace, &workload.label_selector())
            .await
            .map_err(|source| ReconcilerError::PodList {
                workload: workload.to_string(),
                source,
            })?;

        consumers.push(ConsumerReport {
            workload,
            pods: classify(pods),
        });
    }

    Ok(CompletedPass {
        report: PassReport {
            secret: key.clone(),
            deleted: false,
            first_observation,
            changed_keys,
            consumers,
        },
        fingerprints: Some(fingerprints),
    })
}

/// Compare against a second live read
///
/// The second read is best-effort: when it fails or finds nothing, comparison
/// is skipped and no keys are reported.
async fn changes_against_second_read(
    ctx: &Reconciler,
    key: &SecretKey,
    current: &SecretSnapshot,
) -> BTreeSet<String> {
    match ctx.reader.get_secret(key).await {
        Ok(Some(baseline)) => detect_changes(Some(&baseline), current),
        Ok(None) => {
            warn!(secret = %key, "baseline read found no secret, skipping comparison");
            BTreeSet::new()
        }
        Err(e) => {
            warn!(secret = %key, error = %e, "baseline read failed, skipping comparison");
            BTreeSet::new()
        }
    }
}
