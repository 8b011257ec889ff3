//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `reconciles_total{result}` - Reconciliation passes by outcome (`success`, `failure`)
//! - `reconcile_duration_seconds` - Duration of completed reconciliation passes
//! - `reconcile_requeues_total{reason}` - Requeues scheduled by the error policy
//!
//! Metrics live in a [`Registry`] owned by [`ControllerMetrics`]. The reconciler
//! only sees the [`MetricsSink`] trait, so tests can inject their own sink.

use crate::controller::reconciler::ReconcileOutcome;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder};
use std::fmt::Debug;

/// Where reconciliation outcomes are recorded
///
/// Implementations must be safe to call from concurrent passes.
pub trait MetricsSink: Send + Sync + Debug {
    fn record_outcome(&self, outcome: ReconcileOutcome);

    fn observe_pass_duration(&self, _seconds: f64) {}

    fn record_requeue(&self, _reason: &str) {}
}

/// Prometheus-backed [`MetricsSink`]
#[derive(Clone)]
pub struct ControllerMetrics {
    registry: Registry,
    reconciles_total: IntCounterVec,
    reconcile_duration: Histogram,
    requeues_total: IntCounterVec,
}

impl std::fmt::Debug for ControllerMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerMetrics")
            .field("observed_passes", &self.observed_passes())
            .finish_non_exhaustive()
    }
}

impl ControllerMetrics {
    /// Create the controller metrics in a fresh registry
    ///
    /// # Errors
    ///
    /// Fails if a metric cannot be created or registered.
    pub fn new() -> prometheus::Result<Self> {
        Self::with_registry(Registry::new())
    }

    /// Create the controller metrics in an existing registry
    ///
    /// # Errors
    ///
    /// Fails if a metric with the same name is already registered.
    pub fn with_registry(registry: Registry) -> prometheus::Result<Self> {
        let reconciles_total = IntCounterVec::new(
            Opts::new("reconciles_total", "Total number of reconciliation passes by result"),
            &["result"],
        )?;
        let reconcile_duration = Histogram::with_opts(
            HistogramOpts::new(
                "reconcile_duration_seconds",
                "Duration of reconciliation passes in seconds",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )?;
        let requeues_total = IntCounterVec::new(
            Opts::new(
                "reconcile_requeues_total",
                "Total number of requeues scheduled after a failed pass",
            ),
            &["reason"],
        )?;

        registry.register(Box::new(reconciles_total.clone()))?;
        registry.register(Box::new(reconcile_duration.clone()))?;
        registry.register(Box::new(requeues_total.clone()))?;

        // Export both series from the start so rate() queries have a baseline
        for outcome in [ReconcileOutcome::Success, ReconcileOutcome::Failure] {
            reconciles_total.with_label_values(&[outcome.as_str()]);
        }

        Ok(Self {
            registry,
            reconciles_total,
            reconcile_duration,
            requeues_total,
        })
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Current count for one outcome
    #[must_use]
    pub fn reconciles(&self, outcome: ReconcileOutcome) -> u64 {
        self.reconciles_total
            .with_label_values(&[outcome.as_str()])
            .get()
    }

    #[must_use]
    pub fn requeues(&self, reason: &str) -> u64 {
        self.requeues_total.with_label_values(&[reason]).get()
    }

    /// Number of observed pass durations
    #[must_use]
    pub fn observed_passes(&self) -> u64 {
        self.reconcile_duration.get_sample_count()
    }
}

impl MetricsSink for ControllerMetrics {
    fn record_outcome(&self, outcome: ReconcileOutcome) {
        self.reconciles_total
            .with_label_values(&[outcome.as_str()])
            .inc();
    }

    fn observe_pass_duration(&self, seconds: f64) {
        self.reconcile_duration.observe(seconds);
    }

    fn record_requeue(&self, reason: &str) {
        self.requeues_total.with_label_values(&[reason]).inc();
    }
}

/// Render every metric in `registry` in the Prometheus text format
///
/// # Errors
///
/// Fails if the encoder rejects a metric family.
pub fn encode(registry: &Registry) -> prometheus::Result<(String, Vec<u8>)> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer)?;
    Ok((encoder.format_type().to_string(), buffer))
}
