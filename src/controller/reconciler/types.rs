//! # Types
//!
//! Core types for the reconciler.

use crate::config::BaselineMode;
use crate::constants::DEFAULT_NAMESPACE;
use crate::controller::reconciler::changes::FingerprintCache;
use crate::controller::reconciler::cluster::{ClusterReader, ReadError};
use crate::observability::metrics::MetricsSink;
use k8s_openapi::api::core::v1::Secret;
use kube::ResourceExt;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Identity of a watched secret
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SecretKey {
    pub namespace: String,
    pub name: String,
}

impl SecretKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Identity of a watched `Secret` object
    #[must_use]
    pub fn from_secret(secret: &Secret) -> Self {
        Self {
            namespace: secret
                .namespace()
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            name: secret.name_any(),
        }
    }
}

impl fmt::Display for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Result of one reconciliation pass, as counted in `reconciles_total`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReconcileOutcome {
    Success,
    Failure,
}

impl ReconcileOutcome {
    /// Label value for the `result` label
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileOutcome::Success => "success",
            ReconcileOutcome::Failure => "failure",
        }
    }
}

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("failed to fetch secret {key}: {source}")]
    SecretRead {
        key: SecretKey,
        #[source]
        source: ReadError,
    },
    #[error("failed to list workloads in namespace {namespace}: {source}")]
    WorkloadList {
        namespace: String,
        #[source]
        source: ReadError,
    },
    #[error("failed to list pods for {workload}: {source}")]
    PodList {
        workload: String,
        #[source]
        source: ReadError,
    },
    #[error("reconciliation of {key} cancelled after {timeout:?}")]
    Cancelled { key: SecretKey, timeout: Duration },
}

impl ReconcilerError {
    /// Outcome recorded for this error; cancelled passes record nothing
    #[must_use]
    pub fn outcome(&self) -> Option<ReconcileOutcome> {
        match self {
            ReconcilerError::Cancelled { .. } => None,
            _ => Some(ReconcileOutcome::Failure),
        }
    }

    /// Short reason used for requeue metrics
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            ReconcilerError::SecretRead { .. } => "secret-read",
            ReconcilerError::WorkloadList { .. } => "workload-list",
            ReconcilerError::PodList { .. } => "pod-list",
            ReconcilerError::Cancelled { .. } => "cancelled",
        }
    }
}

/// Reconciler context shared by all passes
///
/// Holds the read-only cluster view, the outcome sink, and the fingerprint cache.
/// Everything else is built per pass and dropped when the pass ends.
pub struct Reconciler {
    pub(crate) reader: Arc<dyn ClusterReader>,
    pub(crate) metrics: Arc<dyn MetricsSink>,
    pub(crate) baseline_mode: BaselineMode,
    pub(crate) cache: FingerprintCache,
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("baseline_mode", &self.baseline_mode)
            .field("cached_secrets", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(
        reader: Arc<dyn ClusterReader>,
        metrics: Arc<dyn MetricsSink>,
        baseline_mode: BaselineMode,
    ) -> Self {
        Self {
            reader,
            metrics,
            baseline_mode,
            cache: FingerprintCache::default(),
        }
    }

    #[must_use]
    pub fn baseline_mode(&self) -> BaselineMode {
        self.baseline_mode
    }

    /// Fingerprints remembered from successful passes
    #[must_use]
    pub fn cache(&self) -> &FingerprintCache {
        &self.cache
    }

    #[must_use]
    pub fn metrics(&self) -> &dyn MetricsSink {
        self.metrics.as_ref()
    }
}
