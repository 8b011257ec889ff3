//! # Reconciler
//!
//! Core reconciliation logic for watched `Secret` resources.
//!
//! A pass answers three questions about one secret:
//! - did its content change (by key, via SHA-256 fingerprints)
//! - which workloads in its namespace mount it
//! - how ready are the pods of those workloads
//!
//! ## Reconciliation Flow
//!
//! 1. Fetch the secret (NotFound is a deletion and ends the pass)
//! 2. Compare against the baseline (fingerprint cache or a second read)
//! 3. List Deployments, StatefulSets and DaemonSets in the namespace
//! 4. Keep the ones that mount the secret
//! 5. List and classify their pods
//! 6. Record the outcome, then log the collected observations

pub mod changes;
pub mod cluster;
pub mod fingerprint;
pub mod readiness;
pub mod reconcile;
pub mod report;
pub mod types;
pub mod workloads;

// Re-export public API
pub use changes::{detect_changes, detect_changes_against, FingerprintCache, KeyFingerprints, SecretSnapshot};
pub use cluster::{ClusterReader, KubeClusterReader, ReadError};
pub use fingerprint::{fingerprint, Fingerprint};
pub use readiness::{
    classify, ClassifiedPod, PodObservation, PodPhase, ReadinessSummary, ReadinessVerdict,
};
pub use reconcile::{reconcile, reconcile_with_timeout};
pub use report::{ConsumerReport, PassReport};
pub use types::{ReconcileOutcome, Reconciler, ReconcilerError, SecretKey};
pub use workloads::{find_consumers, PodTemplateOwner, WorkloadDescriptor, WorkloadKind};
