//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ## Usage
//!
//! ```rust
//! use secret_rotation_monitor::prelude::*;
//! ```
//!
//! This brings into scope:
//! - The cluster reader seam (ClusterReader, KubeClusterReader)
//! - Reconciler types (Reconciler, ReconcilerError, PassReport, etc.)
//! - Config types (ControllerConfig, ServerConfig, BaselineMode)

// Reconciler types - core controller functionality
pub use crate::controller::reconciler::{
    find_consumers, reconcile, reconcile_with_timeout, ClassifiedPod, ConsumerReport, PassReport,
    ReadinessSummary, ReadinessVerdict, ReconcileOutcome, Reconciler, ReconcilerError, SecretKey,
    SecretSnapshot, WorkloadDescriptor, WorkloadKind,
};

// Cluster access - implement ClusterReader to drive passes from other sources
pub use crate::controller::reconciler::{ClusterReader, KubeClusterReader, ReadError};

// Config types - for configuration management
pub use crate::config::{BaselineMode, ControllerConfig, LogFormat, ServerConfig};

pub use crate::observability::metrics::{ControllerMetrics, MetricsSink};
