//! # Observability
//!
//! Metrics and logging setup.
//!
//! - `metrics`: Prometheus metrics behind the injected `MetricsSink`
//! - `logging`: `tracing` subscriber installation

pub mod logging;
pub mod metrics;

// Re-export for convenience
pub use logging::init_tracing;
pub use metrics::{encode, ControllerMetrics, MetricsSink};
