//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! environment variables where applicable.

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default bind address for the metrics and probe server
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Deadline for a single reconciliation pass (seconds)
/// A pass that exceeds it is dropped and left to redelivery
pub const DEFAULT_RECONCILE_TIMEOUT_SECS: u64 = 30;

/// First requeue delay after a failed pass (seconds)
pub const DEFAULT_BACKOFF_MIN_SECS: u64 = 5;

/// Upper bound for the requeue delay after repeated failures (seconds)
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 300;

/// Default delay before restarting watch stream after it ends or errors (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// How often per-secret state is pruned against the watch store (seconds)
pub const DEFAULT_CACHE_PRUNE_INTERVAL_SECS: u64 = 60;

/// Default number of secrets reconciled in parallel
pub const DEFAULT_MAX_CONCURRENT_RECONCILIATIONS: u16 = 10;

/// Default path of the password file served by the demo service
pub const DEFAULT_DEMO_SECRET_PATH: &str = "/etc/secret-volume/password";

/// Default port of the demo service
pub const DEFAULT_DEMO_PORT: u16 = 8080;

/// Fallback namespace for objects whose metadata carries none
pub const DEFAULT_NAMESPACE: &str = "default";
