//! # Controller
//!
//! Core controller modules for the Secret Rotation Monitor.
//!
//! - `backoff`: Fibonacci backoff mechanism for retries
//! - `reconciler`: Change detection and workload/pod correlation
//! - `server`: HTTP server for metrics and health checks

pub mod backoff;
pub mod reconciler;
pub mod server;
