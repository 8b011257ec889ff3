//! # Runtime
//!
//! Process wiring around the reconciler.
//!
//! - `context`: State shared by reconcile and error-policy callbacks
//! - `initialization`: rustls, tracing, metrics, HTTP server and client setup
//! - `watch_loop`: The `Secret` controller and its restart loop
//! - `error_policy`: Requeue backoff and controller stream error handling

pub mod context;
pub mod error_policy;
pub mod initialization;
pub mod watch_loop;

pub use context::ControllerContext;
pub use initialization::{initialize, InitializationResult};
pub use watch_loop::run_watch_loop;
