//! Secret Rotation Monitor Library
//!
//! This library provides the core functionality for the Secret Rotation Monitor.
//! Tests are included in the module files (e.g., `controller/reconciler/changes.rs`).
//!
//! ## Quick Start
//!
//! ```rust
//! use secret_rotation_monitor::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod config;
pub mod constants;
pub mod controller;
pub mod demo;
pub mod observability;
pub mod prelude;
pub mod runtime;
