//! # Controller Context
//!
//! Shared state handed to every reconcile and error-policy call.

use crate::config::ControllerConfig;
use crate::controller::backoff::BackoffTracker;
use crate::controller::reconciler::{Reconciler, SecretKey};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug)]
pub struct ControllerContext {
    pub reconciler: Arc<Reconciler>,
    /// Requeue delays per secret, reset after a successful pass
    pub backoff: BackoffTracker<SecretKey>,
    pub config: ControllerConfig,
}

impl ControllerContext {
    #[must_use]
    pub fn new(reconciler: Arc<Reconciler>, config: ControllerConfig) -> Self {
        Self {
            reconciler,
            backoff: BackoffTracker::new(config.backoff_min_secs, config.backoff_max_secs),
            config,
        }
    }

    /// Forget cached fingerprints and backoff state of secrets not in `live`
    ///
    /// Deleted secrets are never reconciled again, so without this their
    /// entries would stay until the process exits. Returns the number of
    /// entries dropped.
    pub fn prune_to(&self, live: &HashSet<SecretKey>) -> usize {
        self.reconciler.cache().retain(|key| live.contains(key))
            + self.backoff.retain(|key| live.contains(key))
    }
}
