//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use super::env::{env_var_opt, env_var_or_default};
use crate::constants::{
    DEFAULT_BACKOFF_MAX_SECS, DEFAULT_BACKOFF_MIN_SECS, DEFAULT_CACHE_PRUNE_INTERVAL_SECS,
    DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
    DEFAULT_RECONCILE_TIMEOUT_SECS, DEFAULT_WATCH_RESTART_DELAY_SECS,
};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Where the "before" side of change detection comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BaselineMode {
    /// Compare against fingerprints remembered from the last successful pass
    #[default]
    Cache,
    /// Issue a second live read of the secret and compare against it
    SecondRead,
}

impl BaselineMode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            BaselineMode::Cache => "cache",
            BaselineMode::SecondRead => "second-read",
        }
    }
}

impl FromStr for BaselineMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cache" => Ok(BaselineMode::Cache),
            "second-read" | "second_read" | "live" => Ok(BaselineMode::SecondRead),
            other => Err(format!("unknown baseline mode '{other}'")),
        }
    }
}

impl fmt::Display for BaselineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "text" | "plain" | "pretty" => Ok(LogFormat::Text),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Deadline for one reconciliation pass (seconds)
    pub reconcile_timeout_secs: u64,
    /// First requeue delay after a failure (seconds)
    pub backoff_min_secs: u64,
    /// Maximum requeue delay after repeated failures (seconds)
    pub backoff_max_secs: u64,
    /// Watch stream restart delay after it ends or errors (seconds)
    pub watch_restart_delay_secs: u64,
    /// How often cached fingerprints and backoff state of deleted secrets are dropped (seconds)
    pub cache_prune_interval_secs: u64,
    /// Restrict the watch to one namespace; all namespaces when unset
    pub watch_namespace: Option<String>,
    /// Label selector applied to the Secret watch
    pub watch_label_selector: Option<String>,
    /// Baseline source for change detection
    pub baseline_mode: BaselineMode,
    /// Maximum concurrent reconciliations across different secrets
    pub max_concurrent_reconciliations: u16,
    /// Log format (json, text)
    pub log_format: LogFormat,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            reconcile_timeout_secs: DEFAULT_RECONCILE_TIMEOUT_SECS,
            backoff_min_secs: DEFAULT_BACKOFF_MIN_SECS,
            backoff_max_secs: DEFAULT_BACKOFF_MAX_SECS,
            watch_restart_delay_secs: DEFAULT_WATCH_RESTART_DELAY_SECS,
            cache_prune_interval_secs: DEFAULT_CACHE_PRUNE_INTERVAL_SECS,
            watch_namespace: None,
            watch_label_selector: None,
            baseline_mode: BaselineMode::default(),
            max_concurrent_reconciliations: DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            log_format: LogFormat::default(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    ///
    /// Unparseable values fall back to the default for that setting.
    #[must_use]
    pub fn from_env() -> Self {
        let config = Self {
            reconcile_timeout_secs: env_var_or_default(
                "RECONCILE_TIMEOUT_SECS",
                DEFAULT_RECONCILE_TIMEOUT_SECS,
            ),
            backoff_min_secs: env_var_or_default("BACKOFF_MIN_SECS", DEFAULT_BACKOFF_MIN_SECS),
            backoff_max_secs: env_var_or_default("BACKOFF_MAX_SECS", DEFAULT_BACKOFF_MAX_SECS),
            watch_restart_delay_secs: env_var_or_default(
                "WATCH_RESTART_DELAY_SECS",
                DEFAULT_WATCH_RESTART_DELAY_SECS,
            ),
            cache_prune_interval_secs: env_var_or_default(
                "CACHE_PRUNE_INTERVAL_SECS",
                DEFAULT_CACHE_PRUNE_INTERVAL_SECS,
            ),
            watch_namespace: env_var_opt("WATCH_NAMESPACE"),
            watch_label_selector: env_var_opt("WATCH_LABEL_SELECTOR"),
            baseline_mode: env_var_or_default("BASELINE_MODE", BaselineMode::default()),
            max_concurrent_reconciliations: env_var_or_default(
                "MAX_CONCURRENT_RECONCILIATIONS",
                DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            ),
            log_format: env_var_or_default("LOG_FORMAT", LogFormat::default()),
        };
        config.normalized()
    }

    /// Clamp settings that would otherwise stall the controller
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.reconcile_timeout_secs = self.reconcile_timeout_secs.max(1);
        self.backoff_min_secs = self.backoff_min_secs.max(1);
        self.backoff_max_secs = self.backoff_max_secs.max(self.backoff_min_secs);
        self.cache_prune_interval_secs = self.cache_prune_interval_secs.max(1);
        self.max_concurrent_reconciliations = self.max_concurrent_reconciliations.max(1);
        self
    }

    /// Get reconcile pass deadline
    #[must_use]
    pub fn reconcile_timeout(&self) -> Duration {
        Duration::from_secs(self.reconcile_timeout_secs)
    }

    #[must_use]
    pub fn cache_prune_interval(&self) -> Duration {
        Duration::from_secs(self.cache_prune_interval_secs)
    }

    /// Get watch restart delay duration
    #[must_use]
    pub fn watch_restart_delay(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_secs)
    }
}
