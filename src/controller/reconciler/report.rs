//! # Pass Report
//!
//! Everything a completed reconciliation pass observed. Observations are
//! collected here while the pass runs and emitted as log events only after the
//! pass has succeeded, so a failed or cancelled pass never logs a partial picture.
//!
//! A secret seen for the first time in cache mode has no baseline, so every key
//! counts as changed. Those keys are logged as `secret key first observed`
//! rather than `secret value changed`, which keeps a controller restart from
//! looking like a rotation of every watched secret.

use crate::controller::reconciler::readiness::{ClassifiedPod, ReadinessSummary, ReadinessVerdict};
use crate::controller::reconciler::types::SecretKey;
use crate::controller::reconciler::workloads::WorkloadDescriptor;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{info, warn};

/// Pods observed for one consuming workload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerReport {
    pub workload: WorkloadDescriptor,
    pub pods: Vec<ClassifiedPod>,
}

impl ConsumerReport {
    #[must_use]
    pub fn summary(&self) -> ReadinessSummary {
        ReadinessSummary::from_classified(&self.pods)
    }
}

/// Result of a successful reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub secret: SecretKey,
    /// The secret no longer exists; nothing was correlated
    pub deleted: bool,
    /// No baseline existed; `changed_keys` holds every key of the secret
    pub first_observation: bool,
    pub changed_keys: BTreeSet<String>,
    pub consumers: Vec<ConsumerReport>,
}

impl PassReport {
    #[must_use]
    pub fn deleted(secret: SecretKey) -> Self {
        Self {
            secret,
            deleted: true,
            first_observation: false,
            changed_keys: BTreeSet::new(),
            consumers: Vec::new(),
        }
    }

    /// Readiness counts across every consumer
    #[must_use]
    pub fn summary(&self) -> ReadinessSummary {
        self.consumers
            .iter()
            .map(ConsumerReport::summary)
            .fold(ReadinessSummary::default(), |acc, s| ReadinessSummary {
                ready: acc.ready + s.ready,
                partially_ready: acc.partially_ready + s.partially_ready,
                not_running: acc.not_running + s.not_running,
            })
    }

    /// Emit the collected observations as structured log events
    pub fn emit(&self) {
        if self.deleted {
            info!(secret = %self.secret, "🗑️  secret no longer exists, nothing to correlate");
            return;
        }

        for key in &self.changed_keys {
            if self.first_observation {
                info!(
                    key = %key,
                    secret = %self.secret.name,
                    namespace = %self.secret.namespace,
                    "secret key first observed"
                );
            } else {
                info!(
                    key = %key,
                    secret = %self.secret.name,
                    namespace = %self.secret.namespace,
                    "secret value changed"
                );
            }
        }

        for consumer in &self.consumers {
            let workload = &consumer.workload;
            info!(
                kind = %workload.kind,
                workload = %workload.name,
                namespace = %workload.namespace,
                secret = %self.secret.name,
                "{} uses updated secret: {}",
                workload.kind.as_str().to_lowercase(),
                workload.name
            );
            info!(
                workload = %workload.name,
                selector = %workload.label_selector(),
                count = consumer.pods.len(),
                "found {} pods for {}",
                consumer.pods.len(),
                workload.name
            );

            for classified in &consumer.pods {
                let pod = &classified.pod;
                match classified.verdict {
                    ReadinessVerdict::Ready => info!(
                        pod = %pod.name,
                        workload = %workload.name,
                        phase = pod.phase.as_str(),
                        "pod is ready"
                    ),
                    ReadinessVerdict::PartiallyReady => warn!(
                        pod = %pod.name,
                        workload = %workload.name,
                        phase = pod.phase.as_str(),
                        ready_containers = pod.container_ready.iter().filter(|r| **r).count(),
                        containers = pod.container_ready.len(),
                        "pod is not fully ready"
                    ),
                    ReadinessVerdict::NotRunning => warn!(
                        pod = %pod.name,
                        workload = %workload.name,
                        phase = pod.phase.as_str(),
                        "pod is not in Running phase"
                    ),
                }
            }
        }
    }
}

impl fmt::Display for PassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Secret: {}", self.secret)?;
        if self.deleted {
            return writeln!(f, "  (not found)");
        }

        let label = if self.first_observation {
            "Keys (first observation)"
        } else {
            "Changed keys"
        };
        if self.changed_keys.is_empty() {
            writeln!(f, "{label}: none")?;
        } else {
            let keys: Vec<&str> = self.changed_keys.iter().map(String::as_str).collect();
            writeln!(f, "{label}: {}", keys.join(", "))?;
        }

        if self.consumers.is_empty() {
            return writeln!(f, "Consumers: none");
        }

        writeln!(f, "Consumers:")?;
        for consumer in &self.consumers {
            let summary = consumer.summary();
            writeln!(
                f,
                "  {} {} ({}/{} ready)",
                consumer.workload.kind,
                consumer.workload.name,
                summary.ready,
                summary.total()
            )?;
            for classified in &consumer.pods {
                writeln!(
                    f,
                    "    {:<40} {:<10} {}",
                    classified.pod.name,
                    classified.pod.phase.as_str(),
                    classified.verdict.as_str()
                )?;
            }
        }
        Ok(())
    }
}
