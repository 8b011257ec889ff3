//! # Readiness
//!
//! Classifies pods into three readiness states. Classification is pure and
//! depends only on the pod phase and its container ready flags.

use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;

/// Pod lifecycle phase as reported by the API server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl PodPhase {
    /// Parse a phase string; missing or unrecognized values are `Unknown`
    #[must_use]
    pub fn parse(phase: Option<&str>) -> Self {
        match phase {
            Some("Pending") => PodPhase::Pending,
            Some("Running") => PodPhase::Running,
            Some("Succeeded") => PodPhase::Succeeded,
            Some("Failed") => PodPhase::Failed,
            _ => PodPhase::Unknown,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            PodPhase::Pending => "Pending",
            PodPhase::Running => "Running",
            PodPhase::Succeeded => "Succeeded",
            PodPhase::Failed => "Failed",
            PodPhase::Unknown => "Unknown",
        }
    }
}

/// The parts of a pod that readiness depends on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodObservation {
    pub name: String,
    pub phase: PodPhase,
    /// One flag per container status
    pub container_ready: Vec<bool>,
}

impl PodObservation {
    pub fn new(name: impl Into<String>, phase: PodPhase, container_ready: Vec<bool>) -> Self {
        Self {
            name: name.into(),
            phase,
            container_ready,
        }
    }

    #[must_use]
    pub fn from_pod(pod: &Pod) -> Self {
        let status = pod.status.as_ref();
        let phase = PodPhase::parse(status.and_then(|s| s.phase.as_deref()));
        let container_ready = status
            .and_then(|s| s.container_statuses.as_ref())
            .map(|statuses| statuses.iter().map(|c| c.ready).collect())
            .unwrap_or_default();

        Self::new(pod.name_any(), phase, container_ready)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessVerdict {
    /// Running and every container ready (also when there are no container statuses)
    Ready,
    /// Running with at least one container not ready
    PartiallyReady,
    /// Any phase other than Running
    NotRunning,
}

impl ReadinessVerdict {
    #[must_use]
    pub fn of(phase: PodPhase, container_ready: &[bool]) -> Self {
        match phase {
            PodPhase::Running if container_ready.iter().all(|ready| *ready) => {
                ReadinessVerdict::Ready
            }
            PodPhase::Running => ReadinessVerdict::PartiallyReady,
            _ => ReadinessVerdict::NotRunning,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadinessVerdict::Ready => "ready",
            ReadinessVerdict::PartiallyReady => "partially-ready",
            ReadinessVerdict::NotRunning => "not-running",
        }
    }
}

/// A pod paired with its verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedPod {
    pub pod: PodObservation,
    pub verdict: ReadinessVerdict,
}

/// Classify each pod, preserving input order
#[must_use]
pub fn classify(pods: Vec<PodObservation>) -> Vec<ClassifiedPod> {
    pods.into_iter()
        .map(|pod| {
            let verdict = ReadinessVerdict::of(pod.phase, &pod.container_ready);
            ClassifiedPod { pod, verdict }
        })
        .collect()
}

/// Verdict counts for a set of pods
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadinessSummary {
    pub ready: usize,
    pub partially_ready: usize,
    pub not_running: usize,
}

impl ReadinessSummary {
    #[must_use]
    pub fn from_classified(pods: &[ClassifiedPod]) -> Self {
        pods.iter().fold(Self::default(), |mut summary, pod| {
            match pod.verdict {
                ReadinessVerdict::Ready => summary.ready += 1,
                ReadinessVerdict::PartiallyReady => summary.partially_ready += 1,
                ReadinessVerdict::NotRunning => summary.not_running += 1,
            }
            summary
        })
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.ready + self.partially_ready + self.not_running
    }

    #[must_use]
    pub fn all_ready(&self) -> bool {
        self.ready == self.total()
    }
}
