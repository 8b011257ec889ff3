//! # Workload Correlation
//!
//! Finds the workloads in a namespace whose pod template mounts a given secret.
//!
//! A workload references a secret when its pod template has a `secret` volume
//! with that `secretName`, or a `projected` volume with a secret source of that
//! name. Environment references (`secretKeyRef`, `envFrom`) are not considered.

use crate::controller::reconciler::types::SecretKey;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::core::v1::PodTemplateSpec;
use kube::ResourceExt;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Kinds of workload that are inspected, in listing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkloadKind {
    Deployment,
    StatefulSet,
    DaemonSet,
}

impl WorkloadKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadKind::Deployment => "Deployment",
            WorkloadKind::StatefulSet => "StatefulSet",
            WorkloadKind::DaemonSet => "DaemonSet",
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resources that own a pod template
pub trait PodTemplateOwner {
    const WORKLOAD_KIND: WorkloadKind;

    fn pod_template(&self) -> Option<&PodTemplateSpec>;
}

impl PodTemplateOwner for Deployment {
    const WORKLOAD_KIND: WorkloadKind = WorkloadKind::Deployment;

    fn pod_template(&self) -> Option<&PodTemplateSpec> {
        self.spec.as_ref().map(|spec| &spec.template)
    }
}

impl PodTemplateOwner for StatefulSet {
    const WORKLOAD_KIND: WorkloadKind = WorkloadKind::StatefulSet;

    fn pod_template(&self) -> Option<&PodTemplateSpec> {
        self.spec.as_ref().map(|spec| &spec.template)
    }
}

impl PodTemplateOwner for DaemonSet {
    const WORKLOAD_KIND: WorkloadKind = WorkloadKind::DaemonSet;

    fn pod_template(&self) -> Option<&PodTemplateSpec> {
        self.spec.as_ref().map(|spec| &spec.template)
    }
}

/// What the correlator needs to know about a workload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadDescriptor {
    pub kind: WorkloadKind,
    pub namespace: String,
    pub name: String,
    /// Names of secrets mounted by the pod template
    pub secret_refs: BTreeSet<String>,
    /// Labels used to find the workload's pods
    pub selector: BTreeMap<String, String>,
}

impl WorkloadDescriptor {
    pub fn new(kind: WorkloadKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            name: name.into(),
            secret_refs: BTreeSet::new(),
            selector: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_secret_ref(mut self, secret_name: impl Into<String>) -> Self {
        self.secret_refs.insert(secret_name.into());
        self
    }

    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.selector.insert(key.into(), value.into());
        self
    }

    /// Build a descriptor from a pod template
    ///
    /// The selector is taken from the template's labels, which is what the
    /// workload's pods carry.
    #[must_use]
    pub fn from_pod_template(
        kind: WorkloadKind,
        namespace: impl Into<String>,
        name: impl Into<String>,
        template: &PodTemplateSpec,
    ) -> Self {
        let mut descriptor = Self::new(kind, namespace, name);

        if let Some(labels) = template.metadata.as_ref().and_then(|m| m.labels.as_ref()) {
            descriptor.selector = labels.clone();
        }

        let volumes = template
            .spec
            .as_ref()
            .and_then(|spec| spec.volumes.as_ref())
            .into_iter()
            .flatten();

        for volume in volumes {
            if let Some(secret_name) = volume.secret.as_ref().and_then(|s| s.secret_name.clone()) {
                descriptor.secret_refs.insert(secret_name);
            }
            let projections = volume
                .projected
                .as_ref()
                .and_then(|p| p.sources.as_ref())
                .into_iter()
                .flatten();
            for projection in projections {
                if let Some(proj) = projection.secret.as_ref() {
                    let name: Option<String> = proj.name.clone().into();
                    descriptor.secret_refs.extend(name.filter(|n| !n.is_empty()));
                }
            }
        }

        descriptor
    }

    /// Build a descriptor from a Deployment, StatefulSet or DaemonSet
    #[must_use]
    pub fn from_workload<W>(workload: &W, fallback_namespace: &str) -> Self
    where
        W: PodTemplateOwner + ResourceExt,
    {
        let namespace = workload
            .namespace()
            .unwrap_or_else(|| fallback_namespace.to_string());
        match workload.pod_template() {
            Some(template) => {
                Self::from_pod_template(W::WORKLOAD_KIND, namespace, workload.name_any(), template)
            }
            None => Self::new(W::WORKLOAD_KIND, namespace, workload.name_any()),
        }
    }

    /// Whether the pod template mounts a secret with this name
    #[must_use]
    pub fn references(&self, secret_name: &str) -> bool {
        self.secret_refs.contains(secret_name)
    }

    /// Selector rendered as `k=v,k2=v2`, sorted by key
    #[must_use]
    pub fn label_selector(&self) -> String {
        self.selector
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for WorkloadDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}

/// Workloads affected by a change to `secret`
///
/// Keeps same-namespace workloads that mount the secret by name, in input order.
#[must_use]
pub fn find_consumers(
    secret: &SecretKey,
    workloads: Vec<WorkloadDescriptor>,
) -> Vec<WorkloadDescriptor> {
    workloads
        .into_iter()
        .filter(|w| w.namespace == secret.namespace && w.references(&secret.name))
        .collect()
}
