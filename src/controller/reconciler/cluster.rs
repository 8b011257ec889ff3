//! # Cluster Reader
//!
//! Read-only view of the cluster used by the reconciler.
//!
//! The trait is the seam between the reconciliation logic and the Kubernetes
//! API: the controller uses [`KubeClusterReader`], tests use an in-memory fake.

use crate::controller::reconciler::changes::SecretSnapshot;
use crate::controller::reconciler::readiness::PodObservation;
use crate::controller::reconciler::types::SecretKey;
use crate::controller::reconciler::workloads::{PodTemplateOwner, WorkloadDescriptor};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{Pod, Secret};
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, ListParams};
use kube::{Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use std::error::Error as StdError;
use std::fmt::Debug;
use thiserror::Error;
use tracing::debug;

/// A failed read against the cluster
#[derive(Debug, Error)]
#[error("failed to {operation}: {source}")]
pub struct ReadError {
    /// What was being read, e.g. `list pods`
    pub operation: String,
    #[source]
    pub source: Box<dyn StdError + Send + Sync>,
}

impl ReadError {
    pub fn new(
        operation: impl Into<String>,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self {
            operation: operation.into(),
            source: source.into(),
        }
    }
}

/// Read-only cluster queries needed for one reconciliation pass
#[async_trait]
pub trait ClusterReader: Send + Sync {
    /// Current contents of a secret; `Ok(None)` when it does not exist
    async fn get_secret(&self, key: &SecretKey) -> Result<Option<SecretSnapshot>, ReadError>;

    /// Deployments, StatefulSets and DaemonSets in a namespace, in that order
    async fn list_workloads(&self, namespace: &str) -> Result<Vec<WorkloadDescriptor>, ReadError>;

    /// Pods in a namespace matching a `k=v,...` label selector
    async fn list_pods(
        &self,
        namespace: &str,
        selector: &str,
    ) -> Result<Vec<PodObservation>, ReadError>;
}

/// [`ClusterReader`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeClusterReader {
    client: Client,
}

impl std::fmt::Debug for KubeClusterReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeClusterReader").finish_non_exhaustive()
    }
}

impl KubeClusterReader {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn list_kind<W>(&self, namespace: &str) -> Result<Vec<WorkloadDescriptor>, ReadError>
    where
        W: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
            + PodTemplateOwner
            + Clone
            + DeserializeOwned
            + Debug,
    {
        let api: Api<W> = Api::namespaced(self.client.clone(), namespace);
        let list = api.list(&ListParams::default()).await.map_err(|e| {
            ReadError::new(
                format!("list {}s in {namespace}", W::WORKLOAD_KIND.as_str().to_lowercase()),
                e,
            )
        })?;

        Ok(list
            .items
            .iter()
            .map(|w| WorkloadDescriptor::from_workload(w, namespace))
            .collect())
    }
}

#[async_trait]
impl ClusterReader for KubeClusterReader {
    async fn get_secret(&self, key: &SecretKey) -> Result<Option<SecretSnapshot>, ReadError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), &key.namespace);
        let secret = api
            .get_opt(&key.name)
            .await
            .map_err(|e| ReadError::new(format!("get secret {key}"), e))?;

        Ok(secret.as_ref().map(SecretSnapshot::from_secret))
    }

    async fn list_workloads(&self, namespace: &str) -> Result<Vec<WorkloadDescriptor>, ReadError> {
        let mut workloads = self.list_kind::<Deployment>(namespace).await?;
        workloads.extend(self.list_kind::<StatefulSet>(namespace).await?);
        workloads.extend(self.list_kind::<DaemonSet>(namespace).await?);

        debug!(namespace, count = workloads.len(), "listed workloads");
        Ok(workloads)
    }

    async fn list_pods(
        &self,
        namespace: &str,
        selector: &str,
    ) -> Result<Vec<PodObservation>, ReadError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pods = api
            .list(&ListParams::default().labels(selector))
            .await
            .map_err(|e| ReadError::new(format!("list pods in {namespace} ({selector})"), e))?;

        Ok(pods
            .items
            .iter()
            .map(|pod| {
                debug!(pod = %pod.name_any(), "observed pod");
                PodObservation::from_pod(pod)
            })
            .collect())
    }
}
