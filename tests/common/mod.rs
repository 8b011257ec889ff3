//! Common test utilities for reconciliation tests
//!
//! Provides an in-memory [`ClusterReader`] with scripted secret reads, failure
//! injection and read counters, plus a tracing layer that captures log events.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use async_trait::async_trait;
use secret_rotation_monitor::config::BaselineMode;
use secret_rotation_monitor::controller::reconciler::{
    ClusterReader, PodObservation, ReadError, Reconciler, SecretKey, SecretSnapshot,
    WorkloadDescriptor, WorkloadKind,
};
use secret_rotation_monitor::observability::metrics::ControllerMetrics;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::{Layer, Registry};

#[derive(Debug, Default)]
struct FakeState {
    /// Scripted reads per secret; the last entry repeats once the others are used
    secrets: HashMap<SecretKey, VecDeque<Option<SecretSnapshot>>>,
    failing_secret_reads: HashSet<SecretKey>,
    workloads: HashMap<String, Vec<WorkloadDescriptor>>,
    failing_workload_namespaces: HashSet<String>,
    pods: HashMap<(String, String), Vec<PodObservation>>,
    failing_pod_selectors: HashSet<String>,
    secret_reads: usize,
    workload_lists: usize,
    pod_lists: Vec<String>,
    delay: Option<Duration>,
}

/// In-memory cluster
#[derive(Debug, Default)]
pub struct FakeClusterReader {
    state: Mutex<FakeState>,
}

impl FakeClusterReader {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue the next value a read of `snapshot.key()` returns
    pub fn push_secret(&self, snapshot: SecretSnapshot) {
        let key = snapshot.key().clone();
        self.state()
            .secrets
            .entry(key)
            .or_default()
            .push_back(Some(snapshot));
    }

    /// Queue a NotFound for `key`
    pub fn push_missing(&self, key: &SecretKey) {
        self.state()
            .secrets
            .entry(key.clone())
            .or_default()
            .push_back(None);
    }

    pub fn fail_secret_reads(&self, key: &SecretKey) {
        self.state().failing_secret_reads.insert(key.clone());
    }

    pub fn add_workload(&self, workload: WorkloadDescriptor) {
        self.state()
            .workloads
            .entry(workload.namespace.clone())
            .or_default()
            .push(workload);
    }

    pub fn fail_workload_list(&self, namespace: &str) {
        self.state()
            .failing_workload_namespaces
            .insert(namespace.to_string());
    }

    pub fn set_pods(&self, namespace: &str, selector: &str, pods: Vec<PodObservation>) {
        self.state()
            .pods
            .insert((namespace.to_string(), selector.to_string()), pods);
    }

    pub fn fail_pod_list(&self, selector: &str) {
        self.state().failing_pod_selectors.insert(selector.to_string());
    }

    /// Sleep this long before answering any read
    pub fn set_delay(&self, delay: Duration) {
        self.state().delay = Some(delay);
    }

    pub fn secret_reads(&self) -> usize {
        self.state().secret_reads
    }

    pub fn workload_lists(&self) -> usize {
        self.state().workload_lists
    }

    /// Selectors of every pod list issued, in order
    pub fn pod_lists(&self) -> Vec<String> {
        self.state().pod_lists.clone()
    }

    async fn maybe_delay(&self) {
        let delay = self.state().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ClusterReader for FakeClusterReader {
    async fn get_secret(&self, key: &SecretKey) -> Result<Option<SecretSnapshot>, ReadError> {
        self.maybe_delay().await;
        let mut state = self.state();
        state.secret_reads += 1;

        if state.failing_secret_reads.contains(key) {
            return Err(ReadError::new("get secret", "connection refused"));
        }

        let Some(reads) = state.secrets.get_mut(key) else {
            return Ok(None);
        };
        if reads.len() > 1 {
            Ok(reads.pop_front().flatten())
        } else {
            Ok(reads.front().cloned().flatten())
        }
    }

    async fn list_workloads(&self, namespace: &str) -> Result<Vec<WorkloadDescriptor>, ReadError> {
        self.maybe_delay().await;
        let mut state = self.state();
        state.workload_lists += 1;

        if state.failing_workload_namespaces.contains(namespace) {
            return Err(ReadError::new("list deployments", "forbidden"));
        }
        Ok(state.workloads.get(namespace).cloned().unwrap_or_default())
    }

    async fn list_pods(
        &self,
        namespace: &str,
        selector: &str,
    ) -> Result<Vec<PodObservation>, ReadError> {
        self.maybe_delay().await;
        let mut state = self.state();
        state.pod_lists.push(selector.to_string());

        if state.failing_pod_selectors.contains(selector) {
            return Err(ReadError::new("list pods", "timed out"));
        }
        Ok(state
            .pods
            .get(&(namespace.to_string(), selector.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

/// Reconciler over `reader` with a fresh metrics registry
pub fn reconciler(
    reader: Arc<FakeClusterReader>,
    mode: BaselineMode,
) -> (Reconciler, Arc<ControllerMetrics>) {
    let metrics = Arc::new(ControllerMetrics::new().expect("metrics register"));
    let reconciler = Reconciler::new(reader, Arc::clone(&metrics) as _, mode);
    (reconciler, metrics)
}

pub fn db_creds() -> SecretKey {
    SecretKey::new("ns1", "db-creds")
}

pub fn password(value: &str) -> SecretSnapshot {
    SecretSnapshot::new(db_creds()).with_value("password", value)
}

/// Deployment `ns1/<name>` selecting `app=<name>` and mounting `secret`
pub fn deployment(name: &str, secret: &str) -> WorkloadDescriptor {
    WorkloadDescriptor::new(WorkloadKind::Deployment, "ns1", name)
        .with_label("app", name)
        .with_secret_ref(secret)
}

/// One log event as seen by [`EventCapture`]
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub message: String,
    pub fields: BTreeMap<String, String>,
}

impl CapturedEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Layer that records every event emitted while it is installed
#[derive(Debug, Clone, Default)]
pub struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl EventCapture {
    /// Install as the default subscriber for the current thread
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        tracing::subscriber::set_default(Registry::default().with(self.clone()))
    }

    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Events whose message contains `needle`
    pub fn matching(&self, needle: &str) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.message.contains(needle))
            .collect()
    }
}

impl<S: Subscriber> Layer<S> for EventCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(CapturedEvent {
                level: *event.metadata().level(),
                message: visitor.message,
                fields: visitor.fields,
            });
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: BTreeMap<String, String>,
}

impl FieldVisitor {
    fn put(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = value;
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.put(field, format!("{value:?}"));
    }
}
