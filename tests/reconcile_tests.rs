//! Reconciliation pass tests against an in-memory cluster

mod common;

use common::{db_creds, deployment, password, reconciler, FakeClusterReader};
use secret_rotation_monitor::config::BaselineMode;
use secret_rotation_monitor::controller::reconciler::{
    reconcile, reconcile_with_timeout, PodObservation, PodPhase, ReadinessVerdict,
    ReconcileOutcome, ReconcilerError, SecretKey, SecretSnapshot, WorkloadDescriptor, WorkloadKind,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

fn keys(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(ToString::to_string).collect()
}

#[tokio::test]
async fn test_unchanged_secret_read_twice_reports_nothing() {
    let reader = Arc::new(FakeClusterReader::new());
    reader.push_secret(password("abc"));
    let (reconciler, metrics) = reconciler(Arc::clone(&reader), BaselineMode::SecondRead);

    let report = reconcile(&reconciler, &db_creds()).await.unwrap();

    assert!(report.changed_keys.is_empty());
    assert!(!report.deleted);
    assert_eq!(reader.secret_reads(), 2);
    assert_eq!(metrics.reconciles(ReconcileOutcome::Success), 1);
    assert_eq!(metrics.reconciles(ReconcileOutcome::Failure), 0);
}

#[tokio::test]
async fn test_second_read_reports_rotated_key() {
    let reader = Arc::new(FakeClusterReader::new());
    reader.push_secret(password("xyz"));
    reader.push_secret(password("abc"));
    let (reconciler, _metrics) = reconciler(Arc::clone(&reader), BaselineMode::SecondRead);

    let report = reconcile(&reconciler, &db_creds()).await.unwrap();

    assert_eq!(report.changed_keys, keys(&["password"]));
    assert!(!report.first_observation);
}

#[tokio::test]
async fn test_second_read_not_found_skips_comparison() {
    let reader = Arc::new(FakeClusterReader::new());
    reader.push_secret(password("abc"));
    reader.push_missing(&db_creds());
    let (reconciler, metrics) = reconciler(Arc::clone(&reader), BaselineMode::SecondRead);

    let report = reconcile(&reconciler, &db_creds()).await.unwrap();

    assert!(report.changed_keys.is_empty());
    assert_eq!(metrics.reconciles(ReconcileOutcome::Success), 1);
}

#[tokio::test]
async fn test_second_read_mode_never_fills_the_cache() {
    let reader = Arc::new(FakeClusterReader::new());
    reader.push_secret(password("abc"));
    let (reconciler, _metrics) = reconciler(Arc::clone(&reader), BaselineMode::SecondRead);

    reconcile(&reconciler, &db_creds()).await.unwrap();

    assert!(reconciler.cache().is_empty());
}

#[tokio::test]
async fn test_only_consumers_of_the_secret_are_correlated() {
    let reader = Arc::new(FakeClusterReader::new());
    reader.push_secret(password("abc"));
    reader.add_workload(deployment("web", "db-creds"));
    reader.add_workload(deployment("other", "other-secret"));
    let (reconciler, _metrics) = reconciler(Arc::clone(&reader), BaselineMode::Cache);

    let report = reconcile(&reconciler, &db_creds()).await.unwrap();

    let names: Vec<&str> = report
        .consumers
        .iter()
        .map(|c| c.workload.name.as_str())
        .collect();
    assert_eq!(names, vec!["web"]);
    assert_eq!(reader.pod_lists(), vec!["app=web".to_string()]);
}

#[tokio::test]
async fn test_partially_ready_pod_is_classified() {
    let reader = Arc::new(FakeClusterReader::new());
    reader.push_secret(password("abc"));
    reader.add_workload(deployment("web", "db-creds"));
    reader.set_pods(
        "ns1",
        "app=web",
        vec![
            PodObservation::new("web-1", PodPhase::Running, vec![true, false]),
            PodObservation::new("web-2", PodPhase::Running, vec![true, true]),
            PodObservation::new("web-3", PodPhase::Pending, vec![]),
        ],
    );
    let (reconciler, _metrics) = reconciler(Arc::clone(&reader), BaselineMode::Cache);

    let report = reconcile(&reconciler, &db_creds()).await.unwrap();

    let verdicts: Vec<ReadinessVerdict> = report.consumers[0]
        .pods
        .iter()
        .map(|p| p.verdict)
        .collect();
    assert_eq!(
        verdicts,
        vec![
            ReadinessVerdict::PartiallyReady,
            ReadinessVerdict::Ready,
            ReadinessVerdict::NotRunning,
        ]
    );
    let summary = report.summary();
    assert_eq!(summary.ready, 1);
    assert_eq!(summary.partially_ready, 1);
    assert_eq!(summary.not_running, 1);
}

#[tokio::test]
async fn test_workload_list_failure_is_recorded_and_surfaced() {
    let reader = Arc::new(FakeClusterReader::new());
    reader.push_secret(password("abc"));
    reader.fail_workload_list("ns1");
    let (reconciler, metrics) = reconciler(Arc::clone(&reader), BaselineMode::Cache);

    let err = reconcile(&reconciler, &db_creds()).await.unwrap_err();

    assert!(matches!(err, ReconcilerError::WorkloadList { ref namespace, .. } if namespace == "ns1"));
    assert!(reader.pod_lists().is_empty());
    assert_eq!(metrics.reconciles(ReconcileOutcome::Failure), 1);
    assert_eq!(metrics.reconciles(ReconcileOutcome::Success), 0);
    // A failed pass leaves no baseline behind
    assert!(reconciler.cache().is_empty());
}

#[tokio::test]
async fn test_secret_read_failure_is_recorded() {
    let reader = Arc::new(FakeClusterReader::new());
    reader.fail_secret_reads(&db_creds());
    let (reconciler, metrics) = reconciler(Arc::clone(&reader), BaselineMode::Cache);

    let err = reconcile(&reconciler, &db_creds()).await.unwrap_err();

    assert!(matches!(err, ReconcilerError::SecretRead { .. }));
    assert_eq!(reader.workload_lists(), 0);
    assert_eq!(metrics.reconciles(ReconcileOutcome::Failure), 1);
}

#[tokio::test]
async fn test_pod_list_failure_aborts_remaining_workloads() {
    let reader = Arc::new(FakeClusterReader::new());
    reader.push_secret(password("abc"));
    reader.add_workload(deployment("api", "db-creds"));
    reader.add_workload(deployment("web", "db-creds"));
    reader.add_workload(deployment("worker", "db-creds"));
    reader.fail_pod_list("app=web");
    let (reconciler, metrics) = reconciler(Arc::clone(&reader), BaselineMode::Cache);

    let err = reconcile(&reconciler, &db_creds()).await.unwrap_err();

    match err {
        ReconcilerError::PodList { workload, .. } => assert_eq!(workload, "Deployment ns1/web"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(
        reader.pod_lists(),
        vec!["app=api".to_string(), "app=web".to_string()]
    );
    assert_eq!(metrics.reconciles(ReconcileOutcome::Failure), 1);
}

#[tokio::test]
async fn test_consumer_without_selector_issues_no_pod_read() {
    let reader = Arc::new(FakeClusterReader::new());
    reader.push_secret(password("abc"));
    reader.add_workload(
        WorkloadDescriptor::new(WorkloadKind::DaemonSet, "ns1", "agent").with_secret_ref("db-creds"),
    );
    let (reconciler, _metrics) = reconciler(Arc::clone(&reader), BaselineMode::Cache);

    let report = reconcile(&reconciler, &db_creds()).await.unwrap();

    assert_eq!(report.consumers.len(), 1);
    assert!(report.consumers[0].pods.is_empty());
    assert!(reader.pod_lists().is_empty());
}

#[tokio::test]
async fn test_first_seen_secret_reports_every_key() {
    let reader = Arc::new(FakeClusterReader::new());
    reader.push_secret(
        SecretSnapshot::new(db_creds())
            .with_value("password", "abc")
            .with_value("username", "app"),
    );
    let (reconciler, _metrics) = reconciler(Arc::clone(&reader), BaselineMode::Cache);

    let report = reconcile(&reconciler, &db_creds()).await.unwrap();

    assert_eq!(report.changed_keys, keys(&["password", "username"]));
    assert!(report.first_observation);
    assert_eq!(reader.secret_reads(), 1);
}

#[tokio::test]
async fn test_cache_mode_second_pass_over_unchanged_secret_is_quiet() {
    let reader = Arc::new(FakeClusterReader::new());
    reader.push_secret(password("abc"));
    let (reconciler, metrics) = reconciler(Arc::clone(&reader), BaselineMode::Cache);

    reconcile(&reconciler, &db_creds()).await.unwrap();
    assert_eq!(reconciler.cache().len(), 1);

    let second = reconcile(&reconciler, &db_creds()).await.unwrap();
    assert!(second.changed_keys.is_empty());
    assert!(!second.first_observation);
    assert_eq!(metrics.reconciles(ReconcileOutcome::Success), 2);
}

#[tokio::test]
async fn test_cache_mode_detects_rotation_between_passes() {
    let reader = Arc::new(FakeClusterReader::new());
    reader.push_secret(
        SecretSnapshot::new(db_creds())
            .with_value("password", "abc")
            .with_value("username", "app"),
    );
    reader.push_secret(
        SecretSnapshot::new(db_creds())
            .with_value("password", "xyz")
            .with_value("username", "app")
            .with_value("host", "db.internal"),
    );
    let (reconciler, _metrics) = reconciler(Arc::clone(&reader), BaselineMode::Cache);

    reconcile(&reconciler, &db_creds()).await.unwrap();
    let rotated = reconcile(&reconciler, &db_creds()).await.unwrap();

    assert_eq!(rotated.changed_keys, keys(&["host", "password"]));
    assert!(!rotated.first_observation);
}

#[tokio::test]
async fn test_cache_is_only_stored_after_success() {
    let reader = Arc::new(FakeClusterReader::new());
    reader.push_secret(password("abc"));
    reader.fail_workload_list("ns1");
    let (reconciler, _metrics) = reconciler(Arc::clone(&reader), BaselineMode::Cache);

    reconcile(&reconciler, &db_creds()).await.unwrap_err();
    reconcile(&reconciler, &db_creds()).await.unwrap_err();

    assert!(reconciler.cache().get(&db_creds()).is_none());
}

#[tokio::test]
async fn test_deleted_secret_evicts_cache_and_counts_success() {
    let reader = Arc::new(FakeClusterReader::new());
    reader.push_secret(password("abc"));
    reader.push_missing(&db_creds());
    reader.add_workload(deployment("web", "db-creds"));
    let (reconciler, metrics) = reconciler(Arc::clone(&reader), BaselineMode::Cache);

    reconcile(&reconciler, &db_creds()).await.unwrap();
    assert_eq!(reconciler.cache().len(), 1);
    let lists_before = reader.workload_lists();

    let report = reconcile(&reconciler, &db_creds()).await.unwrap();

    assert!(report.deleted);
    assert!(report.consumers.is_empty());
    assert!(reconciler.cache().is_empty());
    assert_eq!(reader.workload_lists(), lists_before);
    assert_eq!(metrics.reconciles(ReconcileOutcome::Success), 2);
}

#[tokio::test]
async fn test_repeated_passes_are_idempotent() {
    let reader = Arc::new(FakeClusterReader::new());
    reader.push_secret(password("abc"));
    reader.add_workload(deployment("web", "db-creds"));
    reader.set_pods(
        "ns1",
        "app=web",
        vec![PodObservation::new("web-1", PodPhase::Running, vec![true])],
    );
    let (reconciler, _metrics) = reconciler(Arc::clone(&reader), BaselineMode::SecondRead);

    let first = reconcile(&reconciler, &db_creds()).await.unwrap();
    let second = reconcile(&reconciler, &db_creds()).await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_secrets_are_cached_independently() {
    let reader = Arc::new(FakeClusterReader::new());
    let other = SecretKey::new("ns1", "api-token");
    reader.push_secret(password("abc"));
    reader.push_secret(SecretSnapshot::new(other.clone()).with_value("token", "t1"));
    let (reconciler, _metrics) = reconciler(Arc::clone(&reader), BaselineMode::Cache);

    reconcile(&reconciler, &db_creds()).await.unwrap();
    let report = reconcile(&reconciler, &other).await.unwrap();

    assert_eq!(report.changed_keys, keys(&["token"]));
    assert_eq!(reconciler.cache().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_pass_records_nothing() {
    let reader = Arc::new(FakeClusterReader::new());
    reader.push_secret(password("abc"));
    reader.add_workload(deployment("web", "db-creds"));
    reader.set_delay(Duration::from_secs(10));
    let (reconciler, metrics) = reconciler(Arc::clone(&reader), BaselineMode::Cache);

    let err = reconcile_with_timeout(&reconciler, &db_creds(), Duration::from_secs(15))
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcilerError::Cancelled { .. }));
    assert_eq!(metrics.reconciles(ReconcileOutcome::Success), 0);
    assert_eq!(metrics.reconciles(ReconcileOutcome::Failure), 0);
    assert!(reconciler.cache().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_pass_within_deadline_completes() {
    let reader = Arc::new(FakeClusterReader::new());
    reader.push_secret(password("abc"));
    reader.set_delay(Duration::from_secs(1));
    let (reconciler, metrics) = reconciler(Arc::clone(&reader), BaselineMode::Cache);

    let report = reconcile_with_timeout(&reconciler, &db_creds(), Duration::from_secs(30))
        .await
        .unwrap();

    assert_eq!(report.changed_keys, keys(&["password"]));
    assert_eq!(metrics.reconciles(ReconcileOutcome::Success), 1);
}
