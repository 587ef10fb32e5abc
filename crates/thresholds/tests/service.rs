//! End-to-end threshold management over the in-process stores.

use std::sync::Arc;

use pulse_core::{default_settings, MetricKind, ThresholdUpdate};
use pulse_thresholds::{
    InMemoryThresholdStore, ThresholdError, ThresholdService, ThresholdStore, YamlThresholdStore,
};

fn percent(p: f64) -> ThresholdUpdate {
    ThresholdUpdate { percent_change_threshold: Some(p), ..Default::default() }
}

#[tokio::test]
async fn yaml_service_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("thresholds.yml");

    let svc = ThresholdService::new(Arc::new(YamlThresholdStore::new(&path)));
    svc.update(MetricKind::BounceRate, &percent(15.0), Some("alice")).await.unwrap();
    svc.update(
        MetricKind::Lcp,
        &ThresholdUpdate { enabled: Some(false), ..Default::default() },
        Some("bob"),
    )
    .await
    .unwrap();

    let restarted = ThresholdService::new(Arc::new(YamlThresholdStore::new(&path)));
    let rows = restarted.try_get_all().await.unwrap();
    assert_eq!(rows.len(), 10);

    let bounce = rows.iter().find(|r| r.metric == MetricKind::BounceRate).unwrap();
    assert_eq!(bounce.percent_change_threshold, 15.0);
    assert_eq!(bounce.updated_by.as_deref(), Some("alice"));

    let lcp = rows.iter().find(|r| r.metric == MetricKind::Lcp).unwrap();
    assert!(!lcp.enabled);
    assert_eq!(lcp.warning_multiplier, 1.5);

    assert!(rows
        .iter()
        .filter(|r| r.metric != MetricKind::BounceRate && r.metric != MetricKind::Lcp)
        .all(|r| r.is_default()));
}

#[tokio::test]
async fn corrupt_yaml_degrades_reads_but_fails_writes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("thresholds.yml");
    std::fs::write(&path, "thresholds: [not closed").unwrap();

    let svc = ThresholdService::new(Arc::new(YamlThresholdStore::new(&path)));
    let rows = svc.get_all().await;
    assert_eq!(rows.len(), 10);
    assert!(rows.iter().all(|r| r.is_default()));

    assert!(svc.try_get_all().await.is_err());
    assert!(svc.update(MetricKind::Users, &percent(50.0), None).await.is_err());
}

#[tokio::test]
async fn multiplier_order_is_checked_against_the_stored_row() {
    let svc = ThresholdService::new(Arc::new(InMemoryThresholdStore::new()));
    svc.update(
        MetricKind::Sessions,
        &ThresholdUpdate { critical_multiplier: Some(5.0), ..Default::default() },
        None,
    )
    .await
    .unwrap();

    // 4.0 is fine against the stored 5.0, though not against the default 3.0.
    let row = svc
        .update(
            MetricKind::Sessions,
            &ThresholdUpdate { warning_multiplier: Some(4.0), ..Default::default() },
            None,
        )
        .await
        .unwrap();
    assert_eq!(row.warning_multiplier, 4.0);
    assert_eq!(row.critical_multiplier, 5.0);

    let err = svc
        .update(
            MetricKind::Sessions,
            &ThresholdUpdate { critical_multiplier: Some(3.5), ..Default::default() },
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ThresholdError::Invalid(_)));
    assert_eq!(err.field_errors()[0].field, "criticalMultiplier");
}

#[tokio::test]
async fn every_bad_field_is_reported() {
    let svc = ThresholdService::new(Arc::new(InMemoryThresholdStore::new()));
    let err = svc
        .update(
            MetricKind::Fcp,
            &ThresholdUpdate {
                warning_multiplier: Some(0.1),
                critical_multiplier: Some(11.0),
                percent_change_threshold: Some(101.0),
                enabled: None,
            },
            None,
        )
        .await
        .unwrap_err();
    let fields: Vec<_> = err.field_errors().iter().map(|e| e.field).collect();
    assert_eq!(
        fields,
        vec!["warningMultiplier", "criticalMultiplier", "percentChangeThreshold"]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_updates_to_different_metrics_all_land() {
    let store = Arc::new(InMemoryThresholdStore::new());
    let svc = ThresholdService::new(store.clone());

    let mut handles = Vec::new();
    for (i, metric) in MetricKind::ALL.into_iter().enumerate() {
        let svc = svc.clone();
        handles.push(tokio::spawn(async move {
            svc.update(metric, &percent(10.0 + i as f64), Some("worker")).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stored = store.load_all().await.unwrap();
    assert_eq!(stored.len(), 10);
    for (i, metric) in MetricKind::ALL.into_iter().enumerate() {
        let row = stored.iter().find(|r| r.metric == metric).unwrap();
        assert_eq!(row.percent_change_threshold, 10.0 + i as f64);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_updates_to_one_metric_leave_one_consistent_row() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(YamlThresholdStore::new(dir.path().join("thresholds.yml")));
    let svc = ThresholdService::new(store.clone());

    let candidates: Vec<f64> = (0..8).map(|i| 20.0 + i as f64 * 5.0).collect();
    let mut handles = Vec::new();
    for p in candidates.clone() {
        let svc = svc.clone();
        handles.push(tokio::spawn(async move {
            svc.update(MetricKind::Users, &percent(p), Some("racer")).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stored = store.load_all().await.unwrap();
    assert_eq!(stored.len(), 1);
    let row = &stored[0];
    assert_eq!(row.metric, MetricKind::Users);
    assert!(candidates.contains(&row.percent_change_threshold));
    let defaults = default_settings(MetricKind::Users);
    assert_eq!(row.warning_multiplier, defaults.warning_multiplier);
    assert_eq!(row.critical_multiplier, defaults.critical_multiplier);
}

#[tokio::test]
async fn batch_outcome_serializes_for_callers() {
    let svc = ThresholdService::new(Arc::new(InMemoryThresholdStore::new()));
    let outcome = svc
        .update_many(
            &[(MetricKind::Cls, percent(50.0)), (MetricKind::Fid, percent(500.0))],
            None,
        )
        .await;
    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["applied"][0]["metric"], "cls");
    assert_eq!(json["failed"][0]["metric"], "fid");
    assert_eq!(json["failed"][0]["retryable"], false);
}
