//! Threshold configuration service.
//!
//! Reads always answer: a metric without a stored row resolves to its
//! compiled-in default, and a failing store degrades to defaults (logged).
//! Writes never degrade: store errors propagate so a caller never assumes
//! a write that did not happen.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use pulse_core::{default_settings, AlertThreshold, MetricKind, ThresholdUpdate};

use crate::error::{Result, ThresholdError};
use crate::store::ThresholdStore;
use crate::validation::validate_patch;

/// Per-metric result of a batch write. Applied rows stay applied even when
/// later entries fail.
#[derive(Debug, Default, Serialize)]
pub struct BatchOutcome {
    pub applied: Vec<AlertThreshold>,
    pub failed: Vec<BatchFailure>,
}

#[derive(Debug, Serialize)]
pub struct BatchFailure {
    pub metric: MetricKind,
    pub error: String,
    pub retryable: bool,
}

impl BatchOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn succeeded_metrics(&self) -> Vec<MetricKind> {
        self.applied.iter().map(|t| t.metric).collect()
    }
}

#[derive(Clone)]
pub struct ThresholdService {
    store: Arc<dyn ThresholdStore>,
}

impl ThresholdService {
    pub fn new(store: Arc<dyn ThresholdStore>) -> Self {
        Self { store }
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// One row per metric kind, stored where present and default otherwise.
    /// Fails with the store error instead of degrading.
    pub async fn try_get_all(&self) -> Result<Vec<AlertThreshold>> {
        let stored = self.store.load_all().await?;
        Ok(merge_with_defaults(stored))
    }

    /// Like [`try_get_all`](Self::try_get_all) but falls back to the default
    /// table when the store cannot be read.
    pub async fn get_all(&self) -> Vec<AlertThreshold> {
        match self.try_get_all().await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(
                    backend = self.store.backend_name(),
                    error = %e,
                    "failed to load thresholds, using defaults"
                );
                MetricKind::ALL.iter().map(|m| AlertThreshold::default_for(*m)).collect()
            }
        }
    }

    /// The threshold for one metric. Never fails.
    pub async fn get(&self, metric: MetricKind) -> AlertThreshold {
        match self.store.load(metric).await {
            Ok(Some(row)) => row,
            Ok(None) => AlertThreshold::default_for(metric),
            Err(e) => {
                warn!(metric = %metric, error = %e, "failed to load threshold, using default");
                AlertThreshold::default_for(metric)
            }
        }
    }

    /// Validate and upsert a partial update.
    ///
    /// Omitted fields keep their stored values, or take the default when the
    /// metric has no row yet.
    pub async fn update(
        &self,
        metric: MetricKind,
        update: &ThresholdUpdate,
        actor: Option<&str>,
    ) -> Result<AlertThreshold> {
        // Early check against the current row gives field-level errors before
        // any write; the store re-checks the merge atomically.
        let current = self.get(metric).await;
        validate_patch(current.settings(), update)?;

        let row = self.store.upsert(metric, update, actor).await?;
        info!(
            metric = %metric,
            actor = actor.unwrap_or("-"),
            warning = row.warning_multiplier,
            critical = row.critical_multiplier,
            percent = row.percent_change_threshold,
            enabled = row.enabled,
            "threshold updated"
        );
        Ok(row)
    }

    /// Apply each update independently, in order, continuing past failures.
    pub async fn update_many(
        &self,
        updates: &[(MetricKind, ThresholdUpdate)],
        actor: Option<&str>,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for (metric, update) in updates {
            match self.update(*metric, update, actor).await {
                Ok(row) => outcome.applied.push(row),
                Err(e) => outcome.failed.push(failure(*metric, &e)),
            }
        }
        if !outcome.is_complete() {
            warn!(
                applied = outcome.applied.len(),
                failed = outcome.failed.len(),
                "batch threshold update partially failed"
            );
        }
        outcome
    }

    /// Force every field of `metric` back to its compiled-in default.
    pub async fn reset(&self, metric: MetricKind, actor: Option<&str>) -> Result<AlertThreshold> {
        self.update(metric, &ThresholdUpdate::from(default_settings(metric)), actor)
            .await
    }

    /// Reset every metric kind.
    pub async fn reset_all(&self, actor: Option<&str>) -> BatchOutcome {
        let updates: Vec<(MetricKind, ThresholdUpdate)> = MetricKind::ALL
            .iter()
            .map(|m| (*m, ThresholdUpdate::from(default_settings(*m))))
            .collect();
        self.update_many(&updates, actor).await
    }
}

fn failure(metric: MetricKind, e: &ThresholdError) -> BatchFailure {
    BatchFailure {
        metric,
        error: e.to_string(),
        retryable: e.is_retryable(),
    }
}

/// Union of stored rows and defaults: exactly one row per metric kind, in
/// [`MetricKind::ALL`] order.
fn merge_with_defaults(stored: Vec<AlertThreshold>) -> Vec<AlertThreshold> {
    MetricKind::ALL
        .iter()
        .map(|metric| {
            stored
                .iter()
                .find(|row| row.metric == *metric)
                .cloned()
                .unwrap_or_else(|| AlertThreshold::default_for(*metric))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;

    use crate::store::InMemoryThresholdStore;

    /// Store whose every call fails, for fallback and propagation tests.
    struct DownStore;

    #[async_trait]
    impl ThresholdStore for DownStore {
        fn backend_name(&self) -> &'static str {
            "down"
        }

        async fn load_all(&self) -> Result<Vec<AlertThreshold>> {
            Err(ThresholdError::Unavailable("connection refused".into()))
        }

        async fn load(&self, _metric: MetricKind) -> Result<Option<AlertThreshold>> {
            Err(ThresholdError::Unavailable("connection refused".into()))
        }

        async fn upsert(
            &self,
            _metric: MetricKind,
            _patch: &ThresholdUpdate,
            _actor: Option<&str>,
        ) -> Result<AlertThreshold> {
            Err(ThresholdError::Unavailable("connection refused".into()))
        }
    }

    fn memory() -> ThresholdService {
        ThresholdService::new(Arc::new(InMemoryThresholdStore::new()))
    }

    #[tokio::test]
    async fn get_all_without_overrides_is_the_default_table() {
        let rows = memory().get_all().await;
        assert_eq!(rows.len(), MetricKind::ALL.len());
        for (row, metric) in rows.iter().zip(MetricKind::ALL) {
            assert_eq!(row.metric, metric);
            assert!(row.is_default());
            assert_eq!(row.settings(), default_settings(metric));
        }
    }

    #[tokio::test]
    async fn get_all_merges_overrides_without_duplicates() {
        let svc = memory();
        let patch = ThresholdUpdate { enabled: Some(false), ..Default::default() };
        svc.update(MetricKind::Cls, &patch, Some("ops")).await.unwrap();

        let rows = svc.get_all().await;
        assert_eq!(rows.len(), 10);
        let cls: Vec<_> = rows.iter().filter(|r| r.metric == MetricKind::Cls).collect();
        assert_eq!(cls.len(), 1);
        assert!(!cls[0].enabled);
        assert!(!cls[0].is_default());
    }

    #[tokio::test]
    async fn reads_degrade_to_defaults_when_store_is_down() {
        let svc = ThresholdService::new(Arc::new(DownStore));
        let rows = svc.get_all().await;
        assert_eq!(rows.len(), 10);
        assert!(rows.iter().all(|r| r.is_default()));

        let one = svc.get(MetricKind::Conversions).await;
        assert_eq!(one.percent_change_threshold, 40.0);

        let err = svc.try_get_all().await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn writes_propagate_store_failure() {
        let svc = ThresholdService::new(Arc::new(DownStore));
        let err = svc
            .update(MetricKind::Users, &ThresholdUpdate::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ThresholdError::Unavailable(_)));
    }

    #[tokio::test]
    async fn invalid_update_never_reaches_the_store() {
        let svc = memory();
        let bad = ThresholdUpdate { warning_multiplier: Some(20.0), ..Default::default() };
        let err = svc.update(MetricKind::Users, &bad, None).await.unwrap_err();
        assert_eq!(err.field_errors()[0].field, "warningMultiplier");
        assert!(svc.get(MetricKind::Users).await.is_default());
    }

    #[tokio::test]
    async fn partial_update_only_touches_supplied_fields() {
        let svc = memory();
        svc.update(
            MetricKind::Pageviews,
            &ThresholdUpdate { percent_change_threshold: Some(45.0), ..Default::default() },
            Some("a"),
        )
        .await
        .unwrap();
        let row = svc
            .update(
                MetricKind::Pageviews,
                &ThresholdUpdate { warning_multiplier: Some(2.5), ..Default::default() },
                Some("b"),
            )
            .await
            .unwrap();
        assert_eq!(row.percent_change_threshold, 45.0);
        assert_eq!(row.warning_multiplier, 2.5);
        assert_eq!(row.critical_multiplier, 3.0);
        assert_eq!(row.updated_by.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn reset_is_idempotent() {
        let svc = memory();
        svc.update(
            MetricKind::Ttfb,
            &ThresholdUpdate {
                warning_multiplier: Some(3.0),
                critical_multiplier: Some(4.0),
                percent_change_threshold: Some(80.0),
                enabled: Some(false),
            },
            None,
        )
        .await
        .unwrap();

        let once = svc.reset(MetricKind::Ttfb, Some("admin")).await.unwrap();
        let twice = svc.reset(MetricKind::Ttfb, Some("admin")).await.unwrap();
        assert_eq!(once.settings(), default_settings(MetricKind::Ttfb));
        assert_eq!(once.settings(), twice.settings());
        assert_eq!(once.id, twice.id);
        assert_eq!(once.updated_by, twice.updated_by);
    }

    #[tokio::test]
    async fn batch_reports_failures_and_keeps_successes() {
        let svc = memory();
        let updates = vec![
            (MetricKind::Sessions, ThresholdUpdate { percent_change_threshold: Some(35.0), ..Default::default() }),
            (MetricKind::Users, ThresholdUpdate { percent_change_threshold: Some(1.0), ..Default::default() }),
            (MetricKind::Lcp, ThresholdUpdate { enabled: Some(false), ..Default::default() }),
        ];
        let outcome = svc.update_many(&updates, Some("bulk")).await;
        assert!(!outcome.is_complete());
        assert_eq!(outcome.succeeded_metrics(), vec![MetricKind::Sessions, MetricKind::Lcp]);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].metric, MetricKind::Users);
        assert!(!outcome.failed[0].retryable);

        assert_eq!(svc.get(MetricKind::Sessions).await.percent_change_threshold, 35.0);
        assert!(!svc.get(MetricKind::Lcp).await.enabled);
    }

    #[tokio::test]
    async fn reset_all_restores_every_metric() {
        let svc = memory();
        svc.update(MetricKind::Fcp, &ThresholdUpdate { enabled: Some(false), ..Default::default() }, None)
            .await
            .unwrap();
        let outcome = svc.reset_all(Some("admin")).await;
        assert!(outcome.is_complete());
        assert_eq!(outcome.applied.len(), 10);
        for row in svc.get_all().await {
            assert_eq!(row.settings(), default_settings(row.metric));
            assert_eq!(row.updated_by.as_deref(), Some("admin"));
        }
    }

    #[tokio::test]
    async fn reset_all_against_down_store_reports_every_metric() {
        let svc = ThresholdService::new(Arc::new(DownStore));
        let outcome = svc.reset_all(None).await;
        assert!(outcome.applied.is_empty());
        assert_eq!(outcome.failed.len(), 10);
        assert!(outcome.failed.iter().all(|f| f.retryable));
    }
}
