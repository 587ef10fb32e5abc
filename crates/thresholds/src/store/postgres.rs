//! PostgreSQL threshold store over the `alert_thresholds` table.
//!
//! Upserts are a single `INSERT … ON CONFLICT (metric) DO UPDATE` statement.
//! Insert values are the patch resolved over the compiled-in default; update
//! values use `COALESCE` so only supplied fields change. The table's CHECK
//! constraint enforces `critical_multiplier > warning_multiplier` on the
//! merged row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use pulse_core::config::PostgresConfig;
use pulse_core::{default_settings, AlertThreshold, MetricKind, ThresholdUpdate};

use super::ThresholdStore;
use crate::error::{Result, ThresholdError};
use crate::validation::order_blame;

/// Postgres error code for `check_violation`.
const CHECK_VIOLATION: &str = "23514";

const COLUMNS: &str = "id, metric, warning_multiplier, critical_multiplier, \
                       percent_change_threshold, enabled, updated_at, updated_by";

#[derive(Debug, sqlx::FromRow)]
struct ThresholdRow {
    id: Uuid,
    metric: String,
    warning_multiplier: f64,
    critical_multiplier: f64,
    percent_change_threshold: f64,
    enabled: bool,
    updated_at: DateTime<Utc>,
    updated_by: Option<String>,
}

impl TryFrom<ThresholdRow> for AlertThreshold {
    type Error = ThresholdError;

    fn try_from(row: ThresholdRow) -> Result<Self> {
        let metric: MetricKind = row
            .metric
            .parse()
            .map_err(|e| ThresholdError::MalformedRow(format!("row {}: {}", row.id, e)))?;
        Ok(AlertThreshold {
            id: Some(row.id),
            metric,
            warning_multiplier: row.warning_multiplier,
            critical_multiplier: row.critical_multiplier,
            percent_change_threshold: row.percent_change_threshold,
            enabled: row.enabled,
            updated_at: row.updated_at,
            updated_by: row.updated_by,
        })
    }
}

pub struct PgThresholdStore {
    pool: PgPool,
}

impl PgThresholdStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with the configured pool size and apply pending migrations.
    pub async fn connect(config: &PostgresConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.connection_string())
            .await
            .map_err(|e| ThresholdError::Unavailable(format!("connect to {}: {}", config.host, e)))?;
        info!("PostgreSQL connected: {}", config.host);

        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Apply pending migrations from the workspace `migrations/` directory.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| ThresholdError::Unavailable(format!("migrations failed: {}", e)))?;
        info!("Database migrations applied successfully");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Turn a CHECK violation into a field error; other errors pass through.
fn map_check_violation(e: sqlx::Error, patch: &ThresholdUpdate) -> ThresholdError {
    if let sqlx::Error::Database(ref db) = e {
        if db.code().as_deref() == Some(CHECK_VIOLATION) {
            return ThresholdError::invalid(
                order_blame(patch),
                "criticalMultiplier must be greater than warningMultiplier",
            );
        }
    }
    e.into()
}

#[async_trait]
impl ThresholdStore for PgThresholdStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn load_all(&self) -> Result<Vec<AlertThreshold>> {
        let rows = sqlx::query_as::<_, ThresholdRow>(&format!(
            "SELECT {COLUMNS} FROM alert_thresholds ORDER BY metric"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AlertThreshold::try_from).collect()
    }

    async fn load(&self, metric: MetricKind) -> Result<Option<AlertThreshold>> {
        let row = sqlx::query_as::<_, ThresholdRow>(&format!(
            "SELECT {COLUMNS} FROM alert_thresholds WHERE metric = $1"
        ))
        .bind(metric.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(AlertThreshold::try_from).transpose()
    }

    async fn upsert(
        &self,
        metric: MetricKind,
        patch: &ThresholdUpdate,
        actor: Option<&str>,
    ) -> Result<AlertThreshold> {
        let created = patch.apply_to(default_settings(metric));

        let result = sqlx::query_as::<_, ThresholdRow>(&format!(
            "INSERT INTO alert_thresholds
                (metric, warning_multiplier, critical_multiplier,
                 percent_change_threshold, enabled, updated_at, updated_by)
             VALUES ($1, $2, $3, $4, $5, now(), $10)
             ON CONFLICT (metric) DO UPDATE SET
                warning_multiplier = COALESCE($6, alert_thresholds.warning_multiplier),
                critical_multiplier = COALESCE($7, alert_thresholds.critical_multiplier),
                percent_change_threshold = COALESCE($8, alert_thresholds.percent_change_threshold),
                enabled = COALESCE($9, alert_thresholds.enabled),
                updated_at = now(),
                updated_by = $10
             RETURNING {COLUMNS}"
        ))
        .bind(metric.as_str())
        .bind(created.warning_multiplier)
        .bind(created.critical_multiplier)
        .bind(created.percent_change_threshold)
        .bind(created.enabled)
        .bind(patch.warning_multiplier)
        .bind(patch.critical_multiplier)
        .bind(patch.percent_change_threshold)
        .bind(patch.enabled)
        .bind(actor)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => AlertThreshold::try_from(row),
            Err(e) => {
                warn!(metric = %metric, error = %e, "threshold upsert failed");
                Err(map_check_violation(e, patch))
            }
        }
    }
}
