//! File-backed threshold store: one YAML document holding every override.
//!
//! ```yaml
//! thresholds:
//!   - id: 6a1f…
//!     metric: bounceRate
//!     warning_multiplier: 2.0
//!     critical_multiplier: 3.0
//!     percent_change_threshold: 15.0
//!     enabled: true
//!     updated_at: 2025-06-01T09:00:00Z
//!     updated_by: alice
//! ```
//!
//! Writes go through a single async mutex and replace the file atomically
//! (temp file + rename). Reads never take the lock.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use pulse_core::{AlertThreshold, MetricKind, ThresholdUpdate};

use super::{apply_patch, ThresholdStore};
use crate::error::{Result, ThresholdError};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ThresholdFile {
    #[serde(default)]
    thresholds: Vec<StoredThreshold>,
}

/// On-disk row. Metric stays a string until [`TryFrom`] so an unknown name
/// is reported as a malformed row rather than a generic parse failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct StoredThreshold {
    id: Uuid,
    metric: String,
    warning_multiplier: f64,
    critical_multiplier: f64,
    percent_change_threshold: f64,
    enabled: bool,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    updated_by: Option<String>,
}

impl TryFrom<StoredThreshold> for AlertThreshold {
    type Error = ThresholdError;

    fn try_from(row: StoredThreshold) -> Result<Self> {
        let metric: MetricKind = row
            .metric
            .parse()
            .map_err(|e| ThresholdError::MalformedRow(format!("{}", e)))?;
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

impl From<&AlertThreshold> for StoredThreshold {
    fn from(t: &AlertThreshold) -> Self {
        Self {
            id: t.id.unwrap_or_else(Uuid::new_v4),
            metric: t.metric.as_str().to_string(),
            warning_multiplier: t.warning_multiplier,
            critical_multiplier: t.critical_multiplier,
            percent_change_threshold: t.percent_change_threshold,
            enabled: t.enabled,
            updated_at: t.updated_at,
            updated_by: t.updated_by.clone(),
        }
    }
}

/// Single-file store for one process at a time.
///
/// Every upsert takes one file-wide lock, so writes to different metrics
/// queue behind each other instead of running in parallel. Use
/// [`InMemoryThresholdStore`](super::InMemoryThresholdStore) or
/// [`PgThresholdStore`](super::PgThresholdStore) where independent metrics
/// must be writable concurrently. Other processes writing the same file are
/// not coordinated with.
pub struct YamlThresholdStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl YamlThresholdStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the whole file. A missing file means no overrides.
    async fn read_rows(&self) -> Result<Vec<AlertThreshold>> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let file: ThresholdFile = serde_yaml::from_str(&text)?;
        let mut seen = HashSet::new();
        let mut rows = Vec::with_capacity(file.thresholds.len());
        for stored in file.thresholds {
            let row = AlertThreshold::try_from(stored)?;
            if !seen.insert(row.metric) {
                return Err(ThresholdError::MalformedRow(format!(
                    "duplicate entry for metric {} in {}",
                    row.metric,
                    self.path.display()
                )));
            }
            rows.push(row);
        }
        Ok(rows)
    }

    async fn write_rows(&self, rows: &[AlertThreshold]) -> Result<()> {
        let file = ThresholdFile {
            thresholds: rows.iter().map(StoredThreshold::from).collect(),
        };
        let text = serde_yaml::to_string(&file)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let tmp = self.path.with_extension("yml.tmp");
        tokio::fs::write(&tmp, text).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), rows = rows.len(), "wrote threshold file");
        Ok(())
    }
}

#[async_trait]
impl ThresholdStore for YamlThresholdStore {
    fn backend_name(&self) -> &'static str {
        "yaml"
    }

    async fn load_all(&self) -> Result<Vec<AlertThreshold>> {
        self.read_rows().await
    }

    async fn load(&self, metric: MetricKind) -> Result<Option<AlertThreshold>> {
        Ok(self.read_rows().await?.into_iter().find(|r| r.metric == metric))
    }

    async fn upsert(
        &self,
        metric: MetricKind,
        patch: &ThresholdUpdate,
        actor: Option<&str>,
    ) -> Result<AlertThreshold> {
        let _guard = self.write_lock.lock().await;

        let mut rows = self.read_rows().await?;
        let position = rows.iter().position(|r| r.metric == metric);
        let updated = apply_patch(metric, position.map(|i| &rows[i]), patch, actor)?;
        match position {
            Some(i) => rows[i] = updated.clone(),
            None => rows.push(updated.clone()),
        }
        rows.sort_by_key(|r| r.metric);

        self.write_rows(&rows).await?;
        Ok(updated)
    }
}
