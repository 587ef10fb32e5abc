//! Process-local threshold store.
//!
//! One mutex per metric row, created up front for every kind, so writers to
//! different metrics never contend and the row map itself is never locked.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use pulse_core::{AlertThreshold, MetricKind, ThresholdUpdate};

use super::{apply_patch, ThresholdStore};
use crate::error::{Result, ThresholdError};

pub struct InMemoryThresholdStore {
    rows: HashMap<MetricKind, Mutex<Option<AlertThreshold>>>,
}

impl InMemoryThresholdStore {
    pub fn new() -> Self {
        Self {
            rows: MetricKind::ALL
                .iter()
                .map(|m| (*m, Mutex::new(None)))
                .collect(),
        }
    }

    fn row(&self, metric: MetricKind) -> Result<MutexGuard<'_, Option<AlertThreshold>>> {
        let slot = self
            .rows
            .get(&metric)
            .ok_or_else(|| ThresholdError::Unavailable(format!("no slot for metric {}", metric)))?;
        slot.lock()
            .map_err(|_| ThresholdError::Unavailable(format!("lock for {} poisoned", metric)))
    }
}

impl Default for InMemoryThresholdStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ThresholdStore for InMemoryThresholdStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn load_all(&self) -> Result<Vec<AlertThreshold>> {
        let mut out = Vec::new();
        for metric in MetricKind::ALL {
            if let Some(row) = self.row(metric)?.as_ref() {
                out.push(row.clone());
            }
        }
        Ok(out)
    }

    async fn load(&self, metric: MetricKind) -> Result<Option<AlertThreshold>> {
        Ok(self.row(metric)?.clone())
    }

    async fn upsert(
        &self,
        metric: MetricKind,
        patch: &ThresholdUpdate,
        actor: Option<&str>,
    ) -> Result<AlertThreshold> {
        let mut guard = self.row(metric)?;
        let updated = apply_patch(metric, guard.as_ref(), patch, actor)?;
        *guard = Some(updated.clone());
        Ok(updated)
    }
}
