//! Threshold persistence behind the [`ThresholdStore`] repository trait.
//!
//! Stores only hold overrides; a metric with no row is implicitly at its
//! compiled-in default. Every store parses rows into [`AlertThreshold`] at
//! its own edge so nothing downstream sees raw storage records.

pub mod memory;
pub mod postgres;
pub mod yaml;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use pulse_core::{default_settings, AlertThreshold, MetricKind, ThresholdUpdate};

use crate::error::Result;
use crate::validation::{check_multiplier_order, order_blame};

pub use memory::InMemoryThresholdStore;
pub use postgres::PgThresholdStore;
pub use yaml::YamlThresholdStore;

/// Repository over per-metric threshold rows.
#[async_trait]
pub trait ThresholdStore: Send + Sync {
    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;

    /// All stored rows, at most one per metric, in any order.
    async fn load_all(&self) -> Result<Vec<AlertThreshold>>;

    /// The stored row for `metric`, if one exists.
    async fn load(&self, metric: MetricKind) -> Result<Option<AlertThreshold>>;

    /// Create or patch the row for `metric` as one atomic step.
    ///
    /// A new row takes the compiled-in default for every field `patch` omits;
    /// an existing row keeps its values for those fields. `updated_at` and
    /// `updated_by` are always stamped. Writes to the same metric are
    /// serialized (last writer wins); the merged row must satisfy
    /// `critical_multiplier > warning_multiplier`.
    async fn upsert(
        &self,
        metric: MetricKind,
        patch: &ThresholdUpdate,
        actor: Option<&str>,
    ) -> Result<AlertThreshold>;
}

/// Merge `patch` into `existing` (or the default) and stamp it.
///
/// Shared by the stores that do the merge in process.
pub(crate) fn apply_patch(
    metric: MetricKind,
    existing: Option<&AlertThreshold>,
    patch: &ThresholdUpdate,
    actor: Option<&str>,
) -> Result<AlertThreshold> {
    let base = existing
        .map(|row| row.settings())
        .unwrap_or_else(|| default_settings(metric));
    let merged = patch.apply_to(base);
    check_multiplier_order(&merged, order_blame(patch))?;

    let id = existing.and_then(|row| row.id).unwrap_or_else(Uuid::new_v4);
    Ok(AlertThreshold::from_settings(
        metric,
        merged,
        Some(id),
        Utc::now(),
        actor.map(str::to_string),
    ))
}
