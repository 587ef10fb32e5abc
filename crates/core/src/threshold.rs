//! Alert threshold configuration model.
//!
//! [`ThresholdSettings`] is the tunable part of a threshold, [`AlertThreshold`]
//! is a resolved row (stored or defaulted), and [`ThresholdUpdate`] is a partial
//! patch coming from the settings screen.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::metric::MetricKind;

/// Sensitivity settings for one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdSettings {
    /// z-score at which an observation becomes a warning.
    pub warning_multiplier: f64,
    /// z-score at which an observation becomes critical.
    pub critical_multiplier: f64,
    /// Absolute percent change that triggers an anomaly on its own.
    pub percent_change_threshold: f64,
    pub enabled: bool,
}

const TRAFFIC: ThresholdSettings = ThresholdSettings {
    warning_multiplier: 2.0,
    critical_multiplier: 3.0,
    percent_change_threshold: 30.0,
    enabled: true,
};

const WEB_VITALS: ThresholdSettings = ThresholdSettings {
    warning_multiplier: 1.5,
    critical_multiplier: 2.0,
    percent_change_threshold: 25.0,
    enabled: true,
};

/// Compiled-in default for a metric. This table is the seed data.
pub const fn default_settings(metric: MetricKind) -> ThresholdSettings {
    match metric {
        MetricKind::Sessions | MetricKind::Users | MetricKind::Pageviews => TRAFFIC,
        MetricKind::BounceRate => ThresholdSettings {
            percent_change_threshold: 20.0,
            ..TRAFFIC
        },
        MetricKind::Conversions => ThresholdSettings {
            percent_change_threshold: 40.0,
            ..TRAFFIC
        },
        MetricKind::Lcp | MetricKind::Fid | MetricKind::Cls | MetricKind::Fcp | MetricKind::Ttfb => {
            WEB_VITALS
        }
    }
}

/// The full default table, one entry per metric kind.
pub const DEFAULT_THRESHOLDS: [(MetricKind, ThresholdSettings); 10] = [
    (MetricKind::Sessions, default_settings(MetricKind::Sessions)),
    (MetricKind::Users, default_settings(MetricKind::Users)),
    (MetricKind::Pageviews, default_settings(MetricKind::Pageviews)),
    (MetricKind::BounceRate, default_settings(MetricKind::BounceRate)),
    (MetricKind::Conversions, default_settings(MetricKind::Conversions)),
    (MetricKind::Lcp, default_settings(MetricKind::Lcp)),
    (MetricKind::Fid, default_settings(MetricKind::Fid)),
    (MetricKind::Cls, default_settings(MetricKind::Cls)),
    (MetricKind::Fcp, default_settings(MetricKind::Fcp)),
    (MetricKind::Ttfb, default_settings(MetricKind::Ttfb)),
];

/// A resolved threshold row for one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertThreshold {
    /// Storage id; `None` when the row comes from the default table.
    pub id: Option<Uuid>,
    pub metric: MetricKind,
    pub warning_multiplier: f64,
    pub critical_multiplier: f64,
    pub percent_change_threshold: f64,
    pub enabled: bool,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<String>,
}

impl AlertThreshold {
    /// Build the implicit default row for a metric that has no stored override.
    pub fn default_for(metric: MetricKind) -> Self {
        Self::from_settings(metric, default_settings(metric), None, Utc::now(), None)
    }

    pub fn from_settings(
        metric: MetricKind,
        settings: ThresholdSettings,
        id: Option<Uuid>,
        updated_at: DateTime<Utc>,
        updated_by: Option<String>,
    ) -> Self {
        Self {
            id,
            metric,
            warning_multiplier: settings.warning_multiplier,
            critical_multiplier: settings.critical_multiplier,
            percent_change_threshold: settings.percent_change_threshold,
            enabled: settings.enabled,
            updated_at,
            updated_by,
        }
    }

    pub fn settings(&self) -> ThresholdSettings {
        ThresholdSettings {
            warning_multiplier: self.warning_multiplier,
            critical_multiplier: self.critical_multiplier,
            percent_change_threshold: self.percent_change_threshold,
            enabled: self.enabled,
        }
    }

    pub fn is_default(&self) -> bool {
        self.id.is_none()
    }
}

/// Partial update of a threshold (all fields optional).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning_multiplier: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critical_multiplier: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent_change_threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl ThresholdUpdate {
    pub fn is_empty(&self) -> bool {
        self.warning_multiplier.is_none()
            && self.critical_multiplier.is_none()
            && self.percent_change_threshold.is_none()
            && self.enabled.is_none()
    }

    /// Overlay the supplied fields on `base`; omitted fields keep `base` values.
    pub fn apply_to(&self, base: ThresholdSettings) -> ThresholdSettings {
        ThresholdSettings {
            warning_multiplier: self.warning_multiplier.unwrap_or(base.warning_multiplier),
            critical_multiplier: self.critical_multiplier.unwrap_or(base.critical_multiplier),
            percent_change_threshold: self
                .percent_change_threshold
                .unwrap_or(base.percent_change_threshold),
            enabled: self.enabled.unwrap_or(base.enabled),
        }
    }
}

impl From<ThresholdSettings> for ThresholdUpdate {
    /// An update that forces every field.
    fn from(s: ThresholdSettings) -> Self {
        Self {
            warning_multiplier: Some(s.warning_multiplier),
            critical_multiplier: Some(s.critical_multiplier),
            percent_change_threshold: Some(s.percent_change_threshold),
            enabled: Some(s.enabled),
        }
    }
}
