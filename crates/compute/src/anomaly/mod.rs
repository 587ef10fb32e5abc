//! Threshold-based anomaly classification.
//!
//! [`evaluate_anomaly`] classifies one observation against a resolved
//! [`AlertThreshold`]. It never touches a store; callers resolve the
//! threshold first.
//!
//! Sub-modules:
//! - [`summary`] - findings, direction/impact, and health roll-up

pub mod summary;

use serde::{Deserialize, Serialize};
use tracing::trace;

use pulse_core::{AlertThreshold, MetricKind};

pub use summary::{AnomalyFinding, AnomalySummary, Direction, HealthStatus, Impact};

/// One metric value compared to its historical expectation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricObservation {
    pub metric: MetricKind,
    pub current_value: f64,
    pub expected_value: f64,
    /// Standard deviation of the baseline, same unit as the values.
    pub std_dev: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Outcome of one evaluation. `severity.is_some() == is_anomaly` always holds;
/// build values through the constructors to keep it that way.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyVerdict {
    pub is_anomaly: bool,
    pub severity: Option<Severity>,
    /// Signed percent change from the expected value.
    pub deviation_percent: f64,
    /// Absolute distance from the expected value in standard deviations.
    pub z_score: f64,
}

impl AnomalyVerdict {
    /// Verdict for a disabled metric: nothing computed, nothing flagged.
    pub fn suppressed() -> Self {
        Self::normal(0.0, 0.0)
    }

    pub fn normal(deviation_percent: f64, z_score: f64) -> Self {
        Self {
            is_anomaly: false,
            severity: None,
            deviation_percent,
            z_score,
        }
    }

    pub fn anomalous(severity: Severity, deviation_percent: f64, z_score: f64) -> Self {
        Self {
            is_anomaly: true,
            severity: Some(severity),
            deviation_percent,
            z_score,
        }
    }
}

/// Signed percent change of `current` from `expected`.
///
/// A zero or non-finite baseline has no meaningful percent change; it yields
/// 0 so the z-score alone decides. Callers should avoid feeding zero baselines.
pub fn deviation_percent(current: f64, expected: f64) -> f64 {
    if expected == 0.0 || !expected.is_finite() {
        return 0.0;
    }
    (current - expected) / expected * 100.0
}

/// `|current - expected| / std_dev`, or 0 unless `std_dev` is positive (NaN included).
pub fn z_score(current: f64, expected: f64, std_dev: f64) -> f64 {
    if std_dev > 0.0 {
        (current - expected).abs() / std_dev
    } else {
        0.0
    }
}

/// Classify one observation.
///
/// Order of checks: a disabled threshold suppresses everything; a percent
/// change beyond the threshold or a critical z-score is an anomaly (critical
/// only when the z-score is); otherwise a warning z-score is a warning.
pub fn evaluate_anomaly(
    metric: MetricKind,
    current_value: f64,
    expected_value: f64,
    std_dev: f64,
    threshold: &AlertThreshold,
) -> AnomalyVerdict {
    if !threshold.enabled {
        trace!(metric = %metric, "threshold disabled, skipping");
        return AnomalyVerdict::suppressed();
    }

    let deviation = deviation_percent(current_value, expected_value);
    let z = z_score(current_value, expected_value, std_dev);

    let exceeds_percent = deviation.abs() > threshold.percent_change_threshold;
    let is_critical = z >= threshold.critical_multiplier;
    let is_warning = z >= threshold.warning_multiplier;

    let verdict = if exceeds_percent || is_critical {
        let severity = if is_critical { Severity::Critical } else { Severity::Warning };
        AnomalyVerdict::anomalous(severity, deviation, z)
    } else if is_warning {
        AnomalyVerdict::anomalous(Severity::Warning, deviation, z)
    } else {
        AnomalyVerdict::normal(deviation, z)
    };

    trace!(
        metric = %metric,
        deviation,
        z_score = z,
        severity = ?verdict.severity,
        "evaluated observation"
    );
    verdict
}

/// [`evaluate_anomaly`] over a [`MetricObservation`].
pub fn evaluate_observation(obs: &MetricObservation, threshold: &AlertThreshold) -> AnomalyVerdict {
    evaluate_anomaly(
        obs.metric,
        obs.current_value,
        obs.expected_value,
        obs.std_dev,
        threshold,
    )
}

/// Evaluate a batch and keep only anomalous findings, in input order.
///
/// Each observation uses the threshold row for its metric from `thresholds`,
/// or the compiled-in default when the slice has no row for it.
pub fn evaluate_all(
    observations: &[MetricObservation],
    thresholds: &[AlertThreshold],
) -> Vec<AnomalyFinding> {
    observations
        .iter()
        .filter_map(|obs| {
            let verdict = match thresholds.iter().find(|t| t.metric == obs.metric) {
                Some(t) => evaluate_observation(obs, t),
                None => evaluate_observation(obs, &AlertThreshold::default_for(obs.metric)),
            };
            AnomalyFinding::from_verdict(obs, verdict)
        })
        .collect()
}
