//! Roll-up of anomalous verdicts for the daily/weekly alert job.

use serde::{Deserialize, Serialize};

use pulse_core::MetricKind;

use super::{AnomalyVerdict, MetricObservation, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Increase,
    Decrease,
    Flat,
}

impl Direction {
    pub fn between(current: f64, expected: f64) -> Self {
        if current > expected {
            Direction::Increase
        } else if current < expected {
            Direction::Decrease
        } else {
            Direction::Flat
        }
    }
}

/// Whether a move is good or bad news for the metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Degradation,
    Improvement,
    Neutral,
}

impl Impact {
    pub fn of(metric: MetricKind, direction: Direction) -> Self {
        match (direction, metric.increase_is_bad()) {
            (Direction::Flat, _) => Impact::Neutral,
            (Direction::Increase, true) | (Direction::Decrease, false) => Impact::Degradation,
            (Direction::Increase, false) | (Direction::Decrease, true) => Impact::Improvement,
        }
    }
}

/// An anomalous observation, ready to be rendered into an alert line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyFinding {
    pub metric: MetricKind,
    pub current_value: f64,
    pub expected_value: f64,
    pub severity: Severity,
    pub direction: Direction,
    pub impact: Impact,
    pub deviation_percent: f64,
    pub z_score: f64,
}

impl AnomalyFinding {
    /// `None` when the verdict is not anomalous.
    pub fn from_verdict(obs: &MetricObservation, verdict: AnomalyVerdict) -> Option<Self> {
        let severity = verdict.severity?;
        let direction = Direction::between(obs.current_value, obs.expected_value);
        Some(Self {
            metric: obs.metric,
            current_value: obs.current_value,
            expected_value: obs.expected_value,
            severity,
            direction,
            impact: Impact::of(obs.metric, direction),
            deviation_percent: verdict.deviation_percent,
            z_score: verdict.z_score,
        })
    }

    /// One-line description, e.g.
    /// `[critical] Sessions: 650 vs expected 1000 (decrease 35.0%, z=3.50, degradation)`.
    pub fn describe(&self) -> String {
        let direction = match self.direction {
            Direction::Increase => "increase",
            Direction::Decrease => "decrease",
            Direction::Flat => "no change",
        };
        let impact = match self.impact {
            Impact::Degradation => "degradation",
            Impact::Improvement => "improvement",
            Impact::Neutral => "neutral",
        };
        format!(
            "[{}] {}: {} vs expected {} ({} {:.1}%, z={:.2}, {})",
            self.severity,
            self.metric.label(),
            format_value(self.current_value),
            format_value(self.expected_value),
            direction,
            self.deviation_percent.abs(),
            self.z_score,
            impact,
        )
    }
}

/// Integers print without decimals; fractional values keep two places.
fn format_value(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{:.2}", v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalySummary {
    pub total_anomalies: usize,
    pub critical_count: usize,
    pub warning_count: usize,
    pub health_status: HealthStatus,
}

impl AnomalySummary {
    pub fn from_findings(findings: &[AnomalyFinding]) -> Self {
        let critical_count = findings
            .iter()
            .filter(|f| f.severity == Severity::Critical)
            .count();
        let warning_count = findings.len() - critical_count;
        let health_status = if critical_count > 0 {
            HealthStatus::Critical
        } else if warning_count > 0 {
            HealthStatus::Warning
        } else {
            HealthStatus::Healthy
        };
        Self {
            total_anomalies: findings.len(),
            critical_count,
            warning_count,
            health_status,
        }
    }
}
