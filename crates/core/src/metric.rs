use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseMetricError;

/// The closed set of observability metrics that carry an alert threshold.
///
/// Wire names match the analytics dashboard (`bounceRate`, not `bounce_rate`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricKind {
    Sessions,
    Users,
    Pageviews,
    BounceRate,
    Conversions,
    Lcp,
    Fid,
    Cls,
    Fcp,
    Ttfb,
}

/// Dashboard grouping of metric kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricCategory {
    Traffic,
    Engagement,
    CoreWebVitals,
}

impl MetricKind {
    /// Every kind, in display order.
    pub const ALL: [MetricKind; 10] = [
        MetricKind::Sessions,
        MetricKind::Users,
        MetricKind::Pageviews,
        MetricKind::BounceRate,
        MetricKind::Conversions,
        MetricKind::Lcp,
        MetricKind::Fid,
        MetricKind::Cls,
        MetricKind::Fcp,
        MetricKind::Ttfb,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Sessions => "sessions",
            MetricKind::Users => "users",
            MetricKind::Pageviews => "pageviews",
            MetricKind::BounceRate => "bounceRate",
            MetricKind::Conversions => "conversions",
            MetricKind::Lcp => "lcp",
            MetricKind::Fid => "fid",
            MetricKind::Cls => "cls",
            MetricKind::Fcp => "fcp",
            MetricKind::Ttfb => "ttfb",
        }
    }

    /// Human-readable label for settings screens and alert lines.
    pub fn label(&self) -> &'static str {
        match self {
            MetricKind::Sessions => "Sessions",
            MetricKind::Users => "Users",
            MetricKind::Pageviews => "Pageviews",
            MetricKind::BounceRate => "Bounce rate",
            MetricKind::Conversions => "Conversions",
            MetricKind::Lcp => "LCP (Largest Contentful Paint)",
            MetricKind::Fid => "FID (First Input Delay)",
            MetricKind::Cls => "CLS (Cumulative Layout Shift)",
            MetricKind::Fcp => "FCP (First Contentful Paint)",
            MetricKind::Ttfb => "TTFB (Time to First Byte)",
        }
    }

    pub fn category(&self) -> MetricCategory {
        match self {
            MetricKind::Sessions | MetricKind::Users | MetricKind::Pageviews => {
                MetricCategory::Traffic
            }
            MetricKind::BounceRate | MetricKind::Conversions => MetricCategory::Engagement,
            MetricKind::Lcp
            | MetricKind::Fid
            | MetricKind::Cls
            | MetricKind::Fcp
            | MetricKind::Ttfb => MetricCategory::CoreWebVitals,
        }
    }

    /// Whether a rising value means things got worse (bounce rate, latencies, layout shift).
    pub fn increase_is_bad(&self) -> bool {
        matches!(
            self,
            MetricKind::BounceRate
                | MetricKind::Lcp
                | MetricKind::Fid
                | MetricKind::Cls
                | MetricKind::Fcp
                | MetricKind::Ttfb
        )
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = ParseMetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricKind::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| ParseMetricError(s.to_string()))
    }
}

impl MetricCategory {
    pub fn label(&self) -> &'static str {
        match self {
            MetricCategory::Traffic => "Traffic",
            MetricCategory::Engagement => "Engagement",
            MetricCategory::CoreWebVitals => "Core Web Vitals",
        }
    }

    /// Metric kinds in this category, in display order.
    pub fn metrics(&self) -> Vec<MetricKind> {
        MetricKind::ALL
            .iter()
            .copied()
            .filter(|m| m.category() == *self)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_round_trip_through_from_str() {
        for metric in MetricKind::ALL {
            assert_eq!(metric.as_str().parse::<MetricKind>().unwrap(), metric);
        }
    }

    #[test]
    fn serde_uses_camel_case_names() {
        let json = serde_json::to_string(&MetricKind::BounceRate).unwrap();
        assert_eq!(json, "\"bounceRate\"");
        let back: MetricKind = serde_json::from_str("\"ttfb\"").unwrap();
        assert_eq!(back, MetricKind::Ttfb);
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = "bounce_rate".parse::<MetricKind>().unwrap_err();
        assert_eq!(err, ParseMetricError("bounce_rate".into()));
    }

    #[test]
    fn categories_partition_all_kinds() {
        let total: usize = [
            MetricCategory::Traffic,
            MetricCategory::Engagement,
            MetricCategory::CoreWebVitals,
        ]
        .iter()
        .map(|c| c.metrics().len())
        .sum();
        assert_eq!(total, MetricKind::ALL.len());
        assert_eq!(
            MetricCategory::Traffic.metrics(),
            vec![MetricKind::Sessions, MetricKind::Users, MetricKind::Pageviews]
        );
    }

    #[test]
    fn bad_direction() {
        assert!(MetricKind::BounceRate.increase_is_bad());
        assert!(MetricKind::Lcp.increase_is_bad());
        assert!(!MetricKind::Sessions.increase_is_bad());
        assert!(!MetricKind::Conversions.increase_is_bad());
    }
}
