use thiserror::Error;

/// A metric name that is not one of the ten supported kinds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown metric '{0}': must be one of sessions, users, pageviews, bounceRate, conversions, lcp, fid, cls, fcp, ttfb")]
pub struct ParseMetricError(pub String);
