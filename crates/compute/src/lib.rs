//! Pure evaluation engines: composite content score and threshold-based
//! anomaly classification. Nothing in this crate performs I/O.

pub mod anomaly;
pub mod error;
pub mod scoring;

pub use anomaly::{
    evaluate_all, evaluate_anomaly, evaluate_observation, AnomalyFinding, AnomalySummary,
    AnomalyVerdict, Direction, HealthStatus, Impact, MetricObservation, Severity,
};
pub use error::{ParseRankError, WeightsError};
pub use scoring::{
    determine_rank, filter_ranked, rank_articles, score_article, score_article_with,
    ArticleMetrics, ArticleScore, PerformanceMetrics, Rank, RankFilter, ScoreBreakdown,
    ScoreWeights,
};
