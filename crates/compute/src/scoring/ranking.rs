//! Batch scoring of articles for the content dashboard.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{compose, PerformanceMetrics, Rank, ScoreBreakdown, ScoreWeights};
use crate::error::WeightsError;

/// Articles seen fewer times than this in search are too noisy to score.
pub const MIN_IMPRESSIONS: u64 = 10;

/// Engagement rate assumed when analytics has no data for an article.
pub const DEFAULT_ENGAGEMENT_RATE: f64 = 50.0;

/// Joined search + analytics row for one article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleMetrics {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    pub impressions: u64,
    pub position: f64,
    pub ctr: f64,
    #[serde(default)]
    pub transition_rate: Option<f64>,
    #[serde(default)]
    pub engagement_rate: Option<f64>,
}

impl ArticleMetrics {
    /// Scoring inputs with missing analytics filled in.
    pub fn performance(&self) -> PerformanceMetrics {
        PerformanceMetrics {
            position: self.position,
            ctr: self.ctr,
            transition_rate: self.transition_rate.unwrap_or(0.0),
            engagement_rate: self.engagement_rate.unwrap_or(DEFAULT_ENGAGEMENT_RATE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleScore {
    pub slug: String,
    pub title: String,
    pub category: Option<String>,
    pub content_type: Option<String>,
    pub metrics: PerformanceMetrics,
    pub breakdown: ScoreBreakdown,
}

/// Selection criteria over ranked articles. Empty filter keeps everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankFilter {
    pub min_rank: Option<Rank>,
    pub category: Option<String>,
    pub content_type: Option<String>,
    pub limit: Option<usize>,
}

impl RankFilter {
    fn matches(&self, score: &ArticleScore) -> bool {
        if let Some(min) = self.min_rank {
            if score.breakdown.rank < min {
                return false;
            }
        }
        if let Some(ref category) = self.category {
            if score.category.as_ref() != Some(category) {
                return false;
            }
        }
        if let Some(ref content_type) = self.content_type {
            if score.content_type.as_ref() != Some(content_type) {
                return false;
            }
        }
        true
    }
}

/// Score every article with enough impressions and sort best first.
///
/// Ties on composite score are broken by slug so output is deterministic.
pub fn rank_articles(
    articles: &[ArticleMetrics],
    weights: &ScoreWeights,
) -> Result<Vec<ArticleScore>, WeightsError> {
    weights.validate()?;

    let mut scores: Vec<ArticleScore> = articles
        .par_iter()
        .filter(|a| a.impressions >= MIN_IMPRESSIONS)
        .map(|a| {
            let metrics = a.performance();
            ArticleScore {
                slug: a.slug.clone(),
                title: a.title.clone(),
                category: a.category.clone(),
                content_type: a.content_type.clone(),
                metrics,
                breakdown: compose(&metrics, weights),
            }
        })
        .collect();

    scores.sort_by(|a, b| {
        b.breakdown
            .composite_score
            .cmp(&a.breakdown.composite_score)
            .then_with(|| a.slug.cmp(&b.slug))
    });

    debug!(
        input = articles.len(),
        scored = scores.len(),
        "ranked articles"
    );
    Ok(scores)
}

/// Keep ranked articles matching `filter`, preserving order.
pub fn filter_ranked(scores: &[ArticleScore], filter: &RankFilter) -> Vec<ArticleScore> {
    let limit = filter.limit.unwrap_or(usize::MAX);
    scores
        .iter()
        .filter(|s| filter.matches(s))
        .take(limit)
        .cloned()
        .collect()
}
