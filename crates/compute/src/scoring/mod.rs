//! Composite content performance score.
//!
//! Four raw metrics are mapped onto discrete sub-scores (see [`buckets`]),
//! combined with [`ScoreWeights`] into a 0-100 composite, and classified into
//! a [`Rank`]. Rank boundaries are fixed and independent of the weights.
//!
//! Sub-modules:
//! - [`buckets`] - per-metric step functions
//! - [`weights`] - composite weights and their validation
//! - [`ranking`] - batch scoring, ordering, and filtering of articles

pub mod buckets;
pub mod ranking;
pub mod weights;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ParseRankError, WeightsError};

pub use buckets::{ctr_score, engagement_score, rank_score, transition_score};
pub use ranking::{filter_ranked, rank_articles, ArticleMetrics, ArticleScore, RankFilter};
pub use weights::ScoreWeights;

/// Raw inputs for one article or page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    /// Average search position, 1 = top.
    pub position: f64,
    /// Click-through rate, percent.
    pub ctr: f64,
    /// Referral transition rate, percent.
    pub transition_rate: f64,
    /// Engagement rate, percent.
    pub engagement_rate: f64,
}

/// Ordinal performance tier. Variants are declared worst to best so that
/// the derived ordering has `C < B < A < S`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rank {
    C,
    B,
    A,
    S,
}

impl Rank {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rank::S => "S",
            Rank::A => "A",
            Rank::B => "B",
            Rank::C => "C",
        }
    }
}

impl std::fmt::Display for Rank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rank {
    type Err = ParseRankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "S" | "s" => Ok(Rank::S),
            "A" | "a" => Ok(Rank::A),
            "B" | "b" => Ok(Rank::B),
            "C" | "c" => Ok(Rank::C),
            other => Err(ParseRankError(other.to_string())),
        }
    }
}

/// Sub-scores, composite, and rank for one metrics tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub rank_score: u8,
    pub ctr_score: u8,
    pub transition_score: u8,
    pub engagement_score: u8,
    pub composite_score: u8,
    pub rank: Rank,
}

/// Classify a composite score. Boundaries: 85 → S, 70 → A, 50 → B.
pub fn determine_rank(score: u8) -> Rank {
    if score >= 85 {
        Rank::S
    } else if score >= 70 {
        Rank::A
    } else if score >= 50 {
        Rank::B
    } else {
        Rank::C
    }
}

/// Score with the default weights. Total over all `f64` inputs.
pub fn score_article(metrics: &PerformanceMetrics) -> ScoreBreakdown {
    compose(metrics, &ScoreWeights::DEFAULT)
}

/// Score with custom weights, rejecting weights that do not form a convex mix.
pub fn score_article_with(
    metrics: &PerformanceMetrics,
    weights: &ScoreWeights,
) -> Result<ScoreBreakdown, WeightsError> {
    weights.validate()?;
    Ok(compose(metrics, weights))
}

fn compose(metrics: &PerformanceMetrics, weights: &ScoreWeights) -> ScoreBreakdown {
    let rank_score = buckets::rank_score(metrics.position);
    let ctr_score = buckets::ctr_score(metrics.ctr);
    let transition_score = buckets::transition_score(metrics.transition_rate);
    let engagement_score = buckets::engagement_score(metrics.engagement_rate);

    let weighted = f64::from(rank_score) * weights.rank
        + f64::from(ctr_score) * weights.ctr
        + f64::from(transition_score) * weights.transition
        + f64::from(engagement_score) * weights.engagement;
    let composite_score = round_half_up(weighted).clamp(0.0, 100.0) as u8;

    ScoreBreakdown {
        rank_score,
        ctr_score,
        transition_score,
        engagement_score,
        composite_score,
        rank: determine_rank(composite_score),
    }
}

/// Round half up. The nudge absorbs binary representation error so that a
/// weighted sum like 72.5 does not land on 72.4999….
fn round_half_up(x: f64) -> f64 {
    (x + 0.5 + 1e-9).floor()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(position: f64, ctr: f64, transition_rate: f64, engagement_rate: f64) -> PerformanceMetrics {
        PerformanceMetrics { position, ctr, transition_rate, engagement_rate }
    }

    #[test]
    fn top_article_scores_s() {
        let b = score_article(&metrics(1.0, 10.0, 6.0, 80.0));
        assert_eq!(
            (b.rank_score, b.ctr_score, b.transition_score, b.engagement_score),
            (100, 100, 100, 100)
        );
        assert_eq!(b.composite_score, 100);
        assert_eq!(b.rank, Rank::S);
    }

    #[test]
    fn poor_article_scores_c() {
        let b = score_article(&metrics(50.0, 0.5, 0.5, 30.0));
        assert_eq!(
            (b.rank_score, b.ctr_score, b.transition_score, b.engagement_score),
            (10, 10, 30, 30)
        );
        assert_eq!(b.composite_score, 19);
        assert_eq!(b.rank, Rank::C);
    }

    #[test]
    fn mid_article_rounds_half_up() {
        // 70*0.30 + 70*0.25 + 70*0.25 + 70*0.20 = 70
        let b = score_article(&metrics(8.2, 3.5, 2.2, 58.0));
        assert_eq!(b.composite_score, 70);
        assert_eq!(b.rank, Rank::A);

        // 50*0.30 + 50*0.25 + 50*0.25 + 70*0.20 = 54
        let b = score_article(&metrics(15.5, 2.8, 1.5, 52.0));
        assert_eq!(b.composite_score, 54);
        assert_eq!(b.rank, Rank::B);

        // 90*0.30 + 70*0.25 + 30*0.25 + 30*0.20 = 27 + 17.5 + 7.5 + 6 = 58
        let b = score_article(&metrics(4.0, 3.0, 0.0, 0.0));
        assert_eq!(b.composite_score, 58);

        // 10*0.30 + 90*0.25 + 30*0.25 + 30*0.20 = 3 + 22.5 + 7.5 + 6 = 39
        let b = score_article(&metrics(40.0, 5.0, 0.0, 0.0));
        assert_eq!(b.composite_score, 39);
    }

    #[test]
    fn exact_half_rounds_up() {
        assert_eq!(round_half_up(72.5), 73.0);
        assert_eq!(round_half_up(72.4999), 72.0);
        assert_eq!(round_half_up(0.0), 0.0);
    }

    #[test]
    fn rank_boundaries() {
        assert_eq!(determine_rank(100), Rank::S);
        assert_eq!(determine_rank(85), Rank::S);
        assert_eq!(determine_rank(84), Rank::A);
        assert_eq!(determine_rank(70), Rank::A);
        assert_eq!(determine_rank(69), Rank::B);
        assert_eq!(determine_rank(50), Rank::B);
        assert_eq!(determine_rank(49), Rank::C);
        assert_eq!(determine_rank(0), Rank::C);
    }

    #[test]
    fn rank_never_drops_as_score_rises() {
        for s in 0..100u8 {
            assert!(determine_rank(s) <= determine_rank(s + 1), "score {s}");
        }
    }

    #[test]
    fn rank_ordering_and_parsing() {
        assert!(Rank::S > Rank::A && Rank::A > Rank::B && Rank::B > Rank::C);
        assert_eq!("a".parse::<Rank>().unwrap(), Rank::A);
        assert_eq!("S".parse::<Rank>().unwrap(), Rank::S);
        assert!("D".parse::<Rank>().is_err());
    }

    #[test]
    fn custom_weights_change_composite_not_boundaries() {
        let m = metrics(1.0, 0.0, 0.0, 0.0);
        let rank_heavy = ScoreWeights { rank: 1.0, ctr: 0.0, transition: 0.0, engagement: 0.0 };
        let b = score_article_with(&m, &rank_heavy).unwrap();
        assert_eq!(b.composite_score, 100);
        assert_eq!(b.rank, Rank::S);

        let default = score_article(&m);
        assert_eq!(default.composite_score, 46);
        assert_eq!(default.rank, Rank::C);
    }

    #[test]
    fn invalid_custom_weights_are_rejected() {
        let m = metrics(1.0, 10.0, 6.0, 80.0);
        let w = ScoreWeights { rank: 0.9, ..ScoreWeights::DEFAULT };
        assert!(matches!(score_article_with(&m, &w), Err(WeightsError::BadSum(_))));
    }

    #[test]
    fn breakdown_serializes_rank_as_letter() {
        let b = score_article(&metrics(1.0, 10.0, 6.0, 80.0));
        let json = serde_json::to_value(b).unwrap();
        assert_eq!(json["rank"], "S");
        assert_eq!(json["compositeScore"], 100);
        assert_eq!(json["transitionScore"], 100);
    }
}
