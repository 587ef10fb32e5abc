use serde::{Deserialize, Serialize};

use crate::error::WeightsError;

const SUM_TOLERANCE: f64 = 1e-6;

/// Relative weight of each sub-score in the composite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoreWeights {
    pub rank: f64,
    pub ctr: f64,
    pub transition: f64,
    pub engagement: f64,
}

impl ScoreWeights {
    pub const DEFAULT: ScoreWeights = ScoreWeights {
        rank: 0.30,
        ctr: 0.25,
        transition: 0.25,
        engagement: 0.20,
    };

    /// Check every weight is finite and non-negative and that they sum to 1.0.
    pub fn validate(&self) -> Result<(), WeightsError> {
        for (field, value) in [
            ("rank", self.rank),
            ("ctr", self.ctr),
            ("transition", self.transition),
            ("engagement", self.engagement),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(WeightsError::InvalidWeight { field, value });
            }
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > SUM_TOLERANCE {
            return Err(WeightsError::BadSum(sum));
        }
        Ok(())
    }

    pub fn sum(&self) -> f64 {
        self.rank + self.ctr + self.transition + self.engagement
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self::DEFAULT
    }
}
