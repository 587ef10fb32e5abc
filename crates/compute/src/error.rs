use thiserror::Error;

/// Rejected custom score weights.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WeightsError {
    #[error("weight '{field}' must be a finite, non-negative number, got {value}")]
    InvalidWeight { field: &'static str, value: f64 },

    #[error("weights must sum to 1.0, got {0}")]
    BadSum(f64),
}

/// A rank letter outside S/A/B/C.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown rank '{0}': must be one of S, A, B, C")]
pub struct ParseRankError(pub String);
