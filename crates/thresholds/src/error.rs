use serde::Serialize;

/// One rejected field of a threshold update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    /// Wire name of the field, e.g. `"criticalMultiplier"`.
    pub field: &'static str,
    pub message: String,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors from threshold configuration management.
#[derive(Debug, thiserror::Error)]
pub enum ThresholdError {
    /// The update was rejected before reaching storage.
    #[error("invalid threshold update: {}", join_field_errors(.0))]
    Invalid(Vec<FieldError>),

    /// The store could not be reached or did not answer.
    #[error("threshold store unavailable: {0}")]
    Unavailable(String),

    /// A stored row did not parse into a threshold.
    #[error("malformed threshold row: {0}")]
    MalformedRow(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The database answered but the query or its rows were rejected.
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

/// Connection-level failures become `Unavailable`; everything else the
/// database reports stays a non-retryable `Database` error.
impl From<sqlx::Error> for ThresholdError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => Self::Unavailable(e.to_string()),
            other => Self::Database(other),
        }
    }
}

impl ThresholdError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid(vec![FieldError { field, message: message.into() }])
    }

    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Io(_))
    }

    /// Field errors carried by an `Invalid` error, empty otherwise.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Self::Invalid(errors) => errors,
            _ => &[],
        }
    }
}

pub type Result<T> = std::result::Result<T, ThresholdError>;
