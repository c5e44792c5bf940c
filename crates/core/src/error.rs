use thiserror::Error;

pub type InsightsResult<T> = Result<T, InsightsError>;

#[derive(Error, Debug)]
pub enum InsightsError {
    /// Malformed event rejected before any counter was touched.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Aggregate store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl InsightsError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether the caller may reasonably retry the same call later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}
