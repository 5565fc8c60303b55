use thiserror::Error;

use crate::core::scoring::ScoreError;
use crate::services::store::StoreError;

/// Errors surfaced by the matching engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("scoring unavailable: {0}")]
    ScoringUnavailable(String),

    #[error("concurrency conflict: {0}")]
    Conflict(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl From<ScoreError> for EngineError {
    fn from(err: ScoreError) -> Self {
        EngineError::ScoringUnavailable(err.to_string())
    }
}
