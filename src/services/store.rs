use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{AutoMatchBatch, Carrier, Match, MatchStatus, Package};

/// Errors from the persistence boundary
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("row not found".to_string()),
            other => StoreError::Database(other.to_string()),
        }
    }
}

/// Outcome of a feedback write
#[derive(Debug, Clone, Copy)]
pub struct FeedbackWrite {
    /// Total feedback records after the write
    pub total: u64,
    /// Whether the write created a new record (false for a re-upsert)
    pub inserted: bool,
}

/// Canonical persistence port for the matching engine
///
/// The engine is the single writer for package `matched`/claim markers and
/// for match creation; adapters for any concrete store implement this
/// trait. Match creation is append-only: scores are never mutated after
/// creation.
#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Packages with `status = pending` and `matched = false`, up to `limit`
    async fn get_pending_packages(&self, limit: usize) -> Result<Vec<Package>, StoreError>;

    async fn get_package(&self, id: Uuid) -> Result<Package, StoreError>;

    /// Carriers with `active = true`
    async fn get_active_carriers(&self) -> Result<Vec<Carrier>, StoreError>;

    /// Exclusively claim a package for one matching attempt.
    ///
    /// Optimistic check-and-set; returns false when another run holds the
    /// claim or the package is already matched. Two concurrent batch runs
    /// must never both see true for the same package.
    async fn claim_package(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Release a claim after an attempt that created no matches
    async fn release_package(&self, id: Uuid) -> Result<(), StoreError>;

    async fn create_match(&self, m: &Match) -> Result<Uuid, StoreError>;

    async fn get_match(&self, id: Uuid) -> Result<Match, StoreError>;

    /// Apply a lifecycle transition to a match.
    ///
    /// When the transition is terminal but not completed (rejected, expired
    /// or cancelled) and it leaves the package with no remaining active
    /// match, the package's `matched` marker is cleared so the package
    /// returns to the pending backlog.
    async fn update_match_status(
        &self,
        id: Uuid,
        status: MatchStatus,
        responded_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError>;

    /// Expire pending matches whose offer window lapsed before `now`, and
    /// clear the `matched` marker on pending packages left without any
    /// active match. Returns the number of matches expired.
    async fn expire_stale_matches(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;

    async fn mark_package_matched(&self, id: Uuid, matched_at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Idempotent upsert keyed by match id
    async fn record_feedback(
        &self,
        match_id: Uuid,
        success: bool,
        feedback: &str,
        rating: Option<f64>,
    ) -> Result<FeedbackWrite, StoreError>;

    async fn save_batch(&self, batch: &AutoMatchBatch) -> Result<(), StoreError>;

    /// Adapter-level liveness probe for the health endpoint
    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(true)
    }
}
