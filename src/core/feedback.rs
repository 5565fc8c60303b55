use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::core::error::EngineError;
use crate::services::store::{MatchStore, StoreError};

/// Errors from the external training boundary
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("refresh request failed: {0}")]
    Request(String),
}

/// External training boundary for the pluggable scorer
///
/// Refresh requests are fire-and-forget; a failed signal is logged, never
/// propagated as an engine error.
#[async_trait]
pub trait ScorerTrainer: Send + Sync {
    async fn request_refresh(&self) -> Result<(), TrainerError>;
}

/// Trainer stub for deployments without a training service
#[derive(Debug, Clone, Default)]
pub struct NoopTrainer;

#[async_trait]
impl ScorerTrainer for NoopTrainer {
    async fn request_refresh(&self) -> Result<(), TrainerError> {
        tracing::debug!("scorer refresh requested (no trainer configured)");
        Ok(())
    }
}

/// Records resolved-match outcomes for later scorer improvement
pub struct FeedbackRecorder {
    store: Arc<dyn MatchStore>,
    trainer: Arc<dyn ScorerTrainer>,
    /// Signal a scorer refresh every N feedback records; 0 disables
    refresh_every: u64,
}

impl FeedbackRecorder {
    pub fn new(store: Arc<dyn MatchStore>, trainer: Arc<dyn ScorerTrainer>, refresh_every: u64) -> Self {
        Self {
            store,
            trainer,
            refresh_every,
        }
    }

    /// Idempotent upsert keyed by match id
    ///
    /// Only resolved matches accept feedback; it writes forward, never back
    /// into the ranking path of in-flight batches.
    pub async fn record(
        &self,
        match_id: Uuid,
        success: bool,
        feedback: &str,
        rating: Option<f64>,
    ) -> Result<(), EngineError> {
        if let Some(r) = rating {
            if !(0.0..=5.0).contains(&r) {
                return Err(EngineError::Validation(format!(
                    "rating {} outside 0-5",
                    r
                )));
            }
        }

        let resolved = match self.store.get_match(match_id).await {
            Ok(m) => m,
            Err(StoreError::NotFound(msg)) => return Err(EngineError::NotFound(msg)),
            Err(e) => return Err(EngineError::Store(e)),
        };

        if resolved.status.is_active() {
            return Err(EngineError::Validation(format!(
                "match {} has not resolved yet",
                match_id
            )));
        }

        let write = self
            .store
            .record_feedback(match_id, success, feedback, rating)
            .await?;

        tracing::debug!(
            "feedback recorded for match {} (success={}, total {}, inserted={})",
            match_id,
            success,
            write.total,
            write.inserted
        );

        // Only new records count toward the threshold; a re-upsert whose
        // unchanged total sits on a multiple must not re-signal
        if write.inserted && self.refresh_every > 0 && write.total % self.refresh_every == 0 {
            let trainer = self.trainer.clone();
            let total = write.total;
            tokio::spawn(async move {
                if let Err(e) = trainer.request_refresh().await {
                    tracing::warn!("scorer refresh signal failed: {}", e);
                } else {
                    tracing::info!("scorer refresh requested after {} feedback records", total);
                }
            });
        }

        Ok(())
    }
}
