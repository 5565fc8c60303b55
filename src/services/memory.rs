use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{AutoMatchBatch, Carrier, Match, MatchStatus, Package, PackageStatus};
use crate::services::store::{FeedbackWrite, MatchStore, StoreError};

#[derive(Debug, Clone)]
struct FeedbackRecord {
    success: bool,
    feedback: String,
    rating: Option<f64>,
    recorded_at: DateTime<Utc>,
}

#[derive(Default)]
struct State {
    packages: HashMap<Uuid, Package>,
    carriers: HashMap<Uuid, Carrier>,
    matches: HashMap<Uuid, Match>,
    batches: HashMap<Uuid, AutoMatchBatch>,
    feedback: HashMap<Uuid, FeedbackRecord>,
    claimed: HashSet<Uuid>,
}

/// In-memory store adapter
///
/// Backs tests and local development with the same claim semantics as the
/// Postgres adapter: a package can be claimed by exactly one matching
/// attempt at a time.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_package(&self, package: Package) {
        self.state.write().await.packages.insert(package.id, package);
    }

    pub async fn insert_carrier(&self, carrier: Carrier) {
        self.state.write().await.carriers.insert(carrier.id, carrier);
    }

    pub async fn matches_for_package(&self, package_id: Uuid) -> Vec<Match> {
        self.state
            .read()
            .await
            .matches
            .values()
            .filter(|m| m.package_id == package_id)
            .cloned()
            .collect()
    }

    pub async fn batch(&self, id: Uuid) -> Option<AutoMatchBatch> {
        self.state.read().await.batches.get(&id).cloned()
    }

    pub async fn match_count(&self) -> usize {
        self.state.read().await.matches.len()
    }

    pub async fn feedback_count(&self) -> usize {
        self.state.read().await.feedback.len()
    }
}

#[async_trait]
impl MatchStore for MemoryStore {
    async fn get_pending_packages(&self, limit: usize) -> Result<Vec<Package>, StoreError> {
        let state = self.state.read().await;
        let mut pending: Vec<Package> = state
            .packages
            .values()
            .filter(|p| p.status == PackageStatus::Pending && !p.matched)
            .cloned()
            .collect();
        // Stable selection order for tests
        pending.sort_by_key(|p| p.id);
        pending.truncate(limit);
        Ok(pending)
    }

    async fn get_package(&self, id: Uuid) -> Result<Package, StoreError> {
        self.state
            .read()
            .await
            .packages
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("package {}", id)))
    }

    async fn get_active_carriers(&self) -> Result<Vec<Carrier>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .carriers
            .values()
            .filter(|c| c.active)
            .cloned()
            .collect())
    }

    async fn claim_package(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        let matched = state
            .packages
            .get(&id)
            .map(|p| p.matched)
            .ok_or_else(|| StoreError::NotFound(format!("package {}", id)))?;

        if matched || state.claimed.contains(&id) {
            return Ok(false);
        }
        state.claimed.insert(id);
        Ok(true)
    }

    async fn release_package(&self, id: Uuid) -> Result<(), StoreError> {
        self.state.write().await.claimed.remove(&id);
        Ok(())
    }

    async fn create_match(&self, m: &Match) -> Result<Uuid, StoreError> {
        let mut state = self.state.write().await;
        state.matches.insert(m.id, m.clone());
        Ok(m.id)
    }

    async fn get_match(&self, id: Uuid) -> Result<Match, StoreError> {
        self.state
            .read()
            .await
            .matches
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("match {}", id)))
    }

    async fn update_match_status(
        &self,
        id: Uuid,
        status: MatchStatus,
        responded_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let record = state
            .matches
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("match {}", id)))?;
        record.status = status;
        if responded_at.is_some() {
            record.responded_at = responded_at;
        }
        let package_id = record.package_id;

        // A rejected/expired/cancelled last offer returns the package to
        // the backlog; a completed match does not
        if status.is_terminal() && status != MatchStatus::Completed {
            reopen_if_unmatched(&mut state, package_id, Utc::now());
        }
        Ok(())
    }

    async fn expire_stale_matches(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut state = self.state.write().await;

        let mut expired = 0u64;
        let mut touched = Vec::new();
        for m in state.matches.values_mut() {
            if m.status == MatchStatus::Pending && now >= m.expires_at {
                m.status = MatchStatus::Expired;
                touched.push(m.package_id);
                expired += 1;
            }
        }

        for package_id in touched {
            reopen_if_unmatched(&mut state, package_id, now);
        }
        Ok(expired)
    }

    async fn mark_package_matched(&self, id: Uuid, matched_at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let package = state
            .packages
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("package {}", id)))?;
        package.matched = true;
        package.matched_at = Some(matched_at);
        state.claimed.remove(&id);
        Ok(())
    }

    async fn record_feedback(
        &self,
        match_id: Uuid,
        success: bool,
        feedback: &str,
        rating: Option<f64>,
    ) -> Result<FeedbackWrite, StoreError> {
        let mut state = self.state.write().await;
        let previous = state.feedback.insert(
            match_id,
            FeedbackRecord {
                success,
                feedback: feedback.to_string(),
                rating,
                recorded_at: Utc::now(),
            },
        );
        Ok(FeedbackWrite {
            total: state.feedback.len() as u64,
            inserted: previous.is_none(),
        })
    }

    async fn save_batch(&self, batch: &AutoMatchBatch) -> Result<(), StoreError> {
        self.state.write().await.batches.insert(batch.id, batch.clone());
        Ok(())
    }
}

/// Clear the matched marker when a pending package has no accepted match
/// and no unexpired pending offer left
fn reopen_if_unmatched(state: &mut State, package_id: Uuid, now: DateTime<Utc>) {
    let has_active = state.matches.values().any(|m| {
        m.package_id == package_id
            && (m.status == MatchStatus::Accepted
                || (m.status == MatchStatus::Pending && now < m.expires_at))
    });
    if has_active {
        return;
    }

    if let Some(package) = state.packages.get_mut(&package_id) {
        if package.status == PackageStatus::Pending && package.matched {
            package.matched = false;
            package.matched_at = None;
        }
    }
}
