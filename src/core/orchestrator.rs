use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::core::error::EngineError;
use crate::core::filters::{filter_carriers, EligibleCarrier};
use crate::core::geo::is_valid_coordinate;
use crate::core::ranker::rank;
use crate::core::scoring::{platform_fee, HeuristicScorer, ScoreProvider};
use crate::models::{
    AutoMatchBatch, BatchStatus, Carrier, Match, MatchStatus, Package, ScoredCandidate,
};
use crate::services::store::MatchStore;

/// Engine-wide matching policy
#[derive(Debug, Clone)]
pub struct MatchingPolicy {
    /// Default carrier search radius around the package pickup
    pub search_radius_km: f64,
    /// Match offers created per package (top-N of the ranking)
    pub max_carriers_per_package: usize,
    /// Offer lifetime; `expires_at = created_at + offer_window`
    pub offer_window_hours: i64,
    /// Per-call budget for the external score provider
    pub score_timeout: Duration,
    /// Concurrent package attempts within one batch
    pub batch_concurrency: usize,
    /// Platform fee as a rate on carrier compensation
    pub platform_fee_rate: f64,
}

impl Default for MatchingPolicy {
    fn default() -> Self {
        Self {
            search_radius_km: 10.0,
            max_carriers_per_package: 5,
            offer_window_hours: 4,
            score_timeout: Duration::from_secs(3),
            batch_concurrency: 8,
            platform_fee_rate: 0.15,
        }
    }
}

/// Per-run overrides for one auto-match batch
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub radius_km: f64,
    pub max_carriers_per_package: usize,
    pub package_limit: usize,
}

/// Outcome of one auto-match batch run
///
/// A non-empty `unable_to_match` list is the expected steady state, not a
/// failure; those packages stay pending and eligible for future runs.
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub batch_id: Uuid,
    pub packages_processed: u32,
    pub matches_created: u32,
    pub unable_to_match: Vec<Uuid>,
}

/// Cooperative cancellation handle for a running batch
///
/// Cancelling halts intake of new packages; in-flight attempts finish or
/// fail cleanly.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

enum AttemptOutcome {
    Matched(u32),
    Unable,
    /// Claim lost to a concurrent run; the package stays eligible elsewhere
    Skipped,
}

/// The batch driver: discovery, filtering, scoring, ranking, persistence
///
/// Dependencies are explicit constructor arguments; there is no ambient
/// global state and lifecycle is caller-controlled.
#[derive(Clone)]
pub struct MatchEngine {
    store: Arc<dyn MatchStore>,
    scorer: Arc<dyn ScoreProvider>,
    fallback: HeuristicScorer,
    policy: MatchingPolicy,
}

impl MatchEngine {
    pub fn new(
        store: Arc<dyn MatchStore>,
        scorer: Arc<dyn ScoreProvider>,
        policy: MatchingPolicy,
    ) -> Self {
        Self {
            store,
            scorer,
            fallback: HeuristicScorer::default(),
            policy,
        }
    }

    pub fn policy(&self) -> &MatchingPolicy {
        &self.policy
    }

    /// On-demand single-package candidate query
    ///
    /// Returns ranked candidates without creating any match records.
    pub async fn find_optimal_carriers(
        &self,
        package_id: Uuid,
        radius_km: f64,
        max_carriers: usize,
    ) -> Result<Vec<ScoredCandidate>, EngineError> {
        if radius_km <= 0.0 {
            return Err(EngineError::Validation("radius must be positive".into()));
        }

        let package = self.store.get_package(package_id).await.map_err(not_found)?;
        validate_package(&package)?;

        let carriers = self.store.get_active_carriers().await?;
        let eligible = filter_carriers(&package, &carriers, radius_km);

        tracing::debug!(
            "package {}: {} of {} carriers eligible within {}km",
            package_id,
            eligible.len(),
            carriers.len(),
            radius_km
        );

        let candidates = self.score_candidates(&package, eligible).await;
        Ok(rank(candidates, max_carriers))
    }

    /// Run one auto-match batch over the pending backlog
    pub async fn run_auto_match_batch(&self, config: BatchConfig) -> Result<BatchResult, EngineError> {
        self.run_auto_match_batch_with_cancel(config, CancelToken::new())
            .await
    }

    /// Batch run with a caller-held cancellation token
    ///
    /// Only infrastructure failures at batch start are fatal; per-package
    /// failures are isolated into `unable_to_match`.
    pub async fn run_auto_match_batch_with_cancel(
        &self,
        config: BatchConfig,
        cancel: CancelToken,
    ) -> Result<BatchResult, EngineError> {
        let batch_id = Uuid::new_v4();
        let started_at = Utc::now();

        tracing::info!(
            "batch {} starting (radius {}km, top {}, limit {})",
            batch_id,
            config.radius_km,
            config.max_carriers_per_package,
            config.package_limit
        );

        let mut batch = AutoMatchBatch {
            id: batch_id,
            status: BatchStatus::Running,
            started_at,
            finished_at: None,
            packages_processed: 0,
            matches_created: 0,
            unable_to_match: vec![],
        };
        self.store.save_batch(&batch).await?;

        // Lapsed offers are swept first so their packages rejoin the
        // backlog this run picks up
        match self.store.expire_stale_matches(started_at).await {
            Ok(0) => {}
            Ok(expired) => {
                tracing::info!("batch {}: expired {} stale offers", batch_id, expired);
            }
            Err(e) => return self.fail_batch(batch, e).await,
        }

        // The sweep, the backlog pull and the carrier pull are the only
        // fatal stages
        let pending = match self.store.get_pending_packages(config.package_limit).await {
            Ok(p) => p,
            Err(e) => return self.fail_batch(batch, e).await,
        };
        let carriers = match self.store.get_active_carriers().await {
            Ok(c) => Arc::new(c),
            Err(e) => return self.fail_batch(batch, e).await,
        };

        tracing::info!(
            "batch {}: {} pending packages, {} active carriers",
            batch_id,
            pending.len(),
            carriers.len()
        );

        let semaphore = Arc::new(Semaphore::new(self.policy.batch_concurrency.max(1)));
        let mut tasks: JoinSet<(Uuid, AttemptOutcome)> = JoinSet::new();

        for package in pending {
            // Cancellation stops intake; in-flight attempts run to completion
            if cancel.is_cancelled() {
                tracing::info!("batch {} cancelled, halting package intake", batch_id);
                break;
            }

            let permit = match semaphore.clone().acquire_owned().await {
                Ok(p) => p,
                Err(_) => break,
            };

            let engine = self.clone();
            let carriers = carriers.clone();
            let config = config.clone();
            tasks.spawn(async move {
                let _permit = permit;
                let id = package.id;
                let outcome = engine.attempt_package(package, &carriers, &config).await;
                (id, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, AttemptOutcome::Matched(count))) => {
                    batch.packages_processed += 1;
                    batch.matches_created += count;
                }
                Ok((package_id, AttemptOutcome::Unable)) => {
                    batch.packages_processed += 1;
                    batch.unable_to_match.push(package_id);
                }
                Ok((_, AttemptOutcome::Skipped)) => {}
                Err(e) => {
                    tracing::error!("batch {}: package task panicked: {}", batch_id, e);
                }
            }
        }

        batch.status = BatchStatus::Completed;
        batch.finished_at = Some(Utc::now());
        if let Err(e) = self.store.save_batch(&batch).await {
            tracing::warn!("batch {}: failed to persist batch record: {}", batch_id, e);
        }

        tracing::info!(
            "batch {} completed: {} processed, {} matches, {} unmatched",
            batch_id,
            batch.packages_processed,
            batch.matches_created,
            batch.unable_to_match.len()
        );

        Ok(BatchResult {
            batch_id,
            packages_processed: batch.packages_processed,
            matches_created: batch.matches_created,
            unable_to_match: batch.unable_to_match,
        })
    }

    async fn fail_batch(
        &self,
        mut batch: AutoMatchBatch,
        err: crate::services::store::StoreError,
    ) -> Result<BatchResult, EngineError> {
        tracing::error!("batch {} failed at start: {}", batch.id, err);
        batch.status = BatchStatus::Failed;
        batch.finished_at = Some(Utc::now());
        if let Err(save_err) = self.store.save_batch(&batch).await {
            tracing::warn!("batch {}: failed to record failure: {}", batch.id, save_err);
        }
        Err(EngineError::Store(err))
    }

    /// One package's attempt: claim, filter, score, rank, persist
    async fn attempt_package(
        &self,
        package: Package,
        carriers: &[Carrier],
        config: &BatchConfig,
    ) -> AttemptOutcome {
        let package_id = package.id;

        match self.store.claim_package(package_id).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!("package {} claimed by another run, skipping", package_id);
                return AttemptOutcome::Skipped;
            }
            Err(e) => {
                tracing::warn!("package {}: claim failed: {}", package_id, e);
                return AttemptOutcome::Unable;
            }
        }

        match self.match_one(&package, carriers, config).await {
            Ok(0) => {
                self.release_claim(package_id).await;
                AttemptOutcome::Unable
            }
            Ok(count) => AttemptOutcome::Matched(count),
            Err(e) => {
                tracing::warn!("package {}: matching attempt failed: {}", package_id, e);
                self.release_claim(package_id).await;
                AttemptOutcome::Unable
            }
        }
    }

    /// Returns the number of matches created (0 = no eligible carriers)
    async fn match_one(
        &self,
        package: &Package,
        carriers: &[Carrier],
        config: &BatchConfig,
    ) -> Result<u32, EngineError> {
        validate_package(package)?;

        let eligible = filter_carriers(package, carriers, config.radius_km);
        if eligible.is_empty() {
            tracing::debug!("package {}: no eligible carriers", package.id);
            return Ok(0);
        }

        let candidates = self.score_candidates(package, eligible).await;
        let ranked = rank(candidates, config.max_carriers_per_package);
        if ranked.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let expires_at = now + chrono::Duration::hours(self.policy.offer_window_hours);
        let mut created = 0u32;

        for candidate in &ranked {
            let offer = Match {
                id: Uuid::new_v4(),
                package_id: package.id,
                carrier_id: candidate.carrier_id,
                score: candidate.match_score,
                deviation_km: candidate.deviation.distance_km,
                deviation_minutes: candidate.deviation.minutes,
                payout: candidate.compensation,
                platform_fee: platform_fee(candidate.compensation, self.policy.platform_fee_rate),
                status: MatchStatus::Pending,
                created_at: now,
                expires_at,
                responded_at: None,
                pickup_code: generate_code(),
                delivery_code: generate_code(),
            };
            self.store.create_match(&offer).await?;
            created += 1;
        }

        self.store.mark_package_matched(package.id, now).await?;

        tracing::info!(
            "package {}: created {} match offers (best score {:.3})",
            package.id,
            created,
            ranked[0].match_score
        );

        Ok(created)
    }

    /// Score eligible carriers concurrently (fan-out/fan-in)
    ///
    /// Each call is bounded by the policy timeout; a timed-out or failed
    /// call falls back to the local heuristic for that carrier only. A
    /// carrier is dropped only if the fallback itself fails.
    async fn score_candidates(
        &self,
        package: &Package,
        eligible: Vec<EligibleCarrier>,
    ) -> Vec<ScoredCandidate> {
        let mut tasks: JoinSet<Option<ScoredCandidate>> = JoinSet::new();

        for entry in eligible {
            let scorer = self.scorer.clone();
            let fallback = self.fallback.clone();
            let package = package.clone();
            let timeout = self.policy.score_timeout;

            tasks.spawn(async move {
                let carrier = entry.carrier;
                let estimate = match tokio::time::timeout(timeout, scorer.score(&package, &carrier)).await {
                    Ok(Ok(estimate)) => Some(estimate),
                    Ok(Err(e)) => {
                        tracing::debug!("carrier {}: scorer failed ({}), using heuristic", carrier.id, e);
                        fallback.score(&package, &carrier).await.ok()
                    }
                    Err(_) => {
                        tracing::debug!("carrier {}: scorer timed out, using heuristic", carrier.id);
                        fallback.score(&package, &carrier).await.ok()
                    }
                };

                estimate.map(|est| ScoredCandidate {
                    carrier_id: carrier.id,
                    match_score: est.match_score.clamp(0.0, 1.0),
                    compensation: est.compensation.max(0.0),
                    deviation: est.deviation,
                    schedule_overlap: entry.schedule_overlap,
                    carrier_rating: carrier.rating(),
                })
            });
        }

        let mut candidates = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            if let Ok(Some(candidate)) = joined {
                candidates.push(candidate);
            }
        }
        candidates
    }

    async fn release_claim(&self, package_id: Uuid) {
        if let Err(e) = self.store.release_package(package_id).await {
            tracing::warn!("package {}: failed to release claim: {}", package_id, e);
        }
    }
}

fn validate_package(package: &Package) -> Result<(), EngineError> {
    if !is_valid_coordinate(package.pickup.lat, package.pickup.lon)
        || !is_valid_coordinate(package.delivery.lat, package.delivery.lon)
    {
        return Err(EngineError::Validation(format!(
            "package {} has invalid coordinates",
            package.id
        )));
    }
    Ok(())
}

/// 6-digit numeric verification code, best-effort uniqueness per match
fn generate_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000u32))
}

fn not_found(err: crate::services::store::StoreError) -> EngineError {
    match err {
        crate::services::store::StoreError::NotFound(msg) => EngineError::NotFound(msg),
        other => EngineError::Store(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_codes_are_six_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());

        let clone = token.clone();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_default_policy() {
        let policy = MatchingPolicy::default();
        assert_eq!(policy.max_carriers_per_package, 5);
        assert_eq!(policy.offer_window_hours, 4);
        assert_eq!(policy.platform_fee_rate, 0.15);
    }
}
