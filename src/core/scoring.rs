use async_trait::async_trait;
use thiserror::Error;

use crate::core::filters::schedule_compatibility;
use crate::core::geo::{round2, route_deviation};
use crate::models::{Carrier, Dimensions, MatchEstimate, Package, VehicleCapacity};

/// Base compensation in currency units
const BASE_RATE: f64 = 50.0;
/// Compensation per kilometer of route deviation
const RATE_PER_DEVIATION_KM: f64 = 10.0;
/// Compensation per kilogram of package weight
const RATE_PER_KG: f64 = 5.0;

/// Errors from a score provider
#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("scoring unavailable: {0}")]
    Unavailable(String),

    #[error("scoring call timed out")]
    Timeout,
}

/// Pluggable match-quality estimator
///
/// Implementations must be deterministic for identical inputs so batch
/// re-runs stay idempotent. Callers bound every invocation with a timeout;
/// on failure the orchestrator falls back to the default heuristic for
/// that carrier only.
#[async_trait]
pub trait ScoreProvider: Send + Sync {
    async fn score(&self, package: &Package, carrier: &Carrier) -> Result<MatchEstimate, ScoreError>;
}

/// Weights for the heuristic scoring formula
///
/// A tunable policy, not a contract; the formula stays monotonic in each
/// feature's intuitive direction regardless of the weights chosen.
#[derive(Debug, Clone, Copy)]
pub struct ScoringWeights {
    pub deviation: f64,
    pub schedule: f64,
    pub fit: f64,
    pub rating: f64,
    pub on_time: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            deviation: 0.30,
            schedule: 0.25,
            fit: 0.20,
            rating: 0.15,
            on_time: 0.10,
        }
    }
}

/// Default/fallback score provider: a local weighted heuristic
#[derive(Debug, Clone, Default)]
pub struct HeuristicScorer {
    weights: ScoringWeights,
}

impl HeuristicScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    fn estimate(&self, package: &Package, carrier: &Carrier) -> Result<MatchEstimate, ScoreError> {
        let route = carrier.effective_route();
        let deviation = route_deviation(&route, package.pickup, package.delivery)
            .ok_or_else(|| ScoreError::Unavailable("carrier has no route or location".into()))?;

        let deviation_feature = deviation_score(deviation.distance_km);
        let overlap = schedule_compatibility(
            carrier.schedule(),
            package.pickup_window,
            package.delivery_window,
        );
        let fit = capacity_fit_score(&carrier.capacity(), &package.dimensions);
        let rating = (carrier.rating() / 5.0).clamp(0.0, 1.0);
        let on_time = carrier.on_time_rate().clamp(0.0, 1.0);

        let score = (deviation_feature * self.weights.deviation
            + overlap * self.weights.schedule
            + fit * self.weights.fit
            + rating * self.weights.rating
            + on_time * self.weights.on_time)
            .clamp(0.0, 1.0);

        Ok(MatchEstimate {
            match_score: score,
            compensation: compensation(package, deviation.distance_km),
            deviation,
        })
    }
}

#[async_trait]
impl ScoreProvider for HeuristicScorer {
    async fn score(&self, package: &Package, carrier: &Carrier) -> Result<MatchEstimate, ScoreError> {
        self.estimate(package, carrier)
    }
}

/// Deviation feature in (0,1]: exponential decay, closer is higher
#[inline]
fn deviation_score(deviation_km: f64) -> f64 {
    (-deviation_km / 10.0).exp()
}

/// Dimensional-fit efficiency in [0,1]
///
/// Packages using 10-50% of vehicle capacity score best, centered on 30%
/// utilization; anything that physically fits scores at least 0.1.
pub fn capacity_fit_score(capacity: &VehicleCapacity, dims: &Dimensions) -> f64 {
    if !capacity.fits(dims) {
        return 0.0;
    }

    let volume_ratio = dims.volume() / capacity.volume();
    let weight_ratio = dims.weight / capacity.weight_limit;
    let utilization = volume_ratio.max(weight_ratio);

    let efficiency = 1.0 - (0.3 - utilization).abs();
    efficiency.max(0.1)
}

/// Carrier compensation policy, reproduced numerically for compatibility:
/// `base(50) + deviation_km*10 + weight_kg*5 + urgency premium`, 2-dp.
pub fn compensation(package: &Package, deviation_km: f64) -> f64 {
    round2(
        BASE_RATE
            + deviation_km * RATE_PER_DEVIATION_KM
            + package.dimensions.weight * RATE_PER_KG
            + package.urgency.premium(),
    )
}

/// Platform fee as a rate on compensation, 2-dp
pub fn platform_fee(compensation: f64, rate: f64) -> f64 {
    round2(compensation * rate)
}
