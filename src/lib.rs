//! Courier Algo - carrier-package matching engine for the Courier
//! crowdsourced delivery platform
//!
//! Given a package awaiting pickup, the engine discovers carriers who can
//! plausibly detour to fulfill it, filters them by radius, capacity and
//! schedule, scores and ranks the survivors, and emits time-bounded match
//! offers with verification codes. An auto-match batch runs the same
//! pipeline unattended over the whole pending backlog.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{
    distance_km, filter_carriers, is_valid_coordinate, rank, route_deviation, BatchConfig,
    BatchResult, CancelToken, EngineError, FeedbackRecorder, HeuristicScorer, MatchEngine,
    MatchingPolicy, ScoreProvider, ScoringWeights,
};
pub use models::{AutoMatchBatch, Carrier, Coordinate, Match, Package, ScoredCandidate};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let a = Coordinate::new(40.7128, -74.0060);
        let b = Coordinate::new(40.7130, -74.0062);
        assert!(distance_km(a, b) < 1.0);
    }
}
