// Core engine exports
pub mod error;
pub mod feedback;
pub mod filters;
pub mod geo;
pub mod orchestrator;
pub mod ranker;
pub mod scoring;

pub use error::EngineError;
pub use feedback::{FeedbackRecorder, NoopTrainer, ScorerTrainer, TrainerError};
pub use filters::{filter_carriers, schedule_compatibility, window_overlap_ratio, EligibleCarrier};
pub use geo::{distance_km, is_valid_coordinate, route_deviation};
pub use orchestrator::{BatchConfig, BatchResult, CancelToken, MatchEngine, MatchingPolicy};
pub use ranker::rank;
pub use scoring::{
    capacity_fit_score, compensation, platform_fee, HeuristicScorer, ScoreError, ScoreProvider,
    ScoringWeights,
};
