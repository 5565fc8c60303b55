// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    AutoMatchBatch, BatchStatus, Carrier, Coordinate, DailyWindow, Dimensions, Match,
    MatchEstimate, MatchStatus, Package, PackageStatus, RouteDeviation, ScoredCandidate,
    TimeWindow, Urgency, VehicleCapacity,
};
pub use requests::{FeedbackRequest, FindCarriersRequest, RunBatchRequest, UpdateMatchRequest};
pub use responses::{
    BatchResponse, ErrorResponse, FeedbackResponse, FindCarriersResponse, HealthResponse,
};
