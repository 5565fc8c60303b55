use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::ScoredCandidate;

/// Response for the single-package candidate query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindCarriersResponse {
    #[serde(rename = "packageId")]
    pub package_id: Uuid,
    pub candidates: Vec<ScoredCandidate>,
    #[serde(rename = "totalCandidates")]
    pub total_candidates: usize,
}

/// Response for a completed auto-match batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResponse {
    #[serde(rename = "batchId")]
    pub batch_id: Uuid,
    #[serde(rename = "packagesProcessed")]
    pub packages_processed: u32,
    #[serde(rename = "matchesCreated")]
    pub matches_created: u32,
    #[serde(rename = "unableToMatch")]
    pub unable_to_match: Vec<Uuid>,
}

/// Feedback acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub recorded: bool,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
