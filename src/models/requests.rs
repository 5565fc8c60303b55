use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Request for an on-demand single-package candidate query
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FindCarriersRequest {
    #[serde(alias = "package_id", rename = "packageId")]
    pub package_id: Uuid,
    #[validate(range(min = 0.1, max = 500.0))]
    #[serde(alias = "radius_km", rename = "radiusKm")]
    pub radius_km: Option<f64>,
    #[validate(range(min = 1, max = 50))]
    #[serde(alias = "max_carriers", rename = "maxCarriers")]
    pub max_carriers: Option<u16>,
}

/// Request to trigger one auto-match batch run
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct RunBatchRequest {
    #[validate(range(min = 0.1, max = 500.0))]
    #[serde(alias = "radius_km", rename = "radiusKm")]
    pub radius_km: Option<f64>,
    #[validate(range(min = 1, max = 50))]
    #[serde(alias = "max_carriers_per_package", rename = "maxCarriersPerPackage")]
    pub max_carriers_per_package: Option<u16>,
    #[validate(range(min = 1, max = 10000))]
    #[serde(alias = "package_limit", rename = "packageLimit")]
    pub package_limit: Option<u32>,
}

/// Request to record resolved-match feedback
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FeedbackRequest {
    #[serde(alias = "match_id", rename = "matchId")]
    pub match_id: Uuid,
    pub success: bool,
    #[serde(default)]
    pub feedback: String,
    #[validate(range(min = 0.0, max = 5.0))]
    #[serde(default)]
    pub rating: Option<f64>,
}

/// Request to update a match's lifecycle status (external transitions)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateMatchRequest {
    #[validate(length(min = 1))]
    pub status: String,
}
