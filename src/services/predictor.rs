use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::feedback::{ScorerTrainer, TrainerError};
use crate::core::scoring::{ScoreError, ScoreProvider};
use crate::models::{Carrier, MatchEstimate, Package, RouteDeviation};

/// Client for the external match-prediction service
///
/// A scored pair comes back as `{matchScore, compensation,
/// routeDeviation}`, so any model service speaking that contract is a
/// drop-in scorer. The caller wraps every score call in its own timeout
/// on top of the client-level one here.
pub struct PredictionClient {
    base_url: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    package: &'a Package,
    carrier: &'a Carrier,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(rename = "matchScore")]
    match_score: Option<f64>,
    compensation: Option<f64>,
    #[serde(rename = "routeDeviation")]
    route_deviation: Option<RouteDeviation>,
    error: Option<String>,
}

impl PredictionClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, ScoreError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScoreError::Unavailable(e.to_string()))?;

        Ok(Self { base_url, client })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl ScoreProvider for PredictionClient {
    async fn score(&self, package: &Package, carrier: &Carrier) -> Result<MatchEstimate, ScoreError> {
        let url = self.endpoint("predict");

        let response = self
            .client
            .post(&url)
            .json(&PredictRequest { package, carrier })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ScoreError::Timeout
                } else {
                    ScoreError::Unavailable(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(ScoreError::Unavailable(format!(
                "prediction service returned {}",
                response.status()
            )));
        }

        let body: PredictResponse = response
            .json()
            .await
            .map_err(|e| ScoreError::Unavailable(format!("bad prediction response: {}", e)))?;

        if let Some(error) = body.error {
            return Err(ScoreError::Unavailable(error));
        }

        match (body.match_score, body.compensation, body.route_deviation) {
            (Some(score), Some(compensation), Some(deviation)) => Ok(MatchEstimate {
                match_score: score.clamp(0.0, 1.0),
                compensation: compensation.max(0.0),
                deviation,
            }),
            _ => Err(ScoreError::Unavailable(
                "prediction response missing fields".to_string(),
            )),
        }
    }
}

#[async_trait]
impl ScorerTrainer for PredictionClient {
    /// Ask the prediction service to retrain on accumulated feedback
    async fn request_refresh(&self) -> Result<(), TrainerError> {
        let url = self.endpoint("train");

        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| TrainerError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TrainerError::Request(format!(
                "training service returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}
