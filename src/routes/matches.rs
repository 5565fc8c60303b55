use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::core::{BatchConfig, EngineError, FeedbackRecorder, MatchEngine};
use crate::models::{
    BatchResponse, ErrorResponse, FeedbackRequest, FeedbackResponse, FindCarriersRequest,
    FindCarriersResponse, HealthResponse, MatchStatus, RunBatchRequest, UpdateMatchRequest,
};
use crate::services::MatchStore;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: MatchEngine,
    pub feedback: Arc<FeedbackRecorder>,
    pub store: Arc<dyn MatchStore>,
}

/// Configure all match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/matches/find", web::post().to(find_carriers))
        .route("/matches/batch", web::post().to(run_batch))
        .route("/matches/feedback", web::post().to(record_feedback))
        .route("/matches/{id}", web::get().to(get_match))
        .route("/matches/{id}/status", web::post().to(update_match));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let store_healthy = state.store.health_check().await.unwrap_or(false);
    let status = if store_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    })
}

/// On-demand candidate query for one package
///
/// POST /api/v1/matches/find
async fn find_carriers(
    state: web::Data<AppState>,
    req: web::Json<FindCarriersRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    let policy = state.engine.policy();
    let radius_km = req.radius_km.unwrap_or(policy.search_radius_km);
    let max_carriers = req
        .max_carriers
        .map(usize::from)
        .unwrap_or(policy.max_carriers_per_package);

    tracing::info!(
        "finding carriers for package {} (radius {}km, max {})",
        req.package_id,
        radius_km,
        max_carriers
    );

    match state
        .engine
        .find_optimal_carriers(req.package_id, radius_km, max_carriers)
        .await
    {
        Ok(candidates) => {
            let total = candidates.len();
            HttpResponse::Ok().json(FindCarriersResponse {
                package_id: req.package_id,
                candidates,
                total_candidates: total,
            })
        }
        Err(e) => engine_error_response(e),
    }
}

/// Trigger one auto-match batch run
///
/// POST /api/v1/matches/batch
async fn run_batch(state: web::Data<AppState>, req: web::Json<RunBatchRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    let policy = state.engine.policy();
    let config = BatchConfig {
        radius_km: req.radius_km.unwrap_or(policy.search_radius_km),
        max_carriers_per_package: req
            .max_carriers_per_package
            .map(usize::from)
            .unwrap_or(policy.max_carriers_per_package),
        package_limit: req.package_limit.map(|l| l as usize).unwrap_or(100),
    };

    match state.engine.run_auto_match_batch(config).await {
        Ok(result) => HttpResponse::Ok().json(BatchResponse {
            batch_id: result.batch_id,
            packages_processed: result.packages_processed,
            matches_created: result.matches_created,
            unable_to_match: result.unable_to_match,
        }),
        Err(e) => {
            tracing::error!("batch run failed: {}", e);
            engine_error_response(e)
        }
    }
}

/// Record feedback for a resolved match
///
/// POST /api/v1/matches/feedback
async fn record_feedback(
    state: web::Data<AppState>,
    req: web::Json<FeedbackRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    match state
        .feedback
        .record(req.match_id, req.success, &req.feedback, req.rating)
        .await
    {
        Ok(()) => HttpResponse::Ok().json(FeedbackResponse { recorded: true }),
        Err(e) => engine_error_response(e),
    }
}

/// Fetch one match record
///
/// GET /api/v1/matches/{id}
async fn get_match(state: web::Data<AppState>, path: web::Path<Uuid>) -> impl Responder {
    let id = path.into_inner();

    match state.store.get_match(id).await {
        Ok(m) => HttpResponse::Ok().json(m),
        Err(crate::services::StoreError::NotFound(msg)) => {
            HttpResponse::NotFound().json(ErrorResponse {
                error: "not_found".to_string(),
                message: msg,
                status_code: 404,
            })
        }
        Err(e) => {
            tracing::error!("failed to fetch match {}: {}", id, e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "store_error".to_string(),
                message: e.to_string(),
                status_code: 500,
            })
        }
    }
}

/// Apply an external lifecycle transition to a match
///
/// POST /api/v1/matches/{id}/status
async fn update_match(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    req: web::Json<UpdateMatchRequest>,
) -> impl Responder {
    let id = path.into_inner();

    let status = match req.status.to_lowercase().as_str() {
        "accepted" => MatchStatus::Accepted,
        "rejected" => MatchStatus::Rejected,
        "expired" => MatchStatus::Expired,
        "cancelled" => MatchStatus::Cancelled,
        "completed" => MatchStatus::Completed,
        other => {
            return HttpResponse::BadRequest().json(ErrorResponse {
                error: "invalid_status".to_string(),
                message: format!(
                    "status '{}' must be one of: accepted, rejected, expired, cancelled, completed",
                    other
                ),
                status_code: 400,
            });
        }
    };

    // Carrier responses carry a response timestamp; bookkeeping transitions don't
    let responded_at = match status {
        MatchStatus::Accepted | MatchStatus::Rejected => Some(Utc::now()),
        _ => None,
    };

    match state.store.update_match_status(id, status, responded_at).await {
        Ok(()) => match state.store.get_match(id).await {
            Ok(m) => HttpResponse::Ok().json(m),
            Err(e) => {
                tracing::error!("match {} updated but fetch failed: {}", id, e);
                HttpResponse::Ok().json(serde_json::json!({ "id": id, "status": req.status }))
            }
        },
        Err(crate::services::StoreError::NotFound(msg)) => {
            HttpResponse::NotFound().json(ErrorResponse {
                error: "not_found".to_string(),
                message: msg,
                status_code: 404,
            })
        }
        Err(e) => {
            tracing::error!("failed to update match {}: {}", id, e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "store_error".to_string(),
                message: e.to_string(),
                status_code: 500,
            })
        }
    }
}

fn validation_failed(errors: validator::ValidationErrors) -> HttpResponse {
    tracing::info!("request validation failed: {:?}", errors);
    HttpResponse::BadRequest().json(ErrorResponse {
        error: "validation_failed".to_string(),
        message: errors.to_string(),
        status_code: 400,
    })
}

fn engine_error_response(err: EngineError) -> HttpResponse {
    match err {
        EngineError::Validation(msg) => HttpResponse::BadRequest().json(ErrorResponse {
            error: "validation_failed".to_string(),
            message: msg,
            status_code: 400,
        }),
        EngineError::NotFound(msg) => HttpResponse::NotFound().json(ErrorResponse {
            error: "not_found".to_string(),
            message: msg,
            status_code: 404,
        }),
        EngineError::ScoringUnavailable(msg) => {
            HttpResponse::ServiceUnavailable().json(ErrorResponse {
                error: "scoring_unavailable".to_string(),
                message: msg,
                status_code: 503,
            })
        }
        EngineError::Conflict(msg) => HttpResponse::Conflict().json(ErrorResponse {
            error: "conflict".to_string(),
            message: msg,
            status_code: 409,
        }),
        EngineError::Store(e) => HttpResponse::InternalServerError().json(ErrorResponse {
            error: "store_error".to_string(),
            message: e.to_string(),
            status_code: 500,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_shape() {
        let response = HealthResponse {
            status: "healthy".to_string(),
            version: "0.1.0".to_string(),
            timestamp: Utc::now(),
        };

        assert_eq!(response.status, "healthy");
    }

    #[test]
    fn test_engine_error_status_codes() {
        let resp = engine_error_response(EngineError::Validation("bad".into()));
        assert_eq!(resp.status().as_u16(), 400);

        let resp = engine_error_response(EngineError::NotFound("missing".into()));
        assert_eq!(resp.status().as_u16(), 404);

        let resp = engine_error_response(EngineError::ScoringUnavailable("down".into()));
        assert_eq!(resp.status().as_u16(), 503);
    }
}
