mod config;
mod core;
mod models;
mod routes;
mod services;

use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use config::Settings;
use core::{
    FeedbackRecorder, HeuristicScorer, MatchEngine, MatchingPolicy, NoopTrainer, ScoreProvider,
    ScorerTrainer, ScoringWeights,
};
use routes::matches::AppState;
use services::{MatchStore, PostgresStore, PredictionClient};

/// JSON error response for payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .content_type("application/json")
            .body(serde_json::to_string(self).unwrap_or_default())
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Initialize logging
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let subscriber = tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }

    info!("Starting Courier Algo matching service...");

    // Load configuration
    let settings = Settings::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    })?;

    info!("Configuration loaded successfully");

    // Initialize the persistence adapter
    let store: Arc<dyn MatchStore> = Arc::new(
        PostgresStore::from_settings(
            &settings.database.url,
            settings.database.max_connections,
            settings.database.min_connections,
        )
        .await
        .map_err(|e| {
            error!("Failed to connect to PostgreSQL: {}", e);
            std::io::Error::other(e.to_string())
        })?,
    );

    info!("PostgreSQL store initialized");

    // Wire the score provider: remote prediction service when configured,
    // local heuristic otherwise
    let weights = ScoringWeights {
        deviation: settings.scoring.weights.deviation,
        schedule: settings.scoring.weights.schedule,
        fit: settings.scoring.weights.fit,
        rating: settings.scoring.weights.rating,
        on_time: settings.scoring.weights.on_time,
    };

    let score_timeout = Duration::from_secs(settings.scoring.timeout_secs);
    let (scorer, trainer): (Arc<dyn ScoreProvider>, Arc<dyn ScorerTrainer>) =
        match &settings.scoring.predictor_url {
            Some(url) => {
                let client = Arc::new(
                    PredictionClient::new(url.clone(), score_timeout).map_err(|e| {
                        error!("Failed to build prediction client: {}", e);
                        std::io::Error::other(e.to_string())
                    })?,
                );
                info!("Using remote prediction service at {}", url);
                (client.clone(), client)
            }
            None => {
                info!("Using local heuristic scorer with weights: {:?}", weights);
                (Arc::new(HeuristicScorer::new(weights)), Arc::new(NoopTrainer))
            }
        };

    let policy = MatchingPolicy {
        search_radius_km: settings.matching.search_radius_km,
        max_carriers_per_package: settings.matching.max_carriers_per_package,
        offer_window_hours: settings.matching.offer_window_hours,
        score_timeout,
        batch_concurrency: settings.matching.batch_concurrency,
        platform_fee_rate: settings.scoring.platform_fee_rate,
    };

    let engine = MatchEngine::new(store.clone(), scorer, policy);
    let feedback = Arc::new(FeedbackRecorder::new(
        store.clone(),
        trainer,
        settings.feedback.refresh_every,
    ));

    info!("Match engine initialized");

    // Build application state
    let app_state = AppState {
        engine,
        feedback,
        store,
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
