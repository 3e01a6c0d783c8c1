//! HTTP API.
//!
//! | Route                                   | Purpose                         |
//! |-----------------------------------------|---------------------------------|
//! | `GET  /status`, `/api/status`           | service description             |
//! | `POST /batch-find`, `/api/find-emails`  | harvest a batch of domains      |
//! | `POST /download-csv`, `/api/download-csv` | CSV export of a prior batch   |

use anyhow::Context;
use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use mailsift_core::batch::BatchScheduler;
use mailsift_core::config::Settings;
use mailsift_core::error::HarvestError;
use mailsift_core::report::{BatchResponse, csv_filename, generate_csv_report};
use mailsift_scanner::DomainOutcome;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub const SERVICE_NAME: &str = "Mailsift API";

#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<BatchScheduler>,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    #[serde(default)]
    pub domains: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CsvRequest {
    #[serde(default)]
    pub results: Vec<DomainOutcome>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub reason: String,
    pub received: usize,
    pub max_domains: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusDocument {
    pub service: String,
    pub status: String,
    pub version: String,
    pub max_domains: usize,
    pub endpoints: BTreeMap<String, String>,
}

pub fn build_router(scheduler: Arc<BatchScheduler>) -> Router {
    let state = AppState { scheduler };

    Router::new()
        .route("/status", get(status))
        .route("/api/status", get(status))
        .route("/batch-find", post(batch_find))
        .route("/api/find-emails", post(batch_find))
        .route("/download-csv", post(download_csv))
        .route("/api/download-csv", post(download_csv))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(settings: Settings) -> anyhow::Result<()> {
    let scheduler = Arc::new(BatchScheduler::from_config(&settings.harvest)?);
    let app = build_router(scheduler);

    let addr = settings.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
}

async fn status(State(state): State<AppState>) -> Json<StatusDocument> {
    let endpoints = BTreeMap::from([
        (
            "/batch-find".to_string(),
            "POST - find contact addresses for a list of domains".to_string(),
        ),
        (
            "/download-csv".to_string(),
            "POST - export batch results as CSV".to_string(),
        ),
    ]);

    Json(StatusDocument {
        service: SERVICE_NAME.to_string(),
        status: "online".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        max_domains: state.scheduler.max_domains(),
        endpoints,
    })
}

async fn batch_find(State(state): State<AppState>, Json(request): Json<BatchRequest>) -> Response {
    let received = request.domains.len();
    info!("Batch request for {} domain(s)", received);

    match state.scheduler.run(&request.domains).await {
        Ok(result) => Json(BatchResponse::from(result)).into_response(),
        Err(e) => error_response(&e, received, state.scheduler.max_domains()),
    }
}

async fn download_csv(Json(request): Json<CsvRequest>) -> Response {
    let csv = generate_csv_report(&request.results);
    let filename = csv_filename(chrono::Utc::now().timestamp());

    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        csv,
    )
        .into_response()
}

fn error_response(error: &HarvestError, received: usize, max_domains: usize) -> Response {
    let status = if error.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    warn!("Batch request rejected: {}", error);

    let body = ErrorResponse {
        success: false,
        error: error.to_string(),
        reason: error.reason().to_string(),
        received,
        max_domains,
    };
    (status, Json(body)).into_response()
}
