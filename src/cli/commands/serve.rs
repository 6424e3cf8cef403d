//! HTTP API server for integration with other systems.
//!
//! Provides REST endpoints for movie search and recommendations.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{OutputMode, Settings};
use crate::data::MovieMetadata;
use crate::error::PlotlineError;
use crate::orchestrator::Orchestrator;
use crate::vector_store::MetadataFilter;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

/// Shared application state.
struct AppState {
    orchestrator: Orchestrator,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Query, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::connect(settings).await?;
    let app = router(orchestrator);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Plotline API Server");
    Output::success(&format!("Listening on http://{}", addr));
    eprintln!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Query", "POST /query");
    Output::kv("Search", "POST /search");
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(orchestrator: Orchestrator) -> Router {
    let state = Arc::new(AppState { orchestrator });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/query", post(query))
        .route("/search", post(search))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct QueryBody {
    query: String,
    #[serde(default)]
    k: Option<usize>,
    #[serde(default)]
    mode: Option<OutputMode>,
    #[serde(default)]
    filter: MetadataFilter,
}

#[derive(Deserialize)]
struct SearchBody {
    query: String,
    #[serde(default)]
    k: Option<usize>,
    #[serde(default)]
    filter: MetadataFilter,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<SearchHit>,
}

#[derive(Serialize)]
struct SearchHit {
    id: String,
    score: f32,
    plot: String,
    metadata: MovieMetadata,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(error: PlotlineError) -> Response {
    let status = match error {
        PlotlineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        warn!("Request failed: {}", error);
    }
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

/// Report a malformed request body as `{error}` with status 400.
fn body_or_error<T>(body: std::result::Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    body.map(|Json(body)| body).map_err(|rejection| {
        error_response(PlotlineError::InvalidInput(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    })
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn query(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<QueryBody>, JsonRejection>,
) -> Response {
    let body = match body_or_error(body) {
        Ok(body) => body,
        Err(response) => return response,
    };
    let request = state
        .orchestrator
        .request(&body.query, body.k, body.mode, body.filter);

    match state.orchestrator.query(&request).await {
        Ok(output) => Json(output).into_response(),
        Err(e) => error_response(e),
    }
}

async fn search(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<SearchBody>, JsonRejection>,
) -> Response {
    let body = match body_or_error(body) {
        Ok(body) => body,
        Err(response) => return response,
    };
    let request = state
        .orchestrator
        .request(&body.query, body.k, None, body.filter);

    match state.orchestrator.search(&request).await {
        Ok(results) => Json(SearchResponse {
            results: results
                .into_iter()
                .map(|r| SearchHit {
                    id: r.id,
                    score: r.score,
                    plot: r.document.text().to_string(),
                    metadata: r.document.metadata().clone(),
                })
                .collect(),
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}
