use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::analyze::{self, AnalysisError};
use crate::gemini::GeminiClient;
use crate::models::{AdInsightsRequest, AnalyzeRequest, HealthResponse};
use crate::store::FirestoreClient;

pub const SERVICE_NAME: &str = "ad-insights-api";

// ── Shared state ─────────────────────────────────────────────────────────────

/// Clients constructed once at startup and injected into every handler.
pub struct AppState {
    pub http: reqwest::Client,
    pub gemini: GeminiClient,
    /// Document store, when credentials are configured. No routed endpoint
    /// uses it; it is held here for callers added later.
    pub store: Option<FirestoreClient>,
}

// ── Router ───────────────────────────────────────────────────────────────────

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/gemini/analyze", post(analyze_handler))
        .route("/api/gemini/get_ad_insights", post(ad_insights_handler))
        .route("/api/gemini/health", get(health))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn root() -> impl IntoResponse {
    Json(json!({"message": "Navigate to /api/gemini/health for service status."}))
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> Response {
    tracing::info!(image_url = %req.image_url, brand_id = ?req.brand_id, "analyze request");
    let prompt = analyze::select_prompt(req.prompt.as_deref());
    match analyze::analyze_image(&state.http, &state.gemini, &req.image_url, prompt).await {
        Ok(details) => {
            tracing::info!("image analysis completed successfully");
            (StatusCode::OK, Json(Value::Object(details))).into_response()
        }
        Err(e) => error_response(e),
    }
}

async fn ad_insights_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AdInsightsRequest>,
) -> Response {
    tracing::info!(image_url = %req.image_url, brand_id = ?req.brand_id, "ad insights request");
    match analyze::get_ad_details(&state.http, &state.gemini, &req.image_url, req.brand_id).await
    {
        Ok(details) => {
            tracing::info!("image analysis completed successfully");
            (StatusCode::OK, Json(Value::Object(details))).into_response()
        }
        Err(e) => error_response(e),
    }
}

// ── Error mapping ────────────────────────────────────────────────────────────

/// The single place where error kinds become HTTP statuses.
fn error_response(error: AnalysisError) -> Response {
    tracing::error!("analysis failed: {}", error);
    let status = match &error {
        AnalysisError::InvalidUrl(_) | AnalysisError::DownloadFailed(_) => {
            StatusCode::BAD_REQUEST
        }
        AnalysisError::MalformedModelResponse | AnalysisError::Upstream(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(json!({"detail": error.to_string()}))).into_response()
}
