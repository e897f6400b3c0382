//! HTTP routes for the textlens server.
//!
//! Provides the HTML form flow, the JSON analysis API and health checks.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Form, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use textlens_common::config::DisplayConfig;
use textlens_common::Error;

use crate::aggregate::{Aggregator, ValidationError};
use crate::curate::CuratedView;
use crate::model::{AggregatedResult, FeatureSet};
use crate::render::{IndexPage, PageRenderer};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Aggregator,
    pub renderer: Arc<PageRenderer>,
    /// Features run when a request does not choose its own
    pub features: FeatureSet,
    pub display: Arc<DisplayConfig>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Request/Response Types
// ─────────────────────────────────────────────────────────────────────────────

/// Form submission from the index page.
#[derive(Debug, Deserialize)]
pub struct AnalyzeForm {
    #[serde(default)]
    pub text: String,
}

/// JSON analysis request.
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub text: String,
    /// Feature names; the configured set when omitted
    #[serde(default)]
    pub features: Option<Vec<String>>,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub service: String,
}

/// Error surfaced from a page handler.
#[derive(Debug)]
pub struct AppError(Error);

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.0, "Request failed");
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, self.0.to_string()).into_response()
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(code: &str, error: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: error.into(),
            code: code.into(),
        }),
    )
}

/// Body that did not decode as an [`AnalyzeRequest`]. Keeps axum's status
/// (400 syntax, 415 content type, 422 shape) in the API error shape.
fn invalid_json(rejection: JsonRejection) -> ApiError {
    (
        rejection.status(),
        Json(ErrorResponse {
            error: rejection.body_text(),
            code: "invalid_json".into(),
        }),
    )
}

const fn validation_code(err: &ValidationError) -> &'static str {
    match err {
        ValidationError::Empty => "empty_text",
        ValidationError::TooLong { .. } => "text_too_long",
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Router Builders
// ─────────────────────────────────────────────────────────────────────────────

/// Build every route over `state`.
pub fn build_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/analyze", post(analyze_form_handler))
        .route("/api/v1/analyze", post(analyze_api_handler))
        .with_state(state)
        .merge(health_routes())
}

/// Build health check routes.
pub fn health_routes() -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/health", get(health_handler))
}

// ─────────────────────────────────────────────────────────────────────────────
// Page Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn index_handler(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let page = IndexPage::empty(state.aggregator.char_limit());
    Ok(Html(state.renderer.render_index(&page)?))
}

/// Form flow. Input problems are shown on the page, not as HTTP errors.
async fn analyze_form_handler(
    State(state): State<AppState>,
    Form(form): Form<AnalyzeForm>,
) -> Result<Html<String>, AppError> {
    let text = form.text.trim();
    let limit = state.aggregator.char_limit();

    let page = match state.aggregator.analyze(text, &state.features).await {
        Ok(result) => {
            let view = CuratedView::from_result(&result, &state.display);
            IndexPage::with_result(text, limit, view)
        }
        Err(err) => {
            tracing::debug!(error = %err, "Rejected form input");
            IndexPage::with_error(text, limit, err.to_string())
        }
    };

    Ok(Html(state.renderer.render_index(&page)?))
}

// ─────────────────────────────────────────────────────────────────────────────
// API Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn analyze_api_handler(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AggregatedResult>, ApiError> {
    let Json(request) = payload.map_err(invalid_json)?;
    let features = match request.features {
        Some(names) => {
            FeatureSet::from_names(&names).map_err(|e| bad_request("unknown_feature", e.to_string()))?
        }
        None => state.features.clone(),
    };

    let result = state
        .aggregator
        .analyze(&request.text, &features)
        .await
        .map_err(|e| bad_request(validation_code(&e), e.to_string()))?;

    Ok(Json(result))
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        service: "textlens-server".into(),
    })
}
