//! HTTP server for the browser client.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Plain-text greeting |
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/api/grants?keyword=` | Static sample grants, optionally filtered |
//! | `POST` | `/api/process-researcher` | Run the discovery pipeline |
//! | `POST` | `/api/assist-grant-writing` | Draft one application section |
//!
//! # Status codes
//!
//! `/api/process-researcher` always answers with the pipeline envelope
//! `{status, errors, data}`: 400 for a missing field or unreadable body,
//! 500 when the profile service is not configured, 200 otherwise
//! (including `partial_success`).
//!
//! `/api/assist-grant-writing` answers `{success: true, draftText}` or
//! `{success: false, error}` with 400/500.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the browser client can
//! be served from a different port.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::assist::{draft_section, AssistInput};
use crate::config::Config;
use crate::error::{Issue, IssueKind, Step};
use crate::models::ResearcherInput;
use crate::pipeline::{Pipeline, Services};
use crate::report::{PipelineResult, RunStatus};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(services: Services, config: Arc<Config>) -> Self {
        Self {
            pipeline: Arc::new(Pipeline::new(services, config)),
        }
    }
}

/// Builds the router without binding, so tests can serve it on any listener.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/api/grants", get(handle_sample_grants))
        .route("/api/process-researcher", post(handle_process_researcher))
        .route("/api/assist-grant-writing", post(handle_assist))
        .layer(cors)
        .with_state(state)
}

/// Starts the server on `[server].bind` and runs until the process is
/// terminated.
pub async fn run_server(config: Config, services: Services) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = router(AppState::new(services, Arc::new(config)));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "grant beacon listening");
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// Error type for the drafting endpoint; renders `{success: false, error}`.
struct AppError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = json!({ "success": false, "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: message.into(),
    }
}

// ============ GET / and /health ============

async fn handle_root() -> &'static str {
    "Hello from the Grant Beacon backend!"
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /api/grants ============

#[derive(Debug, Deserialize)]
struct GrantsQuery {
    keyword: Option<String>,
}

fn sample_grants() -> Vec<Value> {
    vec![
        json!({ "id": 1, "title": "Grant A", "agency": "NIH" }),
        json!({ "id": 2, "title": "Grant B", "agency": "NSF" }),
    ]
}

/// Sample data for wiring up the client; matches on title or agency.
async fn handle_sample_grants(Query(query): Query<GrantsQuery>) -> Json<Vec<Value>> {
    let needle = query
        .keyword
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty());

    let grants = sample_grants()
        .into_iter()
        .filter(|g| match &needle {
            None => true,
            Some(needle) => ["title", "agency"].iter().any(|field| {
                g[field]
                    .as_str()
                    .is_some_and(|v| v.to_lowercase().contains(needle.as_str()))
            }),
        })
        .collect();

    Json(grants)
}

// ============ POST /api/process-researcher ============

fn status_code(result: &PipelineResult) -> StatusCode {
    match result.status {
        RunStatus::Failed if result.data.is_none() => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::OK,
    }
}

async fn handle_process_researcher(
    State(state): State<AppState>,
    body: Result<Json<ResearcherInput>, JsonRejection>,
) -> (StatusCode, Json<PipelineResult>) {
    let input = match body {
        Ok(Json(input)) => input,
        Err(rejection) => {
            tracing::warn!(error = %rejection.body_text(), "unreadable researcher request");
            let issue = Issue::new(
                Step::Validation,
                IssueKind::Validation,
                "Missing name or affiliation",
            )
            .with_details(rejection.body_text());
            return (
                StatusCode::BAD_REQUEST,
                Json(PipelineResult::rejected(issue)),
            );
        }
    };

    let req = match input.validate() {
        Ok(req) => req,
        Err(issue) => {
            tracing::warn!("request rejected: missing name or affiliation");
            return (
                StatusCode::BAD_REQUEST,
                Json(PipelineResult::rejected(issue)),
            );
        }
    };

    let result = state.pipeline.run(&req).await;
    (status_code(&result), Json(result))
}

// ============ POST /api/assist-grant-writing ============

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AssistResponse {
    success: bool,
    draft_text: String,
}

async fn handle_assist(
    State(state): State<AppState>,
    body: Result<Json<AssistInput>, JsonRejection>,
) -> Result<Json<AssistResponse>, AppError> {
    let Json(input) = body.map_err(|e| bad_request(e.body_text()))?;

    let req = input.validate().map_err(|missing| {
        bad_request(format!("Missing required fields: {}", missing.join(", ")))
    })?;

    let chat = state
        .pipeline
        .services()
        .chat
        .clone()
        .ok_or_else(|| internal("Chat service API key is not configured on the server."))?;

    let draft = draft_section(chat.as_ref(), &req, &state.pipeline.config().assist)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, section = req.section.label(), "drafting failed");
            internal(format!("Failed to generate draft: {}", e))
        })?;

    Ok(Json(AssistResponse {
        success: true,
        draft_text: draft,
    }))
}
