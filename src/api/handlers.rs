//! HTTP request handlers

use super::types::{ChatRequest, ErrorResponse, ModelsResponse, ThreadResponse, WorkflowResponse};
use super::AppState;
use crate::conversation::{TurnError, TurnReply};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Thread lifecycle
        .route("/api/threads", post(create_thread))
        .route("/api/threads/:id", get(get_thread).delete(end_thread))
        .route("/api/threads/:id/chat", post(send_chat))
        // Active questionnaire
        .route("/api/workflow", get(get_workflow))
        // Model info
        .route("/api/models", get(list_models))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Threads
// ============================================================

async fn create_thread(State(state): State<AppState>) -> (StatusCode, Json<TurnReply>) {
    let reply = state.turns.create_thread().await;
    (StatusCode::CREATED, Json(reply))
}

async fn get_thread(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ThreadResponse>, AppError> {
    let thread = state
        .turns
        .thread(&id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Thread not found: {id}")))?;
    Ok(Json(ThreadResponse { thread }))
}

async fn end_thread(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.turns.end_thread(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn send_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<TurnReply>, AppError> {
    let reply = state.turns.handle_turn(&id, &req.message).await?;
    Ok(Json(reply))
}

// ============================================================
// Workflow
// ============================================================

async fn get_workflow(State(state): State<AppState>) -> Json<WorkflowResponse> {
    Json(WorkflowResponse {
        workflow: state.turns.definition().clone(),
    })
}

async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: state.llm_registry.available_model_info(),
        default: state.llm_registry.default_model_id().to_string(),
    })
}

async fn get_version() -> &'static str {
    concat!("intake-engine ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    BadGateway(String),
}

impl From<TurnError> for AppError {
    fn from(e: TurnError) -> Self {
        match e {
            TurnError::EmptyMessage => AppError::BadRequest(e.to_string()),
            TurnError::UnknownThread(_) => AppError::NotFound(e.to_string()),
            TurnError::Resolve(_) | TurnError::Advisor(_) => {
                tracing::error!(error = %e, "Chat turn failed upstream");
                AppError::BadGateway(e.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
