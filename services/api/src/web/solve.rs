//! services/api/src/web/solve.rs
//!
//! The tutor chat proxy endpoint.

use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use std::sync::Arc;
use study_assistant_core::{domain::AuthUser, ports::PortError};
use tracing::{error, info};

use crate::error::{ApiError, ApiResult};
use crate::web::{
    protocol::{ErrorResponse, SolveRequestBody, SolveResponse},
    state::AppState,
};

/// Shown to callers when the chat provider fails and provider errors are not exposed.
pub const PROVIDER_FAILURE: &str = "Failed to get response from AI";

fn provider_message(err: PortError) -> String {
    match err {
        PortError::NotFound(msg)
        | PortError::Invalid(msg)
        | PortError::Unexpected(msg)
        | PortError::Unavailable(msg) => msg,
        PortError::Unauthorized => "Unauthorized".to_string(),
    }
}

/// Ask the tutor a question, optionally grounded in course notes and with one image.
#[utoipa::path(
    post,
    path = "/api/solve",
    request_body = SolveRequestBody,
    responses(
        (status = 200, description = "Tutor reply", body = SolveResponse),
        (status = 400, description = "Malformed or invalid request", body = ErrorResponse),
        (status = 401, description = "No active session", body = ErrorResponse),
        (status = 500, description = "The chat provider failed", body = ErrorResponse)
    ),
    tag = "tutor"
)]
pub async fn solve_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<SolveRequestBody>, JsonRejection>,
) -> ApiResult<Json<SolveResponse>> {
    let Json(body) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let request = body.into_domain().map_err(ApiError::BadRequest)?;

    info!(
        user_id = %user.id,
        mode = %request.mode,
        has_notes = request.notes.is_some(),
        has_image = request.image.is_some(),
        "Solve request"
    );

    match state.solver.solve(request).await {
        Ok(reply) => Ok(Json(SolveResponse { reply })),
        Err(e) => {
            error!(user_id = %user.id, "Chat provider failed: {}", e);
            let message = if state.config.expose_provider_errors {
                provider_message(e)
            } else {
                PROVIDER_FAILURE.to_string()
            };
            Err(ApiError::Upstream(message))
        }
    }
}
