//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::warn;

use crate::web::{protocol::ErrorResponse, state::AppState};
use study_assistant_core::domain::AuthSession;

/// Name of the cookie carrying the provider access token.
pub const SESSION_COOKIE: &str = "session";

/// Reads the access token from the `session` cookie, falling back to a bearer header.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|c| {
            c.trim()
                .strip_prefix(SESSION_COOKIE)
                .and_then(|rest| rest.strip_prefix('='))
        })
        .filter(|t| !t.is_empty());

    from_cookie
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
        })
        .map(str::to_string)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: "Unauthorized".to_string(),
        }),
    )
        .into_response()
}

/// Middleware that resolves the session token to an `AuthUser`.
///
/// If valid, inserts the user, and the `AuthSession` pairing it with its token,
/// into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(token) = session_token(req.headers()) else {
        return unauthorized();
    };

    let user = match state.auth.current_user(&token).await {
        Ok(user) => user,
        Err(e) => {
            warn!("Rejected session token: {}", e);
            return unauthorized();
        }
    };

    req.extensions_mut().insert(user.clone());
    req.extensions_mut().insert(AuthSession {
        access_token: token,
        user,
    });
    next.run(req).await
}
