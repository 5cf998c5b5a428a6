//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for signup, login, logout, session lookup, and the
//! Google OAuth redirect. Credentials are checked by the hosted auth provider;
//! the server only keeps the provider's access token in an HttpOnly cookie.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use study_assistant_core::auth_context::Route;
use study_assistant_core::ports::PortError;
use tracing::{info, warn};
use utoipa::IntoParams;

use crate::error::{ApiError, ApiResult};
use crate::web::{
    middleware::{session_token, SESSION_COOKIE},
    protocol::{AuthResponse, ErrorResponse, LoginRequest, SignupRequest},
    state::AppState,
};

/// Provider access tokens are short-lived; the cookie does not outlive them.
const SESSION_MAX_AGE_SECS: i64 = 60 * 60;

fn session_cookie(token: &str) -> String {
    format!(
        "{}={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE, token, SESSION_MAX_AGE_SECS
    )
}

fn cleared_cookie() -> String {
    format!(
        "{}=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0",
        SESSION_COOKIE
    )
}

fn require_credentials(email: &str, password: &str) -> ApiResult<()> {
    if email.trim().is_empty() || !email.contains('@') {
        return Err(ApiError::BadRequest("A valid email is required".to_string()));
    }
    if password.is_empty() {
        return Err(ApiError::BadRequest("Password is required".to_string()));
    }
    Ok(())
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Create a new account and start a session
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Invalid request or email confirmation pending", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    require_credentials(&req.email, &req.password)?;

    let full_name = req.full_name.as_deref().filter(|n| !n.trim().is_empty());
    let session = state
        .auth
        .sign_up(req.email.trim(), &req.password, full_name)
        .await?;
    info!(user_id = %session.user.id, "User signed up");

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, session_cookie(&session.access_token))],
        Json(AuthResponse::from(session.user)),
    ))
}

/// POST /auth/login - Login with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    require_credentials(&req.email, &req.password)?;

    let session = state.auth.sign_in(req.email.trim(), &req.password).await?;
    info!(user_id = %session.user.id, "User logged in");

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, session_cookie(&session.access_token))],
        Json(AuthResponse::from(session.user)),
    ))
}

/// POST /auth/logout - Revoke the session and clear the cookie
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let token = session_token(&headers)
        .ok_or(ApiError::Port(PortError::Unauthorized))?;

    // The cookie is cleared even when the provider has already forgotten the token.
    if let Err(e) = state.auth.sign_out(&token).await {
        warn!("Provider sign-out failed: {}", e);
    }

    Ok((StatusCode::OK, [(header::SET_COOKIE, cleared_cookie())]))
}

/// GET /auth/session - The user behind the current session cookie
#[utoipa::path(
    get,
    path = "/auth/session",
    responses(
        (status = 200, description = "Active session", body = AuthResponse),
        (status = 401, description = "No active session", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn session_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<AuthResponse>> {
    let token = session_token(&headers)
        .ok_or(ApiError::Port(PortError::Unauthorized))?;
    let user = state.auth.current_user(&token).await?;
    Ok(Json(user.into()))
}

#[derive(Deserialize, IntoParams, Debug)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct OAuthQuery {
    /// Where the provider should send the browser after consent.
    pub redirect_to: Option<String>,
}

/// GET /auth/oauth/google - Redirect to the provider's Google consent flow
#[utoipa::path(
    get,
    path = "/auth/oauth/google",
    params(OAuthQuery),
    responses(
        (status = 303, description = "Redirect to the OAuth provider")
    ),
    tag = "auth"
)]
pub async fn google_oauth_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OAuthQuery>,
) -> Redirect {
    let redirect_to = query.redirect_to.unwrap_or_else(|| {
        format!(
            "{}{}",
            state.config.cors_origin.trim_end_matches('/'),
            Route::Dashboard.path()
        )
    });
    Redirect::to(&state.auth.oauth_url("google", &redirect_to))
}
