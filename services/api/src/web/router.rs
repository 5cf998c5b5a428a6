//! services/api/src/web/router.rs
//!
//! Assembles the public and protected routes into the application router.

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::web::{
    auth::{google_oauth_handler, login_handler, logout_handler, session_handler, signup_handler},
    middleware::require_auth,
    rest::{
        create_course_handler, create_note_handler, create_topic_handler, list_courses_handler,
        upload_handler, ApiDoc,
    },
    solve::solve_handler,
    state::AppState,
};

/// Requests larger than this are rejected before reaching a handler.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

fn cors_layer(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    match HeaderValue::from_str(origin) {
        Ok(value) => cors.allow_origin(value),
        Err(_) => {
            warn!("Ignoring unusable CORS origin '{}'", origin);
            cors
        }
    }
}

/// Builds the complete application, including the Swagger UI.
pub fn build_router(app_state: Arc<AppState>) -> Router {
    let cors = cors_layer(&app_state.config.cors_origin);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler))
        .route("/auth/session", get(session_handler))
        .route("/auth/oauth/google", get(google_oauth_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/api/solve", post(solve_handler))
        .route(
            "/courses",
            get(list_courses_handler).post(create_course_handler),
        )
        .route("/courses/{course_id}/topics", post(create_topic_handler))
        .route("/topics/{topic_id}/notes", post(create_note_handler))
        .route("/uploads", post(upload_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
