//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the course, topic, note, and upload endpoints
//! and the master definition for the OpenAPI specification.

use axum::{
    extract::{rejection::JsonRejection, Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;
use study_assistant_core::{
    domain::{AuthSession, AuthUser, NewCourse, NewNote, NewTopic},
    ports::PortError,
};
use tracing::{error, info};
use utoipa::OpenApi;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::web::{auth, protocol::*, solve, state::AppState};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        solve::solve_handler,
        list_courses_handler,
        create_course_handler,
        create_topic_handler,
        create_note_handler,
        upload_handler,
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::session_handler,
        auth::google_oauth_handler,
    ),
    components(
        schemas(
            SolveRequestBody, SolveResponse, WireMode, ErrorResponse,
            CourseResponse, TopicResponse, NoteResponse,
            CreateCourseRequest, CreateTopicRequest, CreateNoteRequest, UploadResponse,
            SignupRequest, LoginRequest, AuthResponse
        )
    ),
    tags(
        (name = "tutor", description = "AI tutor chat proxy."),
        (name = "courses", description = "Courses, topics, notes, and file uploads."),
        (name = "auth", description = "Session management backed by the hosted auth provider.")
    )
)]
pub struct ApiDoc;

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}

fn non_empty(field: &str, value: &str) -> ApiResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BadRequest(format!("{} must not be empty", field)));
    }
    Ok(trimmed.to_string())
}

/// Rows owned by someone else are reported as missing.
fn ensure_owner(owner: Uuid, user: &AuthUser, what: &str) -> ApiResult<()> {
    if owner != user.id {
        return Err(PortError::NotFound(format!("{} not found", what)).into());
    }
    Ok(())
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List the caller's courses with their topics and notes.
#[utoipa::path(
    get,
    path = "/courses",
    responses(
        (status = 200, description = "Courses, newest first", body = [CourseResponse]),
        (status = 401, description = "No active session", body = ErrorResponse)
    ),
    tag = "courses"
)]
pub async fn list_courses_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<CourseResponse>>> {
    let courses = state.repo.list_courses(user.id).await?;
    Ok(Json(courses.into_iter().map(Into::into).collect()))
}

/// Create a course.
#[utoipa::path(
    post,
    path = "/courses",
    request_body = CreateCourseRequest,
    responses(
        (status = 201, description = "Course created", body = CourseResponse),
        (status = 400, description = "Missing name or code", body = ErrorResponse),
        (status = 401, description = "No active session", body = ErrorResponse)
    ),
    tag = "courses"
)]
pub async fn create_course_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<CreateCourseRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let req = json_body(payload)?;
    let course = NewCourse {
        name: non_empty("name", &req.name)?,
        code: non_empty("code", &req.code)?,
        color: req.color.filter(|c| !c.trim().is_empty()),
    };

    let created = state.repo.create_course(user.id, course).await?;
    info!(user_id = %user.id, course_id = %created.id, "Course created");
    Ok((StatusCode::CREATED, Json(CourseResponse::from(created))))
}

/// Add a topic to one of the caller's courses.
#[utoipa::path(
    post,
    path = "/courses/{course_id}/topics",
    request_body = CreateTopicRequest,
    params(("course_id" = Uuid, Path, description = "Course to add the topic to.")),
    responses(
        (status = 201, description = "Topic created", body = TopicResponse),
        (status = 400, description = "Missing name", body = ErrorResponse),
        (status = 404, description = "No such course for this user", body = ErrorResponse)
    ),
    tag = "courses"
)]
pub async fn create_topic_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(course_id): Path<Uuid>,
    payload: Result<Json<CreateTopicRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let req = json_body(payload)?;
    let name = non_empty("name", &req.name)?;

    ensure_owner(state.repo.course_owner(course_id).await?, &user, "Course")?;
    let topic = state.repo.create_topic(NewTopic { course_id, name }).await?;
    Ok((StatusCode::CREATED, Json(TopicResponse::from(topic))))
}

/// Add a note to one of the caller's topics.
#[utoipa::path(
    post,
    path = "/topics/{topic_id}/notes",
    request_body = CreateNoteRequest,
    params(("topic_id" = Uuid, Path, description = "Topic to add the note to.")),
    responses(
        (status = 201, description = "Note created", body = NoteResponse),
        (status = 400, description = "Missing title", body = ErrorResponse),
        (status = 404, description = "No such topic for this user", body = ErrorResponse)
    ),
    tag = "courses"
)]
pub async fn create_note_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(topic_id): Path<Uuid>,
    payload: Result<Json<CreateNoteRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let req = json_body(payload)?;
    let title = non_empty("title", &req.title)?;

    ensure_owner(state.repo.topic_owner(topic_id).await?, &user, "Topic")?;
    let note = state
        .repo
        .create_note(NewNote {
            topic_id,
            title,
            content: req.content,
            file_url: req.file_url.filter(|u| !u.trim().is_empty()),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(NoteResponse::from(note))))
}

/// Upload a file to object storage.
///
/// Accepts a multipart/form-data request with a part named `file`.
#[utoipa::path(
    post,
    path = "/uploads",
    request_body(content_type = "multipart/form-data", description = "The file to upload, in a part named `file`."),
    responses(
        (status = 201, description = "File stored", body = UploadResponse),
        (status = 400, description = "Missing or empty file part", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    tag = "courses"
)]
pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let user = &session.user;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read multipart data: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read file bytes: {}", e)))?;
        if data.is_empty() {
            return Err(ApiError::BadRequest("Uploaded file is empty".to_string()));
        }

        let url = state
            .storage
            .upload(
                user.id,
                &session.access_token,
                &file_name,
                &content_type,
                data.to_vec(),
            )
            .await
            .map_err(|e| {
                error!(user_id = %user.id, "Upload failed: {}", e);
                ApiError::Port(e)
            })?;
        info!(user_id = %user.id, %url, "File uploaded");
        return Ok((StatusCode::CREATED, Json(UploadResponse { url })));
    }

    Err(ApiError::BadRequest(
        "Multipart form must include a file".to_string(),
    ))
}
