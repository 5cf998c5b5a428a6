//! services/api/src/client.rs
//!
//! An HTTP client for the API server. It implements the same ports the server
//! implements with hosted services, so the dashboard and auth context run
//! unchanged on top of it. The session token returned by the server's cookie is
//! kept in memory and replayed on every request.

use async_trait::async_trait;
use reqwest::{header, multipart, Client, RequestBuilder, Response, StatusCode, Url};
use serde::{de::DeserializeOwned, Serialize};
use study_assistant_core::domain::{
    AuthSession, AuthUser, Course, NewCourse, NewNote, NewTopic, Note, SolveRequest, Topic,
};
use study_assistant_core::ports::{
    AuthProvider, ObjectStorage, PortError, PortResult, SolveService, StudyRepository,
};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::web::middleware::SESSION_COOKIE;
use crate::web::protocol::{
    AuthResponse, CourseResponse, CreateCourseRequest, CreateNoteRequest, CreateTopicRequest,
    ErrorResponse, LoginRequest, NoteResponse, SignupRequest, SolveRequestBody, SolveResponse,
    TopicResponse, UploadResponse,
};

pub struct HttpStudyClient {
    http: Client,
    base_url: String,
    session: RwLock<Option<String>>,
}

impl HttpStudyClient {
    pub fn new(http: Client, base_url: &str) -> PortResult<Self> {
        Url::parse(base_url)
            .map_err(|e| PortError::Invalid(format!("Invalid API URL '{}': {}", base_url, e)))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session: RwLock::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attaches the given token, or the stored one, as the session cookie.
    async fn with_session(&self, request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        let token = match token {
            Some(t) => Some(t.to_string()),
            None => self.session.read().await.clone(),
        };
        match token {
            Some(t) => request.header(header::COOKIE, format!("{}={}", SESSION_COOKIE, t)),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> PortResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| PortError::Unavailable(format!("Request to API failed: {}", e)))?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let message = response
            .json::<ErrorResponse>()
            .await
            .map(|body| body.error)
            .unwrap_or_else(|_| status.to_string());
        debug!(%status, %message, "API returned an error");

        Err(match status {
            StatusCode::UNAUTHORIZED => PortError::Unauthorized,
            StatusCode::NOT_FOUND => PortError::NotFound(message),
            StatusCode::BAD_REQUEST => PortError::Invalid(message),
            _ => PortError::Unexpected(message),
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> PortResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| PortError::Unavailable(format!("Malformed API response: {}", e)))
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> PortResult<T> {
        let request = self.with_session(self.http.post(self.url(path)), None).await;
        let response = self.send(request.json(body)).await?;
        Self::decode(response).await
    }

    /// Sends credentials and keeps the token from the `Set-Cookie` reply.
    async fn authenticate<B: Serialize>(&self, path: &str, body: &B) -> PortResult<AuthSession> {
        let response = self.send(self.http.post(self.url(path)).json(body)).await?;
        let token = session_from_set_cookie(&response).ok_or_else(|| {
            PortError::Unexpected("API did not return a session cookie".to_string())
        })?;
        let user: AuthResponse = Self::decode(response).await?;

        *self.session.write().await = Some(token.clone());
        Ok(AuthSession {
            access_token: token,
            user: user.into(),
        })
    }

    async fn courses(&self) -> PortResult<Vec<Course>> {
        let request = self.with_session(self.http.get(self.url("/courses")), None).await;
        let courses: Vec<CourseResponse> = Self::decode(self.send(request).await?).await?;
        Ok(courses.into_iter().map(Into::into).collect())
    }
}

fn session_from_set_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|cookie| {
            let pair = cookie.split(';').next()?.trim();
            let value = pair.strip_prefix(SESSION_COOKIE)?.strip_prefix('=')?;
            (!value.is_empty()).then(|| value.to_string())
        })
}

#[async_trait]
impl StudyRepository for HttpStudyClient {
    /// The server scopes every request to the session's user, so `user_id` is not sent.
    async fn list_courses(&self, _user_id: Uuid) -> PortResult<Vec<Course>> {
        self.courses().await
    }

    async fn create_course(&self, _user_id: Uuid, course: NewCourse) -> PortResult<Course> {
        let body = CreateCourseRequest {
            name: course.name,
            code: course.code,
            color: course.color,
        };
        let created: CourseResponse = self.post_json("/courses", &body).await?;
        Ok(created.into())
    }

    async fn create_topic(&self, topic: NewTopic) -> PortResult<Topic> {
        let path = format!("/courses/{}/topics", topic.course_id);
        let created: TopicResponse = self
            .post_json(&path, &CreateTopicRequest { name: topic.name })
            .await?;
        Ok(created.into())
    }

    async fn create_note(&self, note: NewNote) -> PortResult<Note> {
        let path = format!("/topics/{}/notes", note.topic_id);
        let body = CreateNoteRequest {
            title: note.title,
            content: note.content,
            file_url: note.file_url,
        };
        let created: NoteResponse = self.post_json(&path, &body).await?;
        Ok(created.into())
    }

    async fn course_owner(&self, course_id: Uuid) -> PortResult<Uuid> {
        self.courses()
            .await?
            .into_iter()
            .find(|c| c.id == course_id)
            .map(|c| c.user_id)
            .ok_or_else(|| PortError::NotFound(format!("Course {} not found", course_id)))
    }

    async fn topic_owner(&self, topic_id: Uuid) -> PortResult<Uuid> {
        self.courses()
            .await?
            .into_iter()
            .find(|c| c.topics.iter().any(|t| t.id == topic_id))
            .map(|c| c.user_id)
            .ok_or_else(|| PortError::NotFound(format!("Topic {} not found", topic_id)))
    }
}

#[async_trait]
impl ObjectStorage for HttpStudyClient {
    async fn upload(
        &self,
        _user_id: Uuid,
        access_token: &str,
        file_name: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> PortResult<String> {
        let part = multipart::Part::bytes(data)
            .file_name(file_name.to_string())
            .mime_str(content_type)
            .map_err(|e| PortError::Invalid(format!("Invalid content type: {}", e)))?;
        let form = multipart::Form::new().part("file", part);

        let request = self
            .with_session(self.http.post(self.url("/uploads")), Some(access_token))
            .await;
        let uploaded: UploadResponse = Self::decode(self.send(request.multipart(form)).await?).await?;
        Ok(uploaded.url)
    }
}

#[async_trait]
impl AuthProvider for HttpStudyClient {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> PortResult<AuthSession> {
        let body = SignupRequest {
            email: email.to_string(),
            password: password.to_string(),
            full_name: full_name.map(str::to_string),
        };
        self.authenticate("/auth/signup", &body).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> PortResult<AuthSession> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.authenticate("/auth/login", &body).await
    }

    async fn sign_out(&self, access_token: &str) -> PortResult<()> {
        let request = self
            .with_session(self.http.post(self.url("/auth/logout")), Some(access_token))
            .await;
        let result = self.send(request).await.map(|_| ());
        *self.session.write().await = None;
        result
    }

    async fn current_user(&self, access_token: &str) -> PortResult<AuthUser> {
        let request = self
            .with_session(self.http.get(self.url("/auth/session")), Some(access_token))
            .await;
        let user: AuthResponse = Self::decode(self.send(request).await?).await?;
        *self.session.write().await = Some(access_token.to_string());
        Ok(user.into())
    }

    fn oauth_url(&self, provider: &str, redirect_to: &str) -> String {
        let base = self.url(&format!("/auth/oauth/{}", provider));
        match Url::parse_with_params(&base, &[("redirectTo", redirect_to)]) {
            Ok(url) => url.to_string(),
            Err(_) => base,
        }
    }
}

#[async_trait]
impl SolveService for HttpStudyClient {
    async fn solve(&self, request: SolveRequest) -> PortResult<String> {
        let body = SolveRequestBody::from_domain(request);
        let reply: SolveResponse = self.post_json("/api/solve", &body).await?;
        Ok(reply.reply)
    }
}
