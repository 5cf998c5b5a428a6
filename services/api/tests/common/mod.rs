//! Shared helpers for the API integration tests: in-memory port fakes and a
//! router built exactly as production builds it.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use api_lib::config::Config;
use api_lib::web::{build_router, AppState};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::Value;
use study_assistant_core::domain::{
    AuthSession, AuthUser, ChatPrompt, Course, InlineImage, NewCourse, NewNote, NewTopic, Note,
    ReplyBlock, Topic, DEFAULT_COURSE_COLOR,
};
use study_assistant_core::ports::{
    AuthProvider, ChatCompletionService, ImageFetcher, ObjectStorage, PortError, PortResult,
    StudyRepository,
};
use study_assistant_core::Tutor;
use tower::ServiceExt;
use uuid::Uuid;

pub const ALICE_TOKEN: &str = "token-alice";
pub const BOB_TOKEN: &str = "token-bob";
pub const PASSWORD: &str = "correct horse";

pub fn alice() -> AuthUser {
    AuthUser {
        id: Uuid::from_u128(1),
        email: "alice@example.com".to_string(),
        full_name: Some("Alice Able".to_string()),
    }
}

pub fn bob() -> AuthUser {
    AuthUser {
        id: Uuid::from_u128(2),
        email: "bob@example.com".to_string(),
        full_name: None,
    }
}

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeAuth {
    pub signed_out: Mutex<Vec<String>>,
}

#[async_trait]
impl AuthProvider for FakeAuth {
    async fn sign_up(
        &self,
        email: &str,
        _password: &str,
        full_name: Option<&str>,
    ) -> PortResult<AuthSession> {
        if email == "pending@example.com" {
            return Err(PortError::Invalid(
                "Account created. Confirm your email before signing in.".to_string(),
            ));
        }
        Ok(AuthSession {
            access_token: format!("token-{}", email),
            user: AuthUser {
                id: Uuid::new_v4(),
                email: email.to_string(),
                full_name: full_name.map(str::to_string),
            },
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> PortResult<AuthSession> {
        match (email, password) {
            ("alice@example.com", PASSWORD) => Ok(AuthSession {
                access_token: ALICE_TOKEN.to_string(),
                user: alice(),
            }),
            ("bob@example.com", PASSWORD) => Ok(AuthSession {
                access_token: BOB_TOKEN.to_string(),
                user: bob(),
            }),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn sign_out(&self, access_token: &str) -> PortResult<()> {
        self.signed_out
            .lock()
            .unwrap()
            .push(access_token.to_string());
        Ok(())
    }

    async fn current_user(&self, access_token: &str) -> PortResult<AuthUser> {
        match access_token {
            ALICE_TOKEN => Ok(alice()),
            BOB_TOKEN => Ok(bob()),
            _ => Err(PortError::Unauthorized),
        }
    }

    fn oauth_url(&self, provider: &str, redirect_to: &str) -> String {
        format!(
            "https://auth.test/authorize?provider={}&redirect_to={}",
            provider, redirect_to
        )
    }
}

#[derive(Default)]
pub struct MemoryRepo {
    pub courses: Mutex<Vec<Course>>,
}

#[async_trait]
impl StudyRepository for MemoryRepo {
    async fn list_courses(&self, user_id: Uuid) -> PortResult<Vec<Course>> {
        let mut courses: Vec<Course> = self
            .courses
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        courses.reverse();
        Ok(courses)
    }

    async fn create_course(&self, user_id: Uuid, course: NewCourse) -> PortResult<Course> {
        let created = Course {
            id: Uuid::new_v4(),
            user_id,
            name: course.name,
            code: course.code,
            color: course
                .color
                .unwrap_or_else(|| DEFAULT_COURSE_COLOR.to_string()),
            created_at: Utc::now(),
            topics: Vec::new(),
        };
        self.courses.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn create_topic(&self, topic: NewTopic) -> PortResult<Topic> {
        let mut courses = self.courses.lock().unwrap();
        let course = courses
            .iter_mut()
            .find(|c| c.id == topic.course_id)
            .ok_or_else(|| PortError::NotFound("Course not found".to_string()))?;
        let created = Topic {
            id: Uuid::new_v4(),
            course_id: topic.course_id,
            name: topic.name,
            created_at: Utc::now(),
            notes: Vec::new(),
        };
        course.topics.push(created.clone());
        Ok(created)
    }

    async fn create_note(&self, note: NewNote) -> PortResult<Note> {
        let mut courses = self.courses.lock().unwrap();
        let topic = courses
            .iter_mut()
            .flat_map(|c| c.topics.iter_mut())
            .find(|t| t.id == note.topic_id)
            .ok_or_else(|| PortError::NotFound("Topic not found".to_string()))?;
        let created = Note {
            id: Uuid::new_v4(),
            topic_id: note.topic_id,
            title: note.title,
            content: note.content,
            file_url: note.file_url,
            created_at: Utc::now(),
        };
        topic.notes.push(created.clone());
        Ok(created)
    }

    async fn course_owner(&self, course_id: Uuid) -> PortResult<Uuid> {
        self.courses
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == course_id)
            .map(|c| c.user_id)
            .ok_or_else(|| PortError::NotFound("Course not found".to_string()))
    }

    async fn topic_owner(&self, topic_id: Uuid) -> PortResult<Uuid> {
        self.courses
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.topics.iter().any(|t| t.id == topic_id))
            .map(|c| c.user_id)
            .ok_or_else(|| PortError::NotFound("Topic not found".to_string()))
    }
}

pub struct RecordedUpload {
    pub user_id: Uuid,
    pub access_token: String,
    pub file_name: String,
    pub content_type: String,
    pub len: usize,
}

#[derive(Default)]
pub struct FakeStorage {
    pub uploads: Mutex<Vec<RecordedUpload>>,
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn upload(
        &self,
        user_id: Uuid,
        access_token: &str,
        file_name: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> PortResult<String> {
        self.uploads.lock().unwrap().push(RecordedUpload {
            user_id,
            access_token: access_token.to_string(),
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            len: data.len(),
        });
        Ok(format!("https://storage.test/{}/{}", user_id, file_name))
    }
}

/// Replies with a fixed text, or fails with a fixed provider message.
pub struct ScriptedChat {
    pub outcome: Result<String, String>,
    pub prompts: Mutex<Vec<ChatPrompt>>,
}

impl ScriptedChat {
    pub fn replying(text: &str) -> Self {
        Self {
            outcome: Ok(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            outcome: Err(message.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn last_prompt(&self) -> Option<ChatPrompt> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ChatCompletionService for ScriptedChat {
    async fn complete(&self, prompt: &ChatPrompt) -> PortResult<Vec<ReplyBlock>> {
        self.prompts.lock().unwrap().push(prompt.clone());
        match &self.outcome {
            Ok(text) => Ok(vec![ReplyBlock::Text(text.clone())]),
            Err(message) => Err(PortError::Unexpected(message.clone())),
        }
    }
}

/// Serves a tiny PNG for any URL, or fails every fetch.
pub struct FakeImages {
    pub reachable: bool,
}

#[async_trait]
impl ImageFetcher for FakeImages {
    async fn fetch(&self, url: &str) -> PortResult<InlineImage> {
        if !self.reachable {
            return Err(PortError::Unexpected(format!("GET {} failed", url)));
        }
        Ok(InlineImage {
            media_type: "image/png".to_string(),
            data: "iVBORw0KGgo=".to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

pub fn test_config(expose_provider_errors: bool) -> Config {
    let expose = expose_provider_errors.to_string();
    Config::from_lookup(move |key: &str| {
        let value = match key {
            "DATABASE_URL" => "postgres://localhost/teech_test",
            "SUPABASE_URL" => "https://project.supabase.test",
            "SUPABASE_ANON_KEY" => "anon",
            "ANTHROPIC_API_KEY" => "sk-ant-test",
            "CORS_ORIGIN" => "http://localhost:5173",
            "EXPOSE_PROVIDER_ERRORS" => expose.as_str(),
            _ => return None,
        };
        Some(value.to_string())
    })
    .expect("test config is valid")
}

pub struct TestApp {
    pub router: Router,
    pub repo: Arc<MemoryRepo>,
    pub storage: Arc<FakeStorage>,
    pub auth: Arc<FakeAuth>,
    pub chat: Arc<ScriptedChat>,
}

pub struct TestOptions {
    pub chat: ScriptedChat,
    pub images_reachable: bool,
    pub expose_provider_errors: bool,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            chat: ScriptedChat::replying("A derivative measures the rate of change."),
            images_reachable: true,
            expose_provider_errors: false,
        }
    }
}

pub fn test_app() -> TestApp {
    test_app_with(TestOptions::default())
}

pub fn test_app_with(options: TestOptions) -> TestApp {
    let repo = Arc::new(MemoryRepo::default());
    let storage = Arc::new(FakeStorage::default());
    let auth = Arc::new(FakeAuth::default());
    let chat = Arc::new(options.chat);
    let images = Arc::new(FakeImages {
        reachable: options.images_reachable,
    });

    let state = Arc::new(AppState {
        repo: repo.clone(),
        storage: storage.clone(),
        auth: auth.clone(),
        solver: Arc::new(Tutor::new(chat.clone(), images)),
        config: Arc::new(test_config(options.expose_provider_errors)),
    });

    TestApp {
        router: build_router(state),
        repo,
        storage,
        auth,
        chat,
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub fn json_request(method: Method, uri: &str, body: Option<&Value>, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("session={}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Sends a raw body with a JSON content type, for malformed-payload tests.
pub fn raw_json_request(uri: &str, body: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("session={}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, headers, json)
}

pub async fn post_json(app: &TestApp, uri: &str, body: Value, token: Option<&str>) -> (StatusCode, Value) {
    let (status, _, json) = send(app, json_request(Method::POST, uri, Some(&body), token)).await;
    (status, json)
}

pub async fn get_json(app: &TestApp, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    let (status, _, json) = send(app, json_request(Method::GET, uri, None, token)).await;
    (status, json)
}
