//! crates/study_assistant_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, so the core
//! stays independent of the hosted database, storage, auth and model providers.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    AuthSession, AuthUser, ChatPrompt, Course, InlineImage, NewCourse, NewNote, NewTopic, Note, ReplyBlock,
    SolveRequest, Topic,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    Invalid(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
    /// The remote side could not be reached or its answer could not be read.
    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Relational store holding the course → topic → note hierarchy.
#[async_trait]
pub trait StudyRepository: Send + Sync {
    /// Every course of the user, newest first, with nested topics and notes.
    async fn list_courses(&self, user_id: Uuid) -> PortResult<Vec<Course>>;

    async fn create_course(&self, user_id: Uuid, course: NewCourse) -> PortResult<Course>;

    async fn create_topic(&self, topic: NewTopic) -> PortResult<Topic>;

    async fn create_note(&self, note: NewNote) -> PortResult<Note>;

    /// Owner of a course, used to scope topic inserts.
    async fn course_owner(&self, course_id: Uuid) -> PortResult<Uuid>;

    /// Owner of the course a topic belongs to, used to scope note inserts.
    async fn topic_owner(&self, topic_id: Uuid) -> PortResult<Uuid>;
}

/// Object storage bucket for uploaded files.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Stores the bytes under a user-scoped path and returns a public retrieval URL.
    ///
    /// `access_token` is the caller's session token; the store authorizes the
    /// write as that user.
    async fn upload(
        &self,
        user_id: Uuid,
        access_token: &str,
        file_name: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> PortResult<String>;
}

/// Hosted auth provider (email/password plus OAuth redirect).
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> PortResult<AuthSession>;

    async fn sign_in(&self, email: &str, password: &str) -> PortResult<AuthSession>;

    async fn sign_out(&self, access_token: &str) -> PortResult<()>;

    /// Resolves the user behind a session token. `Unauthorized` when the token is not valid.
    async fn current_user(&self, access_token: &str) -> PortResult<AuthUser>;

    /// The provider URL a browser is sent to for an OAuth sign-in.
    fn oauth_url(&self, provider: &str, redirect_to: &str) -> String;
}

/// Third-party chat-completion API.
#[async_trait]
pub trait ChatCompletionService: Send + Sync {
    /// Sends one system instruction and one user message, returning the reply blocks.
    async fn complete(&self, prompt: &ChatPrompt) -> PortResult<Vec<ReplyBlock>>;
}

/// Downloads a remote image so it can be inlined in a multimodal request.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Returns the image base64-encoded, with its media type resolved.
    async fn fetch(&self, url: &str) -> PortResult<InlineImage>;
}

/// Answers a chat turn. Implemented by the tutor on the server and by the HTTP client.
#[async_trait]
pub trait SolveService: Send + Sync {
    async fn solve(&self, request: SolveRequest) -> PortResult<String>;
}
