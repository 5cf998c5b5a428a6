//! crates/study_assistant_core/src/dashboard.rs
//!
//! The dashboard view-model behind the Courses, Solve and Saved views.
//!
//! The course tree is always re-fetched after a successful mutation; there is
//! no optimistic update. The transcript lives only as long as the dashboard.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::{
    AuthSession, Bookmark, ChatMode, Course, ImageAttachment, Message, NewCourse, NewNote,
    NewTopic, Role, SolveRequest,
};
use crate::ports::{ObjectStorage, PortError, PortResult, SolveService, StudyRepository};
use crate::prompt::DEFAULT_COURSE_NAME;
use crate::transcript::Transcript;

/// Shown when the tutor service cannot be reached at all.
pub const CONNECTION_FAILED_REPLY: &str = "Sorry, I could not connect to the AI. Please try again.";

/// Shown when the tutor service answered, but with an error or without a reply.
pub const SOMETHING_WENT_WRONG_REPLY: &str = "Sorry, something went wrong.";

pub const UPLOAD_FAILED_REPLY: &str = "Sorry, the image upload failed.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Courses,
    Solve,
    Saved,
}

pub struct Dashboard {
    user_id: Uuid,
    access_token: String,
    repo: Arc<dyn StudyRepository>,
    storage: Arc<dyn ObjectStorage>,
    solver: Arc<dyn SolveService>,
    courses: Vec<Course>,
    selected_course: Option<Uuid>,
    expanded_topics: HashSet<Uuid>,
    tab: Tab,
    mode: ChatMode,
    transcript: Transcript,
    pending_image: Option<String>,
    uploading: bool,
}

impl Dashboard {
    /// Opens the dashboard for a signed-in session.
    pub fn new(
        session: AuthSession,
        repo: Arc<dyn StudyRepository>,
        storage: Arc<dyn ObjectStorage>,
        solver: Arc<dyn SolveService>,
    ) -> Self {
        Self {
            user_id: session.user.id,
            access_token: session.access_token,
            repo,
            storage,
            solver,
            courses: Vec::new(),
            selected_course: None,
            expanded_topics: HashSet::new(),
            tab: Tab::default(),
            mode: ChatMode::default(),
            transcript: Transcript::new(),
            pending_image: None,
            uploading: false,
        }
    }

    // --- Read-only view state ---

    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn mode(&self) -> ChatMode {
        self.mode
    }

    pub fn messages(&self) -> &[Message] {
        self.transcript.messages()
    }

    pub fn selected_course(&self) -> Option<&Course> {
        let id = self.selected_course?;
        self.courses.iter().find(|c| c.id == id)
    }

    pub fn is_topic_expanded(&self, topic_id: Uuid) -> bool {
        self.expanded_topics.contains(&topic_id)
    }

    pub fn pending_image(&self) -> Option<&str> {
        self.pending_image.as_deref()
    }

    /// True while an image upload is in flight; sending is disabled meanwhile.
    pub fn is_uploading(&self) -> bool {
        self.uploading
    }

    /// The Saved view.
    pub fn saved(&self) -> Vec<Bookmark> {
        self.transcript.bookmarks()
    }

    // --- Navigation ---

    pub fn select_tab(&mut self, tab: Tab) {
        self.tab = tab;
    }

    pub fn set_mode(&mut self, mode: ChatMode) {
        self.mode = mode;
    }

    /// Selects a course, or deselects it when it is already selected.
    pub fn select_course(&mut self, course_id: Uuid) {
        if self.selected_course == Some(course_id) {
            self.selected_course = None;
        } else if self.courses.iter().any(|c| c.id == course_id) {
            self.selected_course = Some(course_id);
        }
    }

    pub fn toggle_topic(&mut self, topic_id: Uuid) {
        if !self.expanded_topics.remove(&topic_id) {
            self.expanded_topics.insert(topic_id);
        }
    }

    // --- Courses view ---

    /// Re-fetches the whole course tree.
    pub async fn refresh(&mut self) -> PortResult<()> {
        self.courses = self.repo.list_courses(self.user_id).await?;
        if let Some(id) = self.selected_course {
            if !self.courses.iter().any(|c| c.id == id) {
                self.selected_course = None;
            }
        }
        Ok(())
    }

    /// Adds a course. Returns false without any call when a field is empty.
    pub async fn add_course(&mut self, name: &str, code: &str) -> PortResult<bool> {
        if name.trim().is_empty() || code.trim().is_empty() {
            return Ok(false);
        }
        let course = NewCourse {
            name: name.trim().to_string(),
            code: code.trim().to_string(),
            color: None,
        };
        self.repo.create_course(self.user_id, course).await?;
        self.refresh().await?;
        Ok(true)
    }

    /// Adds a topic to the selected course. No-op without a selection.
    pub async fn add_topic(&mut self, name: &str) -> PortResult<bool> {
        let Some(course_id) = self.selected_course else {
            return Ok(false);
        };
        if name.trim().is_empty() {
            return Ok(false);
        }
        let topic = NewTopic {
            course_id,
            name: name.trim().to_string(),
        };
        self.repo.create_topic(topic).await?;
        self.refresh().await?;
        Ok(true)
    }

    pub async fn add_note(&mut self, topic_id: Uuid, title: &str, content: &str) -> PortResult<bool> {
        if title.trim().is_empty() {
            return Ok(false);
        }
        let note = NewNote {
            topic_id,
            title: title.trim().to_string(),
            content: content.to_string(),
            file_url: None,
        };
        self.repo.create_note(note).await?;
        self.refresh().await?;
        Ok(true)
    }

    // --- Solve view ---

    /// Uploads an image and keeps its URL for the next turn.
    pub async fn attach_image(&mut self, file_name: &str, content_type: &str, data: Vec<u8>) -> bool {
        self.uploading = true;
        let result = self
            .storage
            .upload(self.user_id, &self.access_token, file_name, content_type, data)
            .await;
        self.uploading = false;

        match result {
            Ok(url) => {
                info!(%url, "Image uploaded");
                self.pending_image = Some(url);
                true
            }
            Err(e) => {
                error!(error = %e, "Image upload failed");
                self.transcript.push(Role::Assistant, UPLOAD_FAILED_REPLY, None);
                false
            }
        }
    }

    pub fn clear_image(&mut self) {
        self.pending_image = None;
    }

    /// Sends one chat turn and returns the id of the assistant reply.
    ///
    /// Returns `None` without a call when there is neither text nor an image,
    /// or while an upload is still running.
    pub async fn send_message(&mut self, input: &str) -> Option<String> {
        if self.uploading || (input.trim().is_empty() && self.pending_image.is_none()) {
            return None;
        }

        let image_url = self.pending_image.take();
        self.transcript.push(Role::User, input, image_url.clone());
        let pending = self.transcript.push_placeholder();

        let request = self.build_request(input, image_url);
        let reply = match self.solver.solve(request).await {
            Ok(reply) if !reply.trim().is_empty() => reply,
            Ok(_) => {
                warn!("Chat turn returned an empty reply");
                SOMETHING_WENT_WRONG_REPLY.to_string()
            }
            Err(PortError::Unavailable(e)) => {
                warn!(error = %e, "Tutor service unreachable");
                CONNECTION_FAILED_REPLY.to_string()
            }
            Err(e) => {
                warn!(error = %e, "Chat turn failed");
                SOMETHING_WENT_WRONG_REPLY.to_string()
            }
        };
        self.transcript.replace(&pending, reply);
        Some(pending)
    }

    pub fn toggle_bookmark(&mut self, message_id: &str) -> Option<bool> {
        self.transcript.toggle_bookmark(message_id)
    }

    fn build_request(&self, input: &str, image_url: Option<String>) -> SolveRequest {
        let course = self.selected_course();
        SolveRequest {
            message: input.to_string(),
            mode: self.mode,
            notes: course.map(Course::notes_blob),
            course_name: Some(
                course
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| DEFAULT_COURSE_NAME.to_string()),
            ),
            image: image_url.map(ImageAttachment::Url),
        }
    }
}
