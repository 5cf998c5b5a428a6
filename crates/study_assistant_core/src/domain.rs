//! crates/study_assistant_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Color tag given to a course when the student does not pick one.
pub const DEFAULT_COURSE_COLOR: &str = "#10b981";

/// A course owned by a single user. Owns zero or more topics.
#[derive(Debug, Clone, PartialEq)]
pub struct Course {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub code: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
    pub topics: Vec<Topic>,
}

impl Course {
    /// Concatenates every note of every topic into the blob sent along with a chat turn.
    pub fn notes_blob(&self) -> String {
        let mut blob = String::new();
        for note in self.topics.iter().flat_map(|t| t.notes.iter()) {
            blob.push_str(&format!("\n## {}\n{}\n", note.title, note.content));
        }
        blob
    }

    pub fn topic(&self, topic_id: Uuid) -> Option<&Topic> {
        self.topics.iter().find(|t| t.id == topic_id)
    }
}

/// A topic inside exactly one course.
#[derive(Debug, Clone, PartialEq)]
pub struct Topic {
    pub id: Uuid,
    pub course_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub notes: Vec<Note>,
}

/// A note inside exactly one topic.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub id: Uuid,
    pub topic_id: Uuid,
    pub title: String,
    pub content: String,
    pub file_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

// Input shapes for the three insert operations.
#[derive(Debug, Clone)]
pub struct NewCourse {
    pub name: String,
    pub code: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewTopic {
    pub course_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct NewNote {
    pub topic_id: Uuid,
    pub title: String,
    pub content: String,
    pub file_url: Option<String>,
}

/// The signed-in user as reported by the auth provider.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
}

/// A signed-in session: the user plus the provider's bearer token.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub access_token: String,
    pub user: AuthUser,
}

/// Which knowledge the tutor is allowed to draw on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatMode {
    /// Only the student's notes.
    #[default]
    Bounded,
    /// General knowledge, with the notes as optional context.
    Expanded,
}

impl ChatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatMode::Bounded => "bounded",
            ChatMode::Expanded => "expanded",
        }
    }
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChatMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bounded" => Ok(ChatMode::Bounded),
            "expanded" => Ok(ChatMode::Expanded),
            other => Err(format!("unknown chat mode '{}'", other)),
        }
    }
}

/// A conversation a transcript belongs to. Not persisted in the current flow.
#[derive(Debug, Clone)]
pub struct Conversation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Option<Uuid>,
    pub mode: ChatMode,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One entry of the chat transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub image_url: Option<String>,
    pub bookmarked: bool,
}

/// A bookmarked message as listed by the Saved view.
#[derive(Debug, Clone, PartialEq)]
pub struct Bookmark {
    pub message_id: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Solve (chat proxy) request
//=========================================================================================

/// An image attached to a chat turn.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageAttachment {
    /// A public URL the server fetches and inlines.
    Url(String),
    /// Base64 data with an optional declared media type.
    Inline {
        data: String,
        media_type: Option<String>,
    },
}

/// A validated chat turn, ready for prompt construction.
#[derive(Debug, Clone)]
pub struct SolveRequest {
    pub message: String,
    pub mode: ChatMode,
    pub notes: Option<String>,
    pub course_name: Option<String>,
    pub image: Option<ImageAttachment>,
}

/// An image ready to be sent inline to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    pub media_type: String,
    pub data: String,
}

/// A content block of the outbound user message.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    Text(String),
    Image(InlineImage),
}

/// The complete prompt handed to a chat-completion provider.
#[derive(Debug, Clone)]
pub struct ChatPrompt {
    pub system: String,
    pub content: Vec<ContentBlock>,
}

/// A content block returned by the provider. Only text is consumed.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyBlock {
    Text(String),
    Other(String),
}
