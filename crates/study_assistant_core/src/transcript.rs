//! crates/study_assistant_core/src/transcript.rs
//!
//! The in-memory chat transcript shown by the Solve view, including bookmarks.
//! Session-scoped: nothing here is persisted.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::domain::{Bookmark, Message, Role};

pub const WELCOME_MESSAGE: &str = "Hey! I'm Teech 👋 Upload a problem or ask me to explain something from your notes. I'll help you understand it better!";

pub const THINKING_PLACEHOLDER: &str = "Thinking...";

const BOOKMARK_TITLE_CHARS: usize = 100;

#[derive(Debug, Clone)]
pub struct Transcript {
    messages: Vec<Message>,
    bookmarked_at: HashMap<String, DateTime<Utc>>,
    next_id: u64,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcript {
    /// A transcript holding only the welcome message.
    pub fn new() -> Self {
        let welcome = Message {
            id: "welcome".to_string(),
            role: Role::Assistant,
            content: WELCOME_MESSAGE.to_string(),
            image_url: None,
            bookmarked: false,
        };
        Self {
            messages: vec![welcome],
            bookmarked_at: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    fn allocate_id(&mut self) -> String {
        let id = format!("msg-{}", self.next_id);
        self.next_id += 1;
        id
    }

    /// Appends a message and returns its id.
    pub fn push(&mut self, role: Role, content: impl Into<String>, image_url: Option<String>) -> String {
        let id = self.allocate_id();
        self.messages.push(Message {
            id: id.clone(),
            role,
            content: content.into(),
            image_url,
            bookmarked: false,
        });
        id
    }

    /// Appends the assistant placeholder shown while a reply is pending.
    pub fn push_placeholder(&mut self) -> String {
        self.push(Role::Assistant, THINKING_PLACEHOLDER, None)
    }

    /// Replaces a message's content in place. Returns false if the id is unknown.
    pub fn replace(&mut self, id: &str, content: impl Into<String>) -> bool {
        match self.messages.iter_mut().find(|m| m.id == id) {
            Some(message) => {
                message.content = content.into();
                true
            }
            None => false,
        }
    }

    /// Flips the bookmark flag of one message and returns the new value.
    pub fn toggle_bookmark(&mut self, id: &str) -> Option<bool> {
        let message = self.messages.iter_mut().find(|m| m.id == id)?;
        message.bookmarked = !message.bookmarked;
        if message.bookmarked {
            self.bookmarked_at.insert(message.id.clone(), Utc::now());
        } else {
            self.bookmarked_at.remove(&message.id);
        }
        Some(message.bookmarked)
    }

    /// Bookmarked messages in transcript order.
    pub fn bookmarks(&self) -> Vec<Bookmark> {
        self.messages
            .iter()
            .filter(|m| m.bookmarked)
            .map(|m| Bookmark {
                message_id: m.id.clone(),
                title: bookmark_title(&m.content),
                content: m.content.clone(),
                created_at: self
                    .bookmarked_at
                    .get(&m.id)
                    .copied()
                    .unwrap_or_else(Utc::now),
            })
            .collect()
    }
}

fn bookmark_title(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(BOOKMARK_TITLE_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
