//! crates/study_assistant_core/src/tutor.rs
//!
//! The chat proxy use case: resolve the attached image, build the prompt,
//! call the chat-completion provider once, and pick the reply text.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::{ChatPrompt, ImageAttachment, InlineImage, ReplyBlock, SolveRequest};
use crate::ports::{ChatCompletionService, ImageFetcher, PortResult, SolveService};
use crate::prompt::{build_system_prompt, build_user_content, DEFAULT_IMAGE_MEDIA_TYPE};

/// Reply used when the provider answers without any text block.
pub const FALLBACK_REPLY: &str = "Sorry, I could not generate a response.";

/// Answers chat turns with a chat-completion provider.
#[derive(Clone)]
pub struct Tutor {
    chat: Arc<dyn ChatCompletionService>,
    images: Arc<dyn ImageFetcher>,
}

impl Tutor {
    pub fn new(chat: Arc<dyn ChatCompletionService>, images: Arc<dyn ImageFetcher>) -> Self {
        Self { chat, images }
    }

    /// Turns the request's attachment into an inline image.
    ///
    /// A remote image that cannot be fetched is dropped with a warning; the turn
    /// continues as text only.
    async fn resolve_image(&self, attachment: Option<&ImageAttachment>) -> Option<InlineImage> {
        match attachment? {
            ImageAttachment::Inline { data, media_type } => Some(InlineImage {
                media_type: media_type
                    .clone()
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_IMAGE_MEDIA_TYPE.to_string()),
                data: data.clone(),
            }),
            ImageAttachment::Url(url) => match self.images.fetch(url).await {
                Ok(image) => Some(image),
                Err(e) => {
                    warn!(%url, error = %e, "Failed to load attached image, continuing without it");
                    None
                }
            },
        }
    }

    /// Builds the full prompt for a request, including image resolution.
    pub async fn prepare(&self, request: &SolveRequest) -> ChatPrompt {
        let image = self.resolve_image(request.image.as_ref()).await;
        let system = build_system_prompt(request, image.is_some());
        ChatPrompt {
            system,
            content: build_user_content(&request.message, image),
        }
    }
}

#[async_trait]
impl SolveService for Tutor {
    async fn solve(&self, request: SolveRequest) -> PortResult<String> {
        let prompt = self.prepare(&request).await;
        info!(
            mode = %request.mode,
            blocks = prompt.content.len(),
            "Forwarding chat turn to the completion provider"
        );
        let blocks = self.chat.complete(&prompt).await?;
        Ok(first_text(blocks).unwrap_or_else(|| FALLBACK_REPLY.to_string()))
    }
}

/// The first text block of a provider response.
pub fn first_text(blocks: Vec<ReplyBlock>) -> Option<String> {
    blocks.into_iter().find_map(|block| match block {
        ReplyBlock::Text(text) => Some(text),
        ReplyBlock::Other(_) => None,
    })
}
