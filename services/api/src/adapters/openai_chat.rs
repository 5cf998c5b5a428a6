//! services/api/src/adapters/openai_chat.rs
//!
//! This module contains the adapter for OpenAI-compatible chat completion.
//! It implements the `ChatCompletionService` port from the `core` crate and is
//! selected with `CHAT_PROVIDER=openai`.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImageArgs,
        ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContentPart,
        CreateChatCompletionRequestArgs, ImageUrlArgs,
    },
    Client,
};
use async_trait::async_trait;
use study_assistant_core::domain::{ChatPrompt, ContentBlock, ReplyBlock};
use study_assistant_core::ports::{ChatCompletionService, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ChatCompletionService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiChatAdapter {
    client: Client<OpenAIConfig>,
    model: String,
    max_tokens: u32,
}

impl OpenAiChatAdapter {
    /// Creates a new `OpenAiChatAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String, max_tokens: u32) -> Self {
        Self {
            client,
            model,
            max_tokens,
        }
    }
}

fn builder_error(e: OpenAIError) -> PortError {
    PortError::Unexpected(e.to_string())
}

/// Converts the prompt's content blocks into user message parts.
/// Images travel as base64 data URLs.
fn user_parts(prompt: &ChatPrompt) -> PortResult<Vec<ChatCompletionRequestUserMessageContentPart>> {
    prompt
        .content
        .iter()
        .map(|block| match block {
            ContentBlock::Text(text) => Ok(ChatCompletionRequestMessageContentPartTextArgs::default()
                .text(text.clone())
                .build()
                .map_err(builder_error)?
                .into()),
            ContentBlock::Image(image) => {
                let image_url = ImageUrlArgs::default()
                    .url(format!("data:{};base64,{}", image.media_type, image.data))
                    .build()
                    .map_err(builder_error)?;
                Ok(ChatCompletionRequestMessageContentPartImageArgs::default()
                    .image_url(image_url)
                    .build()
                    .map_err(builder_error)?
                    .into())
            }
        })
        .collect()
}

//=========================================================================================
// `ChatCompletionService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ChatCompletionService for OpenAiChatAdapter {
    async fn complete(&self, prompt: &ChatPrompt) -> PortResult<Vec<ReplyBlock>> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(prompt.system.clone())
                .build()
                .map_err(builder_error)?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_parts(prompt)?)
                .build()
                .map_err(builder_error)?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .max_tokens(self.max_tokens)
            .n(1)
            .build()
            .map_err(builder_error)?;

        // Call the API and manually map the error if it occurs, which respects the orphan rule.
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        // Only the first choice is used; a choice without text yields no blocks.
        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| vec![ReplyBlock::Text(text)])
            .unwrap_or_default())
    }
}
