//! services/api/src/adapters/anthropic_chat.rs
//!
//! This module contains the adapter for the Anthropic Messages API.
//! It implements the `ChatCompletionService` port from the `core` crate.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use study_assistant_core::domain::{ChatPrompt, ContentBlock, ReplyBlock};
use study_assistant_core::ports::{ChatCompletionService, PortError, PortResult};
use tracing::error;

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ChatCompletionService` against the Anthropic Messages API.
#[derive(Clone)]
pub struct AnthropicChatAdapter {
    client: Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    url: String,
}

impl AnthropicChatAdapter {
    /// Creates a new `AnthropicChatAdapter`.
    pub fn new(client: Client, api_key: String, model: String, max_tokens: u32) -> Self {
        Self {
            client,
            api_key,
            model,
            max_tokens,
            url: MESSAGES_URL.to_string(),
        }
    }

    /// Points the adapter at a different endpoint (proxies, test servers).
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    fn build_request(&self, prompt: &ChatPrompt) -> CreateMessageRequest {
        build_request(&self.model, self.max_tokens, prompt)
    }
}

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Serialize)]
struct CreateMessageRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<WireMessage>,
}

#[derive(Serialize)]
struct WireMessage {
    role: &'static str,
    content: Vec<WireBlock>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireBlock {
    Text { text: String },
    Image { source: ImageSource },
}

#[derive(Serialize)]
struct ImageSource {
    r#type: &'static str,
    media_type: String,
    data: String,
}

#[derive(Deserialize)]
struct CreateMessageResponse {
    #[serde(default)]
    content: Vec<Value>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn build_request(model: &str, max_tokens: u32, prompt: &ChatPrompt) -> CreateMessageRequest {
    let content = prompt
        .content
        .iter()
        .map(|block| match block {
            ContentBlock::Text(text) => WireBlock::Text { text: text.clone() },
            ContentBlock::Image(image) => WireBlock::Image {
                source: ImageSource {
                    r#type: "base64",
                    media_type: image.media_type.clone(),
                    data: image.data.clone(),
                },
            },
        })
        .collect();

    CreateMessageRequest {
        model: model.to_string(),
        max_tokens,
        system: prompt.system.clone(),
        messages: vec![WireMessage {
            role: "user",
            content,
        }],
    }
}

fn to_reply_blocks(response: CreateMessageResponse) -> Vec<ReplyBlock> {
    response
        .content
        .into_iter()
        .map(|block| {
            let kind = block.get("type").and_then(Value::as_str).unwrap_or_default();
            match (kind, block.get("text").and_then(Value::as_str)) {
                ("text", Some(text)) => ReplyBlock::Text(text.to_string()),
                _ => ReplyBlock::Other(kind.to_string()),
            }
        })
        .collect()
}

//=========================================================================================
// `ChatCompletionService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ChatCompletionService for AnthropicChatAdapter {
    async fn complete(&self, prompt: &ChatPrompt) -> PortResult<Vec<ReplyBlock>> {
        let request = self.build_request(prompt);

        let response = self
            .client
            .post(&self.url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Anthropic request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|wrapper| wrapper.error.message)
                .unwrap_or(body);
            error!(%status, %message, "Anthropic API returned an error");
            return Err(PortError::Unexpected(message));
        }

        let parsed: CreateMessageResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to parse Anthropic response: {}", e)))?;

        Ok(to_reply_blocks(parsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use study_assistant_core::domain::InlineImage;

    #[test]
    fn request_body_puts_image_before_text() {
        let prompt = ChatPrompt {
            system: "You are Teech".into(),
            content: vec![
                ContentBlock::Image(InlineImage {
                    media_type: "image/png".into(),
                    data: "aGVsbG8=".into(),
                }),
                ContentBlock::Text("Solve this".into()),
            ],
        };

        let body = serde_json::to_value(build_request("claude-sonnet-4-20250514", 1024, &prompt)).unwrap();

        assert_eq!(
            body,
            json!({
                "model": "claude-sonnet-4-20250514",
                "max_tokens": 1024,
                "system": "You are Teech",
                "messages": [{
                    "role": "user",
                    "content": [
                        {
                            "type": "image",
                            "source": { "type": "base64", "media_type": "image/png", "data": "aGVsbG8=" }
                        },
                        { "type": "text", "text": "Solve this" }
                    ]
                }]
            })
        );
    }

    #[test]
    fn response_blocks_keep_non_text_as_other() {
        let response: CreateMessageResponse = serde_json::from_value(json!({
            "content": [
                { "type": "thinking", "thinking": "..." },
                { "type": "text", "text": "A derivative is a rate of change." }
            ]
        }))
        .unwrap();

        assert_eq!(
            to_reply_blocks(response),
            vec![
                ReplyBlock::Other("thinking".into()),
                ReplyBlock::Text("A derivative is a rate of change.".into()),
            ]
        );
    }
}
