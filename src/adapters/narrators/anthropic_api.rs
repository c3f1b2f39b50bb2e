//! Anthropic Messages API narrator.
//!
//! Sends the narrative context as a single user message, with the captured
//! frame attached as a base64 image block when one is available.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{NarrativeContext, NarratorConfig};
use crate::domain::ports::{Narrator, NarratorError};

const SYSTEM_PROMPT: &str = "You are the terse voice of an autonomous observation console. \
Given the current telemetry, reply with one short status line of at most 20 words. \
No preamble, no quotes, no markdown.";

/// Message role in Anthropic API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// Source of an image content block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSource {
    #[serde(rename = "type")]
    pub source_type: String,
    pub media_type: String,
    pub data: String,
}

/// Content block in a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image")]
    Image { source: ImageSource },
    /// Block kinds the narrator has no use for.
    #[serde(other)]
    Other,
}

/// A message in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: Vec<ContentBlock>,
}

/// Request to the Anthropic Messages API.
#[derive(Debug, Serialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    pub system: String,
    pub messages: Vec<Message>,
}

/// Response from the Anthropic Messages API.
#[derive(Debug, Deserialize)]
pub struct MessagesResponse {
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub stop_reason: Option<String>,
}

/// Narrator backed by the Anthropic Messages API.
pub struct AnthropicNarrator {
    config: NarratorConfig,
    api_key: Option<String>,
    client: Client,
}

impl AnthropicNarrator {
    /// Create a narrator. The API key is resolved once, here.
    pub fn new(config: NarratorConfig, timeout: Duration) -> DomainResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                DomainError::ValidationFailed(format!("Failed to create HTTP client: {}", e))
            })?;
        let api_key = config.resolve_api_key();

        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Build the Messages API request from a narrative context.
    pub fn build_request(&self, context: &NarrativeContext) -> MessagesRequest {
        let mut content = Vec::with_capacity(2);
        if let Some(frame) = &context.frame {
            content.push(ContentBlock::Image {
                source: ImageSource {
                    source_type: "base64".to_string(),
                    media_type: frame.media_type.clone(),
                    data: frame.data.clone(),
                },
            });
        }
        content.push(ContentBlock::Text {
            text: context.to_prompt(),
        });

        MessagesRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            system: SYSTEM_PROMPT.to_string(),
            messages: vec![Message {
                role: MessageRole::User,
                content,
            }],
        }
    }
}

/// Join the text blocks of a response into one trimmed line.
fn extract_text(response: &MessagesResponse) -> String {
    response
        .content
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text.trim()),
            _ => None,
        })
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl Narrator for AnthropicNarrator {
    fn name(&self) -> &'static str {
        "anthropic_api"
    }

    async fn narrate(&self, context: &NarrativeContext) -> Result<String, NarratorError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| NarratorError::Unavailable("ANTHROPIC_API_KEY not set".to_string()))?;

        let request = self.build_request(context);
        let response = self
            .client
            .post(format!("{}/v1/messages", self.config.base_url.trim_end_matches('/')))
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-api-key", api_key)
            .header("anthropic-version", &self.config.api_version)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NarratorError::Rejected { status, body });
        }

        let body = response.text().await?;
        let parsed: MessagesResponse = serde_json::from_str(&body)
            .map_err(|e| NarratorError::Malformed(e.to_string()))?;
        debug!(stop_reason = ?parsed.stop_reason, blocks = parsed.content.len(), "narrator replied");

        let text = extract_text(&parsed);
        if text.is_empty() {
            return Err(NarratorError::Empty);
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::CapturedFrame;

    fn context(frame: Option<CapturedFrame>) -> NarrativeContext {
        NarrativeContext {
            target: "North ridge".to_string(),
            uptime: "00:15:00".to_string(),
            current_time: "08:30:00".to_string(),
            phase: "ACQUISITION".to_string(),
            recent_events: "Coverage rising".to_string(),
            coverage_index: 31.0,
            lock_strength: 10.0,
            frame,
        }
    }

    fn narrator() -> AnthropicNarrator {
        let config = NarratorConfig {
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        AnthropicNarrator::new(config, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_request_without_frame_has_only_text() {
        let request = narrator().build_request(&context(None));
        let value = serde_json::to_value(&request).unwrap();
        let content = value["messages"][0]["content"].as_array().unwrap();
        assert_eq!(content.len(), 1);
        assert_eq!(content[0]["type"], "text");
        assert_eq!(value["model"], "claude-3-5-haiku-latest");
        assert_eq!(value["max_tokens"], 120);
    }

    #[test]
    fn test_request_with_frame_puts_image_first() {
        let frame = CapturedFrame {
            media_type: "image/png".to_string(),
            data: "aGVsbG8=".to_string(),
        };
        let request = narrator().build_request(&context(Some(frame)));
        let value = serde_json::to_value(&request).unwrap();
        let content = value["messages"][0]["content"].as_array().unwrap();
        assert_eq!(content.len(), 2);
        assert_eq!(content[0]["type"], "image");
        assert_eq!(content[0]["source"]["type"], "base64");
        assert_eq!(content[0]["source"]["media_type"], "image/png");
        assert_eq!(content[1]["type"], "text");
    }

    #[test]
    fn test_extract_text_skips_other_blocks() {
        let response: MessagesResponse = serde_json::from_str(
            r#"{"content":[{"type":"thinking","thinking":"..."},{"type":"text","text":"  Holding steady. "}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(&response), "Holding steady.");
    }

    #[tokio::test]
    async fn test_missing_key_is_offline() {
        let narrator = temp_env::with_var("ANTHROPIC_API_KEY", None::<&str>, || {
            AnthropicNarrator::new(NarratorConfig::default(), Duration::from_secs(1)).unwrap()
        });
        assert!(!narrator.has_api_key());
        let err = narrator.narrate(&context(None)).await.unwrap_err();
        assert!(err.is_offline());
    }
}
