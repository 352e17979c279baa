//! Anthropic Messages API backend
//!
//! Tools are declared with `input_schema`; the model answers with a list of
//! content blocks where `tool_use` blocks carry already-decoded arguments.
//!
//! # Configuration
//!
//! Environment variables:
//! - `ANTHROPIC_API_KEY`: API key (required)
//! - `ANTHROPIC_HOST`: API URL (default: https://api.anthropic.com)
//! - `ANTHROPIC_MODEL`: Model to use

use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

use super::types::{ChatOutcome, ChatRequest, ToolCall, ToolSpec};
use super::AIBackend;

const DEFAULT_HOST: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
const API_VERSION: &str = "2023-06-01";

/// Anthropic Messages API request
#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
}

/// Message in conversation
#[derive(Debug, Clone, Serialize)]
struct Message {
    role: String,
    content: MessageContent,
}

impl Message {
    fn text(role: &str, text: &str) -> Self {
        Self {
            role: role.to_string(),
            content: MessageContent::Text(text.to_string()),
        }
    }
}

/// Message content (text or blocks)
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

/// Content block types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "image")]
    Image { source: ImageSource },

    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },

    /// Block types this client does not act on (e.g. thinking)
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ImageSource {
    #[serde(rename = "type")]
    kind: String,
    media_type: String,
    data: String,
}

/// Tool definition
#[derive(Debug, Clone, Serialize)]
struct Tool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

impl From<&ToolSpec> for Tool {
    fn from(spec: &ToolSpec) -> Self {
        Self {
            name: spec.name.clone(),
            description: spec.description.clone(),
            input_schema: spec.parameters.clone(),
        }
    }
}

/// Anthropic Messages API response
#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

impl MessagesResponse {
    /// Extract all tool use blocks
    fn tool_calls(&self) -> Vec<ToolCall> {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolUse { id, name, input } => Some(ToolCall {
                    id: id.clone(),
                    name: name.clone(),
                    arguments: input.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    /// Extract text content from the response
    fn text(&self) -> Option<String> {
        let texts: Vec<_> = self
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } if !text.trim().is_empty() => Some(text.as_str()),
                _ => None,
            })
            .collect();

        if texts.is_empty() {
            None
        } else {
            Some(texts.join("\n"))
        }
    }
}

/// Anthropic Messages API backend
#[derive(Clone)]
pub struct AnthropicBackend {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl AnthropicBackend {
    /// Create a new Anthropic backend
    pub fn new(base_url: &str, model: &str, api_key: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Create from environment (requires `ANTHROPIC_API_KEY`)
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").ok()?;
        let base_url = std::env::var("ANTHROPIC_HOST").unwrap_or_else(|_| DEFAULT_HOST.into());
        let model = std::env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());
        Some(Self::new(&base_url, &model, &api_key))
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
    }

    async fn messages(&self, request: &MessagesRequest) -> Result<MessagesResponse> {
        debug!(
            model = %self.model,
            tools_count = request.tools.len(),
            "Sending Anthropic messages request"
        );

        let response = self
            .authorized(
                self.http_client
                    .post(format!("{}/v1/messages", self.base_url)),
            )
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Ai(format!(
                "Anthropic API error ({}): {}",
                status, body
            )));
        }

        let messages_response: MessagesResponse = response.json().await?;

        debug!(
            stop_reason = ?messages_response.stop_reason,
            blocks = messages_response.content.len(),
            "Received Anthropic response"
        );

        Ok(messages_response)
    }
}

#[async_trait]
impl AIBackend for AnthropicBackend {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatOutcome> {
        let mut messages: Vec<Message> = request
            .history
            .iter()
            .map(|turn| Message::text(&turn.role, &turn.content))
            .collect();
        messages.push(Message::text("user", &request.message));

        let response = self
            .messages(&MessagesRequest {
                model: self.model.clone(),
                max_tokens: 4096,
                messages,
                system: Some(request.system.clone()),
                tools: request.tools.iter().map(Tool::from).collect(),
            })
            .await?;

        Ok(ChatOutcome {
            text: response.text(),
            tool_calls: response.tool_calls(),
        })
    }

    async fn describe_image(
        &self,
        system: &str,
        instruction: &str,
        image_data: &[u8],
    ) -> Result<String> {
        let image = ContentBlock::Image {
            source: ImageSource {
                kind: "base64".into(),
                media_type: "image/jpeg".into(),
                data: base64::engine::general_purpose::STANDARD.encode(image_data),
            },
        };

        let response = self
            .messages(&MessagesRequest {
                model: self.model.clone(),
                max_tokens: 500,
                messages: vec![Message {
                    role: "user".into(),
                    content: MessageContent::Blocks(vec![
                        ContentBlock::Text {
                            text: instruction.to_string(),
                        },
                        image,
                    ]),
                }],
                system: Some(system.to_string()),
                tools: Vec::new(),
            })
            .await?;

        response
            .text()
            .ok_or_else(|| Error::Ai("No text in Anthropic vision response".into()))
    }

    async fn health_check(&self) -> bool {
        match self
            .authorized(self.http_client.get(format!("{}/v1/models", self.base_url)))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}
