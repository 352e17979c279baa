//! Pluggable AI backend abstraction
//!
//! This module provides a backend-agnostic interface for the two AI-assisted
//! features: tool-calling chat and receipt image extraction.
//!
//! # Architecture
//!
//! - `AIBackend` trait: defines the interface for all AI operations
//! - `AIClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `OpenAICompatibleBackend`, `AnthropicBackend`, `MockBackend`
//!
//! # Usage
//!
//! ```rust,ignore
//! let ai = AIClient::from_env();
//!
//! if let Some(ref client) = ai {
//!     let outcome = client.chat(&request).await?;
//! }
//! ```
//!
//! # Configuration
//!
//! Environment variables:
//! - `AI_BACKEND`: Backend to use (openai, anthropic, mock). Default: openai
//! - `OPENAI_COMPATIBLE_HOST`: Server URL (required for openai backend)
//! - `OPENAI_COMPATIBLE_MODEL`: Model name (default: gpt-4o)
//! - `OPENAI_COMPATIBLE_API_KEY`: API key if required (optional)
//! - `ANTHROPIC_HOST`: Messages API URL (default: https://api.anthropic.com)
//! - `ANTHROPIC_MODEL`: Model name
//! - `ANTHROPIC_API_KEY`: API key (required for anthropic backend)

mod anthropic;
mod mock;
mod openai_compatible;
pub mod parsing;
pub mod types;

pub use anthropic::AnthropicBackend;
pub use mock::MockBackend;
pub use openai_compatible::OpenAICompatibleBackend;
pub use types::*;

use async_trait::async_trait;

use crate::error::Result;

/// Trait defining the interface for all AI backends
///
/// Backends should be Send + Sync to allow use across async tasks.
#[async_trait]
pub trait AIBackend: Send + Sync {
    /// One chat round: the model answers with text and/or tool calls
    async fn chat(&self, request: &ChatRequest) -> Result<ChatOutcome>;

    /// Ask a vision-capable model about a JPEG image; returns the raw reply text
    async fn describe_image(
        &self,
        system: &str,
        instruction: &str,
        image_data: &[u8],
    ) -> Result<String>;

    /// Check if the backend is available
    async fn health_check(&self) -> bool;

    /// Get the model name
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete AI client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum AIClient {
    /// OpenAI Chat Completions API (or any compatible server)
    OpenAICompatible(OpenAICompatibleBackend),
    /// Anthropic Messages API
    Anthropic(AnthropicBackend),
    /// Mock backend for testing
    Mock(MockBackend),
}

impl AIClient {
    /// Create an AI client from environment variables
    ///
    /// Checks `AI_BACKEND` to determine which backend to use:
    /// - `openai` (default): Uses OPENAI_COMPATIBLE_HOST and OPENAI_COMPATIBLE_MODEL
    /// - `anthropic`: Uses ANTHROPIC_API_KEY, ANTHROPIC_HOST and ANTHROPIC_MODEL
    /// - `mock`: Creates a mock backend for testing
    ///
    /// Returns None if the required environment variables are not set.
    pub fn from_env() -> Option<Self> {
        let backend = std::env::var("AI_BACKEND").unwrap_or_else(|_| "openai".to_string());

        match backend.to_lowercase().as_str() {
            "openai" | "openai_compatible" => {
                OpenAICompatibleBackend::from_env().map(AIClient::OpenAICompatible)
            }
            "anthropic" | "claude" => AnthropicBackend::from_env().map(AIClient::Anthropic),
            "mock" => Some(AIClient::Mock(MockBackend::new())),
            _ => {
                tracing::warn!(backend = %backend, "Unknown AI_BACKEND, falling back to openai");
                OpenAICompatibleBackend::from_env().map(AIClient::OpenAICompatible)
            }
        }
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        AIClient::Mock(MockBackend::new())
    }

    /// Short backend label for startup logs
    pub fn backend_name(&self) -> &'static str {
        match self {
            AIClient::OpenAICompatible(_) => "openai",
            AIClient::Anthropic(_) => "anthropic",
            AIClient::Mock(_) => "mock",
        }
    }
}

// Implement AIBackend for AIClient by delegating to the inner backend
#[async_trait]
impl AIBackend for AIClient {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatOutcome> {
        match self {
            AIClient::OpenAICompatible(b) => b.chat(request).await,
            AIClient::Anthropic(b) => b.chat(request).await,
            AIClient::Mock(b) => b.chat(request).await,
        }
    }

    async fn describe_image(
        &self,
        system: &str,
        instruction: &str,
        image_data: &[u8],
    ) -> Result<String> {
        match self {
            AIClient::OpenAICompatible(b) => b.describe_image(system, instruction, image_data).await,
            AIClient::Anthropic(b) => b.describe_image(system, instruction, image_data).await,
            AIClient::Mock(b) => b.describe_image(system, instruction, image_data).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            AIClient::OpenAICompatible(b) => b.health_check().await,
            AIClient::Anthropic(b) => b.health_check().await,
            AIClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            AIClient::OpenAICompatible(b) => b.model(),
            AIClient::Anthropic(b) => b.model(),
            AIClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AIClient::OpenAICompatible(b) => b.host(),
            AIClient::Anthropic(b) => b.host(),
            AIClient::Mock(b) => b.host(),
        }
    }
}
