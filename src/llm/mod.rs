//! Generation client traits and implementations.
//!
//! This module provides the abstraction over chat-completion providers
//! used by the planner, reflector, and synthesizer. The [`ChatClient`]
//! trait defines a single whole-response operation; the research loop
//! has no use for token streaming.
//!
//! # Drivers
//!
//! - [`providers::OpenAiCompatClient`]: OpenAI-compatible chat APIs
//!   (Groq, OpenAI, and self-hosted gateways speaking the same protocol)

pub mod providers;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ResearchResult;

/// LLM connection and model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Base URL for the LLM API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// API key for authentication.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Model used for reflection and synthesis.
    #[serde(default = "default_model")]
    pub model: String,
    /// Model used for query planning.
    #[serde(default = "default_planner_model")]
    pub planner_model: String,
    /// Provider type.
    #[serde(default)]
    pub provider: Provider,
    /// Maximum tokens to generate.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_base_url() -> String {
    Provider::Groq.default_base_url().to_string()
}

fn default_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_planner_model() -> String {
    "qwen-qwq-32b".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            model: default_model(),
            planner_model: default_planner_model(),
            provider: Provider::Groq,
            max_tokens: default_max_tokens(),
        }
    }
}

impl LlmSettings {
    /// Whether the configured credential looks usable.
    ///
    /// Provider keys are opaque, but anything shorter than 20 characters
    /// is certainly not one; treating it as absent avoids burning a
    /// request on a guaranteed auth failure.
    pub fn has_usable_key(&self) -> bool {
        self.api_key.as_ref().is_some_and(|k| k.len() > 20)
    }
}

/// Supported LLM providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Groq.
    #[default]
    Groq,
    /// OpenAI and compatible APIs.
    OpenAi,
    /// Custom/unknown provider.
    Custom,
}

impl Provider {
    /// Get the default base URL for this provider.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Groq => "https://api.groq.com",
            Self::OpenAi => "https://api.openai.com",
            Self::Custom => "",
        }
    }
}

/// A message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message author.
    pub role: MessageRole,
    /// Content of the message.
    pub content: String,
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Role of a message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System prompt.
    System,
    /// User message.
    User,
    /// Assistant response.
    Assistant,
}

/// Request to a chat client.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Conversation messages.
    pub messages: Vec<Message>,
    /// Model to use (overrides settings).
    pub model: Option<String>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Max tokens (overrides settings).
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    /// Create a new request with messages.
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            model: None,
            temperature: 0.7,
            max_tokens: None,
        }
    }

    /// Override the model for this request.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Trait for whole-response chat clients.
///
/// Implementations must be `Send + Sync` so that one client can be
/// shared across the planner, reflector, and synthesizer.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send a request and return the assistant's text content.
    async fn complete(&self, req: ChatRequest) -> ResearchResult<String>;
}
