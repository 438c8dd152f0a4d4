//! OpenAI-compatible provider driver.
//!
//! This driver speaks the `/v1/chat/completions` protocol, which covers
//! Groq, OpenAI, and most self-hosted gateways.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::{ResearchError, ResearchResult};
use crate::llm::{ChatClient, ChatRequest, LlmSettings};

/// Request timeout for chat completions.
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(120);

/// OpenAI-compatible API driver.
#[derive(Debug, Clone)]
pub struct OpenAiCompatClient {
    settings: LlmSettings,
    client: Client,
}

impl OpenAiCompatClient {
    /// Create a new driver from settings.
    pub fn new(settings: LlmSettings) -> ResearchResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ResearchError::Network(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { settings, client })
    }

    /// Build the API URL.
    ///
    /// Groq nests the OpenAI-compatible surface under `/openai`.
    fn api_url(&self) -> String {
        let base = self.settings.base_url.trim_end_matches('/');
        match self.settings.provider {
            crate::llm::Provider::Groq => format!("{base}/openai/v1/chat/completions"),
            _ => format!("{base}/v1/chat/completions"),
        }
    }
}

#[async_trait]
impl ChatClient for OpenAiCompatClient {
    async fn complete(&self, req: ChatRequest) -> ResearchResult<String> {
        // Short-circuit before any network traffic when the credential is
        // absent or malformed; callers degrade to their local defaults.
        if !self.settings.has_usable_key() {
            return Err(ResearchError::Configuration(
                "No usable LLM API key configured (set GROQ_API_KEY)".to_string(),
            ));
        }

        let model = req.model.as_ref().unwrap_or(&self.settings.model);
        let max_tokens = req.max_tokens.unwrap_or(self.settings.max_tokens);

        let body = serde_json::json!({
            "model": model,
            "messages": req.messages,
            "temperature": req.temperature,
            "max_tokens": max_tokens,
        });

        let mut request = self.client.post(self.api_url()).json(&body);
        if let Some(ref api_key) = self.settings.api_key {
            request = request.header("Authorization", format!("Bearer {api_key}"));
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ResearchError::Http {
                status: status.as_u16(),
                message: text,
            });
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ResearchError::Decode(format!("Malformed completion payload: {e}")))?;

        if let Some(usage) = completion.usage {
            tracing::debug!(
                model = %model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "Chat completion finished"
            );
        }

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                ResearchError::Decode("Completion response contained no choices".to_string())
            })
    }
}

/// Chat completion response payload.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}
