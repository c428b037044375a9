//! OpenAI-compatible HTTP backend

use crate::llm::{LlmBackend, LlmClientConfig, LlmError, LlmMode};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    stop: &'a [String],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    stop: &'a [String],
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    message: Option<ChatChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Backend speaking the OpenAI completions / chat completions API
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    client: reqwest::Client,
    config: LlmClientConfig,
}

impl OpenAiBackend {
    pub fn new(config: LlmClientConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &LlmClientConfig {
        &self.config
    }

    fn endpoint(&self, mode: LlmMode) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        match mode {
            LlmMode::Completion => format!("{}/completions", base),
            LlmMode::Chat => format!("{}/chat/completions", base),
        }
    }

    fn request_body(&self, prompt: &str, mode: LlmMode) -> Result<serde_json::Value, LlmError> {
        let body = match mode {
            LlmMode::Completion => serde_json::to_value(CompletionRequest {
                model: &self.config.model,
                prompt,
                temperature: self.config.temperature,
                max_tokens: self.config.max_tokens,
                stop: &self.config.stop,
            }),
            LlmMode::Chat => serde_json::to_value(ChatRequest {
                model: &self.config.model,
                messages: vec![ChatMessage {
                    role: "user",
                    content: prompt,
                }],
                temperature: self.config.temperature,
                max_tokens: self.config.max_tokens,
                stop: &self.config.stop,
            }),
        };
        body.map_err(|e| LlmError::Internal(format!("Failed to encode request: {}", e)))
    }

    fn extract_output(response: CompletionResponse) -> Result<String, LlmError> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyResponse)?;

        choice
            .message
            .and_then(|m| m.content)
            .or(choice.text)
            .ok_or(LlmError::EmptyResponse)
    }
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    async fn invoke(&self, prompt: &str, mode: LlmMode) -> Result<String, LlmError> {
        let url = self.endpoint(mode);
        let body = self.request_body(prompt, mode)?;
        debug!("POST {} ({} prompt, {} chars)", url, mode, prompt.len());

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout(self.config.timeout_secs)
            } else {
                LlmError::Http(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!("{} returned {}: {}", url, status, text.trim());
            return Err(LlmError::Api(format!("{}: {}", status, text.trim())));
        }

        let parsed: CompletionResponse = response.json().await?;
        Self::extract_output(parsed)
    }

    fn name(&self) -> &str {
        "openai"
    }
}
