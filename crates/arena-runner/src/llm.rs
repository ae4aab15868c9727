//! OpenAI-compatible chat-completions client.
//!
//! Implements [`ModelClient`] over any `/v1/chat/completions` endpoint
//! (vLLM, llama.cpp server, hosted APIs). Transient failures (connection
//! errors, timeouts, 5xx, 429) are retried with exponential backoff up to
//! `max_retries` times; anything else surfaces immediately.

use std::time::Duration;

use anyhow::Context;
use arena_core::{ChatMessage, Completion, GenerationError, ModelClient, ModelConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::EndpointConfig;

/// Ceiling on a single backoff sleep.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    /// Reasoning models put their chain of thought here.
    #[serde(default)]
    reasoning_content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// HTTP model client with bounded retry.
pub struct OpenAiCompatClient {
    http: reqwest::Client,
    endpoint: EndpointConfig,
}

impl OpenAiCompatClient {
    pub fn new(endpoint: EndpointConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(endpoint.timeout())
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { http, endpoint })
    }

    async fn attempt(&self, request: &ChatRequest<'_>) -> Result<Completion, GenerationError> {
        let mut builder = self.http.post(&self.endpoint.url).json(request);
        if let Some(key) = &self.endpoint.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                GenerationError::Timeout(self.endpoint.timeout())
            } else {
                GenerationError::RequestFailed(format!("HTTP request failed: {}", e))
            }
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::BadStatus { status, body });
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                GenerationError::Timeout(self.endpoint.timeout())
            } else {
                GenerationError::RequestFailed(format!("Failed to parse response: {}", e))
            }
        })?;

        into_completion(chat_response)
    }
}

#[async_trait]
impl ModelClient for OpenAiCompatClient {
    async fn generate(
        &self,
        conversation: &[ChatMessage],
        config: &ModelConfig,
    ) -> Result<Completion, GenerationError> {
        let request = ChatRequest {
            model: &config.model,
            messages: conversation,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        };

        let mut retries = 0;
        loop {
            match self.attempt(&request).await {
                Ok(completion) => {
                    debug!(
                        model = %config.model,
                        input_tokens = completion.input_tokens,
                        output_tokens = completion.output_tokens,
                        retries,
                        "Model call complete"
                    );
                    return Ok(completion);
                }
                Err(e) if e.is_transient() && retries < self.endpoint.max_retries => {
                    let delay = backoff_delay(self.endpoint.backoff(), retries);
                    warn!(
                        model = %config.model,
                        retry = retries + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Model call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    retries += 1;
                }
                Err(GenerationError::BadStatus { status: 429, .. }) => {
                    return Err(GenerationError::RateLimited {
                        attempts: retries + 1,
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Delay before retry number `retry` (zero-based): `base * 2^retry`, capped.
pub fn backoff_delay(base: Duration, retry: u32) -> Duration {
    base.saturating_mul(1u32 << retry.min(16)).min(MAX_BACKOFF)
}

fn into_completion(response: ChatResponse) -> Result<Completion, GenerationError> {
    let usage = response.usage.unwrap_or_default();
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or(GenerationError::EmptyResponse)?;

    let ResponseMessage {
        content,
        reasoning_content,
    } = choice.message;
    let text = match (content, reasoning_content) {
        (Some(answer), _) if !answer.trim().is_empty() => answer,
        (_, Some(reasoning)) if !reasoning.trim().is_empty() => reasoning,
        _ => return Err(GenerationError::EmptyResponse),
    };

    Ok(Completion {
        text,
        input_tokens: usage.prompt_tokens,
        output_tokens: usage.completion_tokens,
    })
}
