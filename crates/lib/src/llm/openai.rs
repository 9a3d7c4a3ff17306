//! OpenAI chat completions client (POST {base_url}/chat/completions).
//!
//! Non-streaming, single-turn: each call sends exactly one user message with fixed
//! `max_tokens` and `temperature` taken from config.

use crate::config::OpenAiConfig;
use crate::llm::CompletionService;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Client for an OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    client: reqwest::Client,
}

/// Any failure talking to the completion service or reading its reply.
#[derive(Debug, thiserror::Error)]
pub enum RemoteCallError {
    #[error("openai request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("openai api error: {0}")]
    Api(String),
    #[error("openai response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("openai response contained no message content")]
    EmptyChoices,
}

impl OpenAiClient {
    /// Build a client from config. `base_url` is the resolved API base (see `config::resolve_openai_base_url`).
    /// Fails only if the underlying HTTP client cannot be constructed.
    pub fn new(
        config: &OpenAiConfig,
        base_url: &str,
        api_key: impl Into<String>,
    ) -> Result<Self, RemoteCallError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: config.model.trim().to_string(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            client: builder.build()?,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }

    /// POST /chat/completions — returns the first choice's message content.
    pub async fn chat(&self, prompt: &str) -> Result<String, RemoteCallError> {
        let url = format!("{}/chat/completions", self.base_url);
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(RemoteCallError::Api(format!("{} {}", status, body)));
        }
        let body = res.text().await?;
        let data: ChatResponse = serde_json::from_str(&body)?;
        first_choice_content(data)
    }
}

#[async_trait]
impl CompletionService for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String, RemoteCallError> {
        self.chat(prompt).await
    }
}

// --- wire types ---

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

fn first_choice_content(data: ChatResponse) -> Result<String, RemoteCallError> {
    data.choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .ok_or(RemoteCallError::EmptyChoices)
}
