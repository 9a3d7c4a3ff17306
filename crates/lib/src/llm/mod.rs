//! Completion service abstraction and OpenAI chat completions client.
//!
//! The bridge only depends on [`CompletionService`]; [`OpenAiClient`] is the production implementation.

mod openai;

pub use openai::{OpenAiClient, RemoteCallError};

use async_trait::async_trait;

/// Maps a single prompt to generated text. One call, one request; no history is kept between calls.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Send `prompt` as a single user message and return the first choice's content (untrimmed).
    async fn complete(&self, prompt: &str) -> Result<String, RemoteCallError>;
}
