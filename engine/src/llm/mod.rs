//! Chat Provider Abstraction Layer
//!
//! This module provides a common streaming interface over the chat-completion
//! services the legal assistant talks to (HuggingFace router, OpenAI,
//! Perplexity, LM Studio, Gemini). The `ChatProvider` trait yields text
//! deltas as they arrive; `collect_stream` joins them when the caller only
//! wants the final text.

use crate::config::LLMConfig;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub mod gemini;
pub mod openai;
pub mod sse;

pub use gemini::GeminiProvider;
pub use openai::OpenAICompatibleProvider;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Stream of incremental text deltas
pub type TextStream = BoxStream<'static, Result<String>>;

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<reqwest::Error> for LLMError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LLMError::Timeout
        } else {
            LLMError::NetworkError(e.to_string())
        }
    }
}

/// Message in a conversation history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Message {
    /// Role of the message sender (user, assistant, system)
    pub role: MessageRole,

    /// Content of the message
    pub content: String,
}

impl Message {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::System => write!(f, "system"),
        }
    }
}

/// Sampling parameters for one request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 2048,
            temperature: 0.7,
            top_p: 0.95,
        }
    }
}

impl From<&LLMConfig> for GenerationParams {
    fn from(config: &LLMConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
        }
    }
}

/// Chat provider trait that all providers must implement
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Returns the name of the provider (e.g., "openai", "lmstudio")
    fn name(&self) -> &str;

    /// Returns true if this is a local provider, false for cloud providers
    fn is_local(&self) -> bool;

    /// Start a streaming completion.
    ///
    /// Connection and HTTP status errors are returned directly; errors after
    /// the stream has started arrive as `Err` items.
    async fn stream_chat(
        &self,
        messages: &[Message],
        params: &GenerationParams,
    ) -> Result<TextStream>;
}

/// Concatenate every delta of a stream, failing on the first error
pub async fn collect_stream(mut stream: TextStream) -> Result<String> {
    let mut text = String::new();
    while let Some(delta) = stream.next().await {
        text.push_str(&delta?);
    }
    Ok(text)
}

/// Providers served from this machine
pub const LOCAL_PROVIDERS: [&str; 1] = ["lmstudio"];

/// Build the named provider from configuration.
///
/// API keys are read from the environment variable named in the provider's
/// section; providers without one (LM Studio) need no key.
/// `request_timeout_secs` bounds connecting and each silence between
/// streamed chunks, never the whole answer.
pub fn build_provider(config: &LLMConfig, name: &str) -> Result<Box<dyn ChatProvider>> {
    let provider = config
        .provider(name)
        .ok_or_else(|| LLMError::InvalidRequest(format!("Unknown provider '{}'", name)))?;

    let api_key = match &provider.api_key_env {
        Some(var) => Some(std::env::var(var).map_err(|_| {
            LLMError::AuthenticationFailed(format!("environment variable {} is not set", var))
        })?),
        None => None,
    };

    let timeout = Duration::from_secs(config.request_timeout_secs);
    let client = reqwest::Client::builder()
        .connect_timeout(timeout)
        .build()
        .map_err(|e| LLMError::ProviderUnavailable(e.to_string()))?;

    match name {
        "gemini" => {
            let api_key = api_key.ok_or_else(|| {
                LLMError::AuthenticationFailed("Gemini requires an API key".to_string())
            })?;
            Ok(Box::new(
                GeminiProvider::new(provider.clone(), api_key, client).with_idle_timeout(timeout),
            ))
        }
        _ => Ok(Box::new(
            OpenAICompatibleProvider::new(
                name,
                provider.clone(),
                api_key,
                LOCAL_PROVIDERS.contains(&name),
                client,
            )
            .with_idle_timeout(timeout),
        )),
    }
}

/// Map a non-success HTTP status to an error
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    Err(match status.as_u16() {
        401 | 403 => LLMError::AuthenticationFailed(text),
        429 => LLMError::RateLimitExceeded,
        400 | 404 | 422 => LLMError::InvalidRequest(text),
        _ => LLMError::ProviderUnavailable(format!("API error ({}): {}", status, text)),
    })
}
