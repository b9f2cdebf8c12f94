//! OpenAI-compatible streaming chat client
//!
//! Used for every provider that speaks the `/chat/completions` dialect:
//! the HuggingFace router, OpenAI, Perplexity and a local LM Studio server.

use super::sse::{response_events, DEFAULT_IDLE_TIMEOUT};
use super::{check_status, ChatProvider, GenerationParams, LLMError, Message, TextStream};
use crate::config::ProviderConfig;
use async_trait::async_trait;
use futures::{future, StreamExt};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Terminator sent as the final SSE payload
const DONE: &str = "[DONE]";

pub struct OpenAICompatibleProvider {
    name: String,
    config: ProviderConfig,
    api_key: Option<String>,
    local: bool,
    idle_timeout: Duration,
    client: reqwest::Client,
}

impl OpenAICompatibleProvider {
    /// `local` marks a server on this machine (LM Studio); it is independent
    /// of whether an API key is sent.
    pub fn new(
        name: impl Into<String>,
        config: ProviderConfig,
        api_key: Option<String>,
        local: bool,
        client: reqwest::Client,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            api_key,
            local,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            client,
        }
    }

    /// Longest silence tolerated between streamed chunks
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }
}

#[async_trait]
impl ChatProvider for OpenAICompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_local(&self) -> bool {
        self.local
    }

    async fn stream_chat(
        &self,
        messages: &[Message],
        params: &GenerationParams,
    ) -> super::Result<TextStream> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        let api_messages: Vec<_> = messages
            .iter()
            .map(|msg| {
                json!({
                    "role": msg.role.to_string(),
                    "content": msg.content
                })
            })
            .collect();

        let payload = json!({
            "model": self.config.model,
            "messages": api_messages,
            "max_tokens": params.max_tokens,
            "temperature": params.temperature,
            "top_p": params.top_p,
            "stream": true,
        });

        let mut request = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&payload);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        debug!("Streaming chat from {} ({})", self.name, self.config.model);
        let response = check_status(request.send().await?).await?;

        let deltas = response_events(response, self.idle_timeout)
            .take_while(|event| future::ready(!matches!(event, Ok(p) if p.trim() == DONE)))
            .filter_map(|event| {
                future::ready(match event {
                    Ok(payload) => parse_delta(&payload).transpose(),
                    Err(e) => Some(Err(e)),
                })
            });

        Ok(deltas.boxed())
    }
}

/// Extract `choices[0].delta.content` from one streamed chunk.
///
/// Chunks without content (role announcements, finish markers) yield `None`.
pub fn parse_delta(payload: &str) -> super::Result<Option<String>> {
    let data: serde_json::Value =
        serde_json::from_str(payload).map_err(|e| LLMError::ParseError(e.to_string()))?;

    if let Some(error) = data.get("error") {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(LLMError::InvalidRequest(message));
    }

    Ok(data
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|choice| choice.get("delta"))
        .and_then(|delta| delta.get("content"))
        .and_then(|content| content.as_str())
        .filter(|content| !content.is_empty())
        .map(str::to_string))
}
