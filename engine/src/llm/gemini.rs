use super::sse::{response_events, DEFAULT_IDLE_TIMEOUT};
use super::{
    check_status, ChatProvider, GenerationParams, LLMError, Message, MessageRole, TextStream,
};
use crate::config::ProviderConfig;
use async_trait::async_trait;
use futures::{future, StreamExt};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

pub struct GeminiProvider {
    config: ProviderConfig,
    api_key: String,
    idle_timeout: Duration,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(config: ProviderConfig, api_key: String, client: reqwest::Client) -> Self {
        Self {
            config,
            api_key,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            client,
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn is_local(&self) -> bool {
        false
    }

    async fn stream_chat(
        &self,
        messages: &[Message],
        params: &GenerationParams,
    ) -> super::Result<TextStream> {
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse&key={}",
            self.config.base_url.trim_end_matches('/'),
            self.config.model,
            self.api_key
        );

        let mut contents = Vec::new();
        let mut system_instruction = None;

        for msg in messages {
            if msg.role == MessageRole::System {
                system_instruction = Some(json!({
                    "parts": [{"text": msg.content}]
                }));
                continue;
            }

            contents.push(json!({
                "role": if msg.role == MessageRole::Assistant { "model" } else { "user" },
                "parts": [{"text": msg.content}]
            }));
        }

        let mut payload = serde_json::Map::new();
        payload.insert("contents".to_string(), json!(contents));
        payload.insert(
            "generationConfig".to_string(),
            json!({
                "maxOutputTokens": params.max_tokens,
                "temperature": params.temperature,
                "topP": params.top_p,
            }),
        );

        if let Some(sys) = system_instruction {
            payload.insert("systemInstruction".to_string(), sys);
        }

        debug!("Streaming chat from gemini ({})", self.config.model);
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;
        let response = check_status(response).await?;

        let deltas = response_events(response, self.idle_timeout).filter_map(|event| {
            future::ready(match event {
                Ok(payload) => parse_chunk(&payload).transpose(),
                Err(e) => Some(Err(e)),
            })
        });

        Ok(deltas.boxed())
    }
}

/// Join the text parts of `candidates[0]` in one streamed chunk
pub fn parse_chunk(payload: &str) -> super::Result<Option<String>> {
    let data: serde_json::Value =
        serde_json::from_str(payload).map_err(|e| LLMError::ParseError(e.to_string()))?;

    if let Some(error) = data.get("error") {
        return Err(LLMError::InvalidRequest(error.to_string()));
    }

    let Some(parts) = data
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(|p| p.as_array())
    else {
        return Ok(None);
    };

    let mut full_text = String::new();
    for part in parts {
        if let Some(text) = part.get("text").and_then(|t| t.as_str()) {
            full_text.push_str(text);
        }
    }

    Ok(Some(full_text).filter(|t| !t.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chunk_joins_parts() {
        let payload =
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hel"},{"text":"lo"}]}}]}"#;
        assert_eq!(parse_chunk(payload).unwrap(), Some("Hello".to_string()));
    }

    #[test]
    fn test_parse_chunk_without_candidates() {
        let payload = r#"{"usageMetadata":{"totalTokenCount":12}}"#;
        assert_eq!(parse_chunk(payload).unwrap(), None);
    }

    #[test]
    fn test_parse_chunk_error() {
        let payload = r#"{"error":{"code":400,"message":"bad"}}"#;
        assert!(matches!(parse_chunk(payload), Err(LLMError::InvalidRequest(_))));
    }
}
