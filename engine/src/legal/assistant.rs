//! Legal Assistant
//!
//! Runs the reasoning brain over a user query, folds the resulting traces
//! into the mode's system prompt and streams an answer from a chat provider.
//! With a response cache attached, complete answers are replayed instead of
//! asking the provider again.

use super::cache::{CacheKey, CacheStats, RequestOutcome, ResponseCache};
use super::modes::LegalMode;
use crate::brain::{Brain, ExecutionMode, ProcessRequest, ProcessSummary};
use crate::llm::{ChatProvider, GenerationParams, Message};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Trace items quoted per protocol in the reasoning analysis
const TRACE_ITEMS_PER_PROTOCOL: usize = 2;

/// A query ready to send to a chat provider
#[derive(Debug, Clone)]
pub struct PreparedQuery {
    pub mode: LegalMode,
    /// System message content
    pub enhanced_query: String,
    /// Brain summary, present when reasoning ran
    pub reasoning: Option<ProcessSummary>,
}

pub struct LegalAssistant {
    brain: Arc<Brain>,
    provider: Box<dyn ChatProvider>,
    cache: Option<ResponseCache>,
}

impl LegalAssistant {
    pub fn new(brain: Arc<Brain>, provider: Box<dyn ChatProvider>) -> Self {
        Self {
            brain,
            provider,
            cache: None,
        }
    }

    /// Replay complete answers from `cache`
    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Request counters of the attached cache
    pub async fn cache_stats(&self) -> Option<CacheStats> {
        match &self.cache {
            Some(cache) => Some(cache.stats().await),
            None => None,
        }
    }

    /// Run reasoning (if enabled) and build the system message
    pub async fn prepare(&self, query: &str, mode: LegalMode, use_reasoning: bool) -> PreparedQuery {
        let reasoning = if use_reasoning {
            let request = ProcessRequest::new(query)
                .preference("use_reflection", mode.uses_reflection())
                .preference("multi_agent", false)
                .execution_mode(ExecutionMode::Sequential);
            Some(self.brain.process(request).await)
        } else {
            None
        };

        let enhanced_query = enhanced_query(mode, query, reasoning.as_ref());
        PreparedQuery {
            mode,
            enhanced_query,
            reasoning,
        }
    }

    /// Answer a query, streaming deltas through `on_chunk`.
    ///
    /// The returned text starts with a banner listing the applied protocols
    /// when reasoning ran. An error after streaming began is appended to the
    /// partial answer; an error starting the stream is returned. A cached
    /// answer is passed to `on_chunk` in one piece. Only answers that
    /// streamed to the end are cached.
    pub async fn respond<F>(
        &self,
        query: &str,
        chat_history: &[Message],
        mode: LegalMode,
        use_reasoning: bool,
        params: &GenerationParams,
        mut on_chunk: F,
    ) -> crate::llm::Result<String>
    where
        F: FnMut(&str) + Send,
    {
        let Some(cache) = &self.cache else {
            return self
                .stream_answer(query, chat_history, mode, use_reasoning, params, &mut on_chunk)
                .await
                .map(|(answer, _)| answer);
        };

        let started = Instant::now();
        let key = CacheKey::new(
            query,
            mode,
            self.provider.name(),
            use_reasoning,
            chat_history,
        );
        if let Some(answer) = cache.get(&key).await {
            debug!("Answering from cache in {} mode", mode);
            on_chunk(&answer);
            cache.record(started.elapsed(), RequestOutcome::Hit).await;
            return Ok(answer);
        }

        let outcome = self
            .stream_answer(query, chat_history, mode, use_reasoning, params, &mut on_chunk)
            .await;
        match &outcome {
            Ok((answer, true)) => {
                cache.insert(key, answer.clone()).await;
                cache.record(started.elapsed(), RequestOutcome::Miss).await;
            }
            _ => cache.record(started.elapsed(), RequestOutcome::Error).await,
        }
        outcome.map(|(answer, _)| answer)
    }

    /// Stream one answer from the provider; the flag is false when the
    /// stream broke off with an error.
    async fn stream_answer<F>(
        &self,
        query: &str,
        chat_history: &[Message],
        mode: LegalMode,
        use_reasoning: bool,
        params: &GenerationParams,
        on_chunk: &mut F,
    ) -> crate::llm::Result<(String, bool)>
    where
        F: FnMut(&str) + Send,
    {
        let prepared = self.prepare(query, mode, use_reasoning).await;

        let mut messages = Vec::with_capacity(chat_history.len() + 2);
        messages.push(Message::system(&prepared.enhanced_query));
        messages.extend(chat_history.iter().filter(|m| !m.content.is_empty()).cloned());
        messages.push(Message::user(query));

        let mut response = prepared
            .reasoning
            .as_ref()
            .map(reasoning_banner)
            .unwrap_or_default();
        if !response.is_empty() {
            on_chunk(&response);
        }

        info!(
            "Asking {} in {} mode ({} messages)",
            self.provider.name(),
            mode,
            messages.len()
        );
        let mut stream = self.provider.stream_chat(&messages, params).await?;

        while let Some(delta) = stream.next().await {
            match delta {
                Ok(text) => {
                    on_chunk(&text);
                    response.push_str(&text);
                }
                Err(e) => {
                    warn!("Stream from {} failed: {}", self.provider.name(), e);
                    let suffix = format!("\n\nError: {}", e);
                    on_chunk(&suffix);
                    response.push_str(&suffix);
                    return Ok((response, false));
                }
            }
        }

        Ok((response, true))
    }
}

/// Build the system message from the mode prompt and a brain summary.
///
/// The reasoning analysis is included only when the summary succeeded.
pub fn enhanced_query(mode: LegalMode, query: &str, reasoning: Option<&ProcessSummary>) -> String {
    let prompt = mode.system_prompt();

    match reasoning {
        Some(summary) if summary.success => {
            let analysis: Vec<String> = summary
                .results
                .iter()
                .map(|r| {
                    let steps: Vec<&str> = r
                        .trace
                        .iter()
                        .take(TRACE_ITEMS_PER_PROTOCOL)
                        .map(String::as_str)
                        .collect();
                    format!("{}: {}", r.protocol, steps.join(", "))
                })
                .collect();
            format!(
                "{}\n\nReasoning Analysis:\n{}\n\nUser Query: {}",
                prompt,
                analysis.join("\n"),
                query
            )
        }
        _ => format!("{}\n\nUser Query: {}", prompt, query),
    }
}

/// Banner listing each applied protocol and its status
pub fn reasoning_banner(summary: &ProcessSummary) -> String {
    let mut banner = String::from("Reasoning Protocols Applied:\n");
    for r in &summary.results {
        banner.push_str(&format!("- {}: {}\n", r.protocol, r.status));
    }
    banner.push('\n');
    banner
}
