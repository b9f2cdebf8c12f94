//! Response cache
//!
//! Finished assistant answers keyed by query, mode, provider, reasoning flag
//! and the conversation that preceded the query. Entries are evicted
//! least-recently-used once capacity is reached and expire after a fixed
//! TTL. The cache also keeps request counters for the answers it fronts.

use super::modes::LegalMode;
use crate::llm::Message;
use lru::LruCache;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// Everything an answer depends on
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    query: String,
    mode: LegalMode,
    provider: String,
    use_reasoning: bool,
    history: Vec<Message>,
}

impl CacheKey {
    pub fn new(
        query: &str,
        mode: LegalMode,
        provider: &str,
        use_reasoning: bool,
        history: &[Message],
    ) -> Self {
        Self {
            query: query.to_string(),
            mode,
            provider: provider.to_string(),
            use_reasoning,
            history: history.to_vec(),
        }
    }
}

/// How one request through the cache ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Hit,
    Miss,
    Error,
}

/// Request counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub requests: u64,
    pub hits: u64,
    pub misses: u64,
    pub errors: u64,
    /// Total time spent on requests that did not fail
    #[serde(skip)]
    pub answered_time: Duration,
}

impl CacheStats {
    /// Percentage of requests served from the cache
    pub fn hit_rate(&self) -> f64 {
        if self.requests == 0 {
            return 0.0;
        }
        self.hits as f64 / self.requests as f64 * 100.0
    }

    /// Mean time of requests that did not fail
    pub fn average_response_time(&self) -> Option<Duration> {
        let answered = self.requests - self.errors;
        u32::try_from(answered)
            .ok()
            .filter(|n| *n > 0)
            .map(|n| self.answered_time / n)
    }
}

struct CachedAnswer {
    answer: String,
    stored_at: Instant,
}

struct CacheState {
    entries: LruCache<CacheKey, CachedAnswer>,
    stats: CacheStats,
}

/// LRU answer cache with TTL
pub struct ResponseCache {
    state: Mutex<CacheState>,
    ttl: Duration,
}

impl ResponseCache {
    /// Create a new cache
    ///
    /// * `capacity` - Maximum number of answers kept (at least one)
    /// * `ttl` - How long an answer stays valid after it was stored
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            state: Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                stats: CacheStats::default(),
            }),
            ttl,
        }
    }

    /// Cached answer for a key, dropping it if it has expired
    pub async fn get(&self, key: &CacheKey) -> Option<String> {
        let mut state = self.state.lock().await;
        let expired = state
            .entries
            .peek(key)
            .map(|entry| entry.stored_at.elapsed() >= self.ttl)?;
        if expired {
            state.entries.pop(key);
            debug!("Cached answer expired for query: {:.50}", key.query);
            return None;
        }
        state.entries.get(key).map(|entry| entry.answer.clone())
    }

    pub async fn insert(&self, key: CacheKey, answer: String) {
        let mut state = self.state.lock().await;
        debug!("Caching answer for query: {:.50}", key.query);
        state.entries.push(
            key,
            CachedAnswer {
                answer,
                stored_at: Instant::now(),
            },
        );
    }

    /// Count one request and how long it took
    pub async fn record(&self, elapsed: Duration, outcome: RequestOutcome) {
        let mut state = self.state.lock().await;
        let stats = &mut state.stats;
        stats.requests += 1;
        match outcome {
            RequestOutcome::Hit => stats.hits += 1,
            RequestOutcome::Miss => stats.misses += 1,
            RequestOutcome::Error => stats.errors += 1,
        }
        if outcome != RequestOutcome::Error {
            stats.answered_time += elapsed;
        }
    }

    pub async fn stats(&self) -> CacheStats {
        self.state.lock().await.stats
    }

    /// Number of stored answers, expired ones included until next lookup
    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop every answer; counters are kept
    pub async fn clear(&self) {
        self.state.lock().await.entries.clear();
        debug!("Response cache cleared");
    }
}
