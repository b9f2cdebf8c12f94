//! Task Context Store
//!
//! Bounded map from task id to either the cancel signal of an in-flight run
//! or the finished context snapshot. Entries are evicted least-recently-used
//! once capacity is reached, and expire after a fixed TTL.

use lru::LruCache;
use sdk::{CancelSignal, ReasoningContext};
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug)]
enum TaskState {
    Running(CancelSignal),
    Finished(Box<ReasoningContext>),
}

#[derive(Debug)]
struct TaskEntry {
    state: TaskState,
    touched_at: Instant,
}

/// LRU-based task store with TTL
pub struct ContextStore {
    cache: Mutex<LruCache<String, TaskEntry>>,
    ttl: Duration,
}

impl ContextStore {
    /// Create a new store
    ///
    /// * `capacity` - Maximum number of tasks to track (at least one)
    /// * `ttl` - How long an entry survives after its last update
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// Track a task that is about to run
    pub async fn start(&self, task_id: &str, signal: CancelSignal) {
        self.put(task_id, TaskState::Running(signal)).await;
    }

    /// Replace a task's cancel signal with its finished context
    pub async fn finish(&self, ctx: ReasoningContext) {
        let task_id = ctx.task_id().to_string();
        self.put(&task_id, TaskState::Finished(Box::new(ctx))).await;
    }

    /// Fire the cancel signal of an in-flight task.
    ///
    /// Returns false when the task is unknown, expired or already finished.
    pub async fn cancel(&self, task_id: &str) -> bool {
        let mut cache = self.cache.lock().await;
        match self.live_entry(&mut cache, task_id) {
            Some(TaskEntry {
                state: TaskState::Running(signal),
                ..
            }) => {
                signal.cancel();
                debug!("Cancel requested for task {}", task_id);
                true
            }
            _ => false,
        }
    }

    /// Snapshot of a finished task's context
    pub async fn context(&self, task_id: &str) -> Option<ReasoningContext> {
        let mut cache = self.cache.lock().await;
        match self.live_entry(&mut cache, task_id) {
            Some(TaskEntry {
                state: TaskState::Finished(ctx),
                ..
            }) => Some((**ctx).clone()),
            _ => None,
        }
    }

    /// Drop a task's entry. Returns true if one was present.
    pub async fn reap(&self, task_id: &str) -> bool {
        self.cache.lock().await.pop(task_id).is_some()
    }

    /// Remove expired entries, returning how many were dropped
    pub async fn prune_expired(&self) -> usize {
        let mut cache = self.cache.lock().await;
        let now = Instant::now();

        let expired_keys: Vec<String> = cache
            .iter()
            .filter(|(_, entry)| now.duration_since(entry.touched_at) >= self.ttl)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            cache.pop(key);
        }

        expired_keys.len()
    }

    /// Number of tracked tasks, expired ones excluded
    pub async fn len(&self) -> usize {
        self.prune_expired().await;
        self.cache.lock().await.len()
    }

    async fn put(&self, task_id: &str, state: TaskState) {
        let mut cache = self.cache.lock().await;
        let evicted = cache.push(
            task_id.to_string(),
            TaskEntry {
                state,
                touched_at: Instant::now(),
            },
        );
        if let Some((key, _)) = evicted {
            if key != task_id {
                debug!("Evicted task {} from context store", key);
            }
        }
    }

    fn live_entry<'a>(
        &self,
        cache: &'a mut LruCache<String, TaskEntry>,
        task_id: &str,
    ) -> Option<&'a TaskEntry> {
        let expired = cache
            .peek(task_id)
            .map(|entry| entry.touched_at.elapsed() >= self.ttl)?;
        if expired {
            cache.pop(task_id);
            return None;
        }
        cache.get(task_id)
    }
}
