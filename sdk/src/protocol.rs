//! Protocol trait and reasoning context types
//!
//! This module defines the `Protocol` trait that every reasoning protocol must
//! implement, and the `ReasoningContext` threaded through a single run of the
//! brain. A context belongs to exactly one in-flight task; protocols see it by
//! shared reference and may only write to its scratch memory.

use crate::types::{HistoryEntry, ProtocolArgs, ProtocolCategory, ProtocolResult};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Notify;

/// Trait that all reasoning protocols must implement
///
/// Expected failures are reported as `Ok(ProtocolResult::failed(..))`.
/// An `Err` means something unexpected happened; the execution engine
/// converts it into a failed result, so it never reaches the caller.
#[async_trait]
pub trait Protocol: Send + Sync {
    /// Unique registry key, e.g. "Chain-of-Thought"
    fn name(&self) -> &str;

    /// Category used for listing
    fn category(&self) -> ProtocolCategory;

    /// Short human-readable description
    fn description(&self) -> &str {
        ""
    }

    /// Check the context before running. The default rejects blank queries.
    fn validate_input(&self, ctx: &ReasoningContext) -> bool {
        !ctx.query().trim().is_empty()
    }

    /// Run the protocol against the context
    async fn execute(
        &self,
        ctx: &ReasoningContext,
        args: &ProtocolArgs,
    ) -> anyhow::Result<ProtocolResult>;
}

/// Cooperative cancellation signal shared between a task and its owner.
///
/// Cloning yields a handle to the same signal.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    inner: Arc<CancelInner>,
}

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the signal. Idempotent.
    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once the signal has fired.
    pub async fn cancelled(&self) {
        loop {
            // Register before checking the flag so a concurrent cancel() is not missed
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Context maintained across one reasoning run
#[derive(Debug)]
pub struct ReasoningContext {
    task_id: String,
    query: String,
    history: Vec<HistoryEntry>,
    memory: Mutex<Map<String, Value>>,
    /// Open-ended attachments, stored but not interpreted by the engine
    pub metadata: Map<String, Value>,
    pub quantum_resources: Option<Value>,
    cancel: CancelSignal,
}

impl ReasoningContext {
    /// Create a new context for a query
    pub fn new(task_id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            query: query.into(),
            history: Vec::new(),
            memory: Mutex::new(Map::new()),
            metadata: Map::new(),
            quantum_resources: None,
            cancel: CancelSignal::new(),
        }
    }

    /// Attach an existing cancellation signal
    pub fn with_cancel_signal(mut self, signal: CancelSignal) -> Self {
        self.cancel = signal;
        self
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Append a history record. History is append-only.
    pub fn record(&mut self, entry: HistoryEntry) {
        self.history.push(entry);
    }

    /// Append the history record for a finished protocol
    pub fn record_result(&mut self, result: &ProtocolResult) {
        self.record(HistoryEntry::from(result));
    }

    pub fn cancel_signal(&self) -> &CancelSignal {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Read a memory value
    pub fn memory_get(&self, key: &str) -> Option<Value> {
        self.lock_memory().get(key).cloned()
    }

    /// Write a memory value, returning the previous one
    pub fn memory_insert(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.lock_memory().insert(key.into(), value)
    }

    /// Append to the array stored under `key`, creating it if needed.
    ///
    /// A non-array value under `key` is replaced by a one-element array.
    /// Returns the new array length.
    pub fn memory_push(&self, key: &str, value: Value) -> usize {
        let mut memory = self.lock_memory();
        let slot = memory
            .entry(key.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if !slot.is_array() {
            *slot = Value::Array(Vec::new());
        }
        match slot {
            Value::Array(items) => {
                items.push(value);
                items.len()
            }
            _ => 0,
        }
    }

    /// Copy of the whole scratch memory
    pub fn memory_snapshot(&self) -> Map<String, Value> {
        self.lock_memory().clone()
    }

    fn lock_memory(&self) -> std::sync::MutexGuard<'_, Map<String, Value>> {
        // Memory stays usable even if a protocol panicked mid-write
        self.memory.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clone for ReasoningContext {
    fn clone(&self) -> Self {
        Self {
            task_id: self.task_id.clone(),
            query: self.query.clone(),
            history: self.history.clone(),
            memory: Mutex::new(self.memory_snapshot()),
            metadata: self.metadata.clone(),
            quantum_resources: self.quantum_resources.clone(),
            cancel: self.cancel.clone(),
        }
    }
}
