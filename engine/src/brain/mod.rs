//! Reasoning Brain
//!
//! The `Brain` owns the protocol registry, the keyword router, the execution
//! engine and a bounded store of task contexts. `process` is the single
//! entry point: it creates a context, routes the query, runs the selected
//! protocols and returns a serializable summary.
//!
//! # Examples
//!
//! ```no_run
//! use lexbrain_engine::brain::{Brain, ProcessRequest};
//!
//! # async fn run() {
//! let brain = Brain::default();
//! let summary = brain
//!     .process(ProcessRequest::new("verify this clause").preference("use_reflection", true))
//!     .await;
//! assert_eq!(summary.protocols_used, vec!["Self-Consistency", "Reflexion"]);
//! # }
//! ```

pub mod executor;
pub mod protocols;
pub mod registry;
pub mod router;
pub mod store;

pub use executor::ExecutionEngine;
pub use registry::ProtocolRegistry;
pub use router::{KeywordRoute, Preferences, ProtocolRouter};
pub use store::ContextStore;

use crate::config::BrainConfig;
use sdk::{
    CancelSignal, ExecutionStatus, HistoryEntry, Protocol, ProtocolArgs, ProtocolResult,
    ReasoningContext,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tracing::{info, warn};

/// How a run's protocols are executed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Sequential,
    Parallel,
}

impl From<&str> for ExecutionMode {
    /// `"parallel"` selects parallel mode; anything else is sequential
    fn from(value: &str) -> Self {
        if value == "parallel" {
            ExecutionMode::Parallel
        } else {
            ExecutionMode::Sequential
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Sequential => write!(f, "sequential"),
            ExecutionMode::Parallel => write!(f, "parallel"),
        }
    }
}

/// Input to `Brain::process`
#[derive(Debug, Clone, Default)]
pub struct ProcessRequest {
    pub query: String,
    pub task_id: Option<String>,
    pub preferences: Preferences,
    /// `None` uses the brain's configured default
    pub execution_mode: Option<ExecutionMode>,
    pub args: ProtocolArgs,
    pub stop_on_failure: bool,
    pub metadata: Map<String, Value>,
    pub quantum_resources: Option<Value>,
}

impl ProcessRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn preference(mut self, key: impl Into<String>, value: bool) -> Self {
        self.preferences.insert(key.into(), value);
        self
    }

    pub fn execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.execution_mode = Some(mode);
        self
    }

    pub fn args(mut self, args: ProtocolArgs) -> Self {
        self.args = args;
        self
    }

    pub fn stop_on_failure(mut self, stop: bool) -> Self {
        self.stop_on_failure = stop;
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn quantum_resources(mut self, resources: Value) -> Self {
        self.quantum_resources = Some(resources);
        self
    }
}

/// One protocol's result as reported in a summary
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProtocolOutcome {
    pub protocol: String,
    pub status: ExecutionStatus,
    pub output: Value,
    pub trace: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<ProtocolResult> for ProtocolOutcome {
    fn from(result: ProtocolResult) -> Self {
        Self {
            protocol: result.protocol_name,
            status: result.status,
            output: result.output,
            trace: result.reasoning_trace,
            error: result.error,
        }
    }
}

/// Output of `Brain::process`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessSummary {
    pub task_id: String,
    pub query: String,
    pub protocols_used: Vec<String>,
    pub results: Vec<ProtocolOutcome>,
    pub context_history: Vec<HistoryEntry>,
    /// True iff every result is SUCCESS
    pub success: bool,
}

/// Facade over registry, router, engine and task store
pub struct Brain {
    registry: Arc<RwLock<ProtocolRegistry>>,
    router: ProtocolRouter,
    engine: ExecutionEngine,
    store: ContextStore,
    default_mode: ExecutionMode,
}

impl Default for Brain {
    fn default() -> Self {
        Self::new(&BrainConfig::default())
    }
}

impl Brain {
    /// Build a brain with the built-in protocols and the given settings
    pub fn new(config: &BrainConfig) -> Self {
        let registry = ProtocolRegistry::with_builtin_protocols();
        for name in &config.disabled_protocols {
            if !registry.set_enabled(name, false) {
                warn!("Cannot disable unknown protocol '{}'", name);
            }
        }

        let registry = Arc::new(RwLock::new(registry));
        let engine = ExecutionEngine::new(
            Arc::clone(&registry),
            Duration::from_secs(config.protocol_timeout_secs),
        );
        let router = ProtocolRouter::with_extra_routes(config.routes.iter().map(KeywordRoute::from));
        let store = ContextStore::new(
            config.max_active_contexts,
            Duration::from_secs(config.context_ttl_secs),
        );

        info!(
            "Brain ready with {} protocols (timeout {}s)",
            read(&registry).len(),
            config.protocol_timeout_secs
        );

        Self {
            registry,
            router,
            engine,
            store,
            default_mode: ExecutionMode::from(config.default_execution_mode.as_str()),
        }
    }

    /// Route and run a query
    pub async fn process(&self, request: ProcessRequest) -> ProcessSummary {
        let task_id = request
            .task_id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let signal = CancelSignal::new();

        let mut ctx = ReasoningContext::new(task_id.clone(), request.query)
            .with_cancel_signal(signal.clone());
        ctx.metadata = request.metadata;
        ctx.quantum_resources = request.quantum_resources;

        self.store.start(&task_id, signal).await;

        let protocols_used = self.router.route(&ctx, &request.preferences);
        let mode = request.execution_mode.unwrap_or(self.default_mode);
        info!(
            "Processing task {} with {} protocols ({})",
            task_id,
            protocols_used.len(),
            mode
        );

        let results = match mode {
            ExecutionMode::Parallel => {
                self.engine
                    .execute_parallel(&protocols_used, &mut ctx, &request.args)
                    .await
            }
            ExecutionMode::Sequential => {
                self.engine
                    .execute_pipeline(
                        &protocols_used,
                        &mut ctx,
                        &request.args,
                        request.stop_on_failure,
                    )
                    .await
            }
        };

        let success = results.iter().all(ProtocolResult::is_success);
        let summary = ProcessSummary {
            task_id,
            query: ctx.query().to_string(),
            protocols_used,
            results: results.into_iter().map(ProtocolOutcome::from).collect(),
            context_history: ctx.history().to_vec(),
            success,
        };

        self.store.finish(ctx).await;
        summary
    }

    /// Protocol names grouped by category value; every category is present
    pub fn get_available_protocols(&self) -> BTreeMap<String, Vec<String>> {
        let registry = read(&self.registry);
        sdk::ProtocolCategory::ALL
            .iter()
            .map(|c| (c.as_str().to_string(), registry.list_by_category(*c)))
            .collect()
    }

    /// Add or replace a protocol, returning the replaced one
    pub fn register_custom_protocol(
        &self,
        protocol: Arc<dyn Protocol>,
    ) -> Option<Arc<dyn Protocol>> {
        write(&self.registry).register(protocol)
    }

    /// Enable a protocol. Unknown names are ignored.
    pub fn enable_protocol(&self, name: &str) {
        read(&self.registry).set_enabled(name, true);
    }

    /// Disable a protocol. Unknown names are ignored.
    pub fn disable_protocol(&self, name: &str) {
        read(&self.registry).set_enabled(name, false);
    }

    /// Enabled flag for a protocol, `None` when unknown
    pub fn is_protocol_enabled(&self, name: &str) -> Option<bool> {
        read(&self.registry).is_enabled(name)
    }

    /// Request cancellation of an in-flight task
    pub async fn cancel(&self, task_id: &str) -> bool {
        self.store.cancel(task_id).await
    }

    /// Finished context of a recent task
    pub async fn context(&self, task_id: &str) -> Option<ReasoningContext> {
        self.store.context(task_id).await
    }

    /// Forget a task
    pub async fn reap(&self, task_id: &str) -> bool {
        self.store.reap(task_id).await
    }

    /// Number of tasks currently tracked
    pub async fn active_task_count(&self) -> usize {
        self.store.len().await
    }
}

fn read(registry: &RwLock<ProtocolRegistry>) -> RwLockReadGuard<'_, ProtocolRegistry> {
    registry.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write(registry: &RwLock<ProtocolRegistry>) -> RwLockWriteGuard<'_, ProtocolRegistry> {
    registry.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
