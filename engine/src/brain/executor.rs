//! Execution Engine
//!
//! Runs protocols by name against a shared `ReasoningContext`.
//!
//! Every invocation is bounded by a per-protocol timeout and raced against
//! the context's cancel signal. Errors never escape: unknown or disabled
//! names, rejected input, `Err` returns and timeouts all become FAILED
//! results, and a fired cancel signal becomes CANCELLED.
//!
//! A history entry is appended exactly when a protocol's `execute` was
//! invoked.

use super::registry::ProtocolRegistry;
use futures::future::join_all;
use sdk::{
    EngineError, ExecutionStatus, ProtocolArgs, ProtocolResult, ReasoningContext,
};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Outcome of one attempt, before it is recorded in history
struct Attempt {
    result: ProtocolResult,
    invoked: bool,
}

impl Attempt {
    fn skipped(result: ProtocolResult) -> Self {
        Self {
            result,
            invoked: false,
        }
    }

    fn invoked(result: ProtocolResult) -> Self {
        Self {
            result,
            invoked: true,
        }
    }
}

/// Executes protocols from a shared registry
pub struct ExecutionEngine {
    registry: Arc<RwLock<ProtocolRegistry>>,
    timeout: Duration,
}

impl ExecutionEngine {
    pub fn new(registry: Arc<RwLock<ProtocolRegistry>>, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    /// Per-protocol timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run one protocol and record it in history if it was invoked
    pub async fn execute_single(
        &self,
        name: &str,
        ctx: &mut ReasoningContext,
        args: &ProtocolArgs,
    ) -> ProtocolResult {
        let attempt = self.attempt(name, ctx, args).await;
        if attempt.invoked {
            ctx.record_result(&attempt.result);
        }
        attempt.result
    }

    /// Run protocols strictly in order.
    ///
    /// Stops after a FAILED result when `stop_on_failure` is set, and always
    /// stops after a CANCELLED result.
    pub async fn execute_pipeline(
        &self,
        names: &[String],
        ctx: &mut ReasoningContext,
        args: &ProtocolArgs,
        stop_on_failure: bool,
    ) -> Vec<ProtocolResult> {
        let mut results = Vec::with_capacity(names.len());

        for name in names {
            let result = self.execute_single(name, ctx, args).await;
            let status = result.status;
            results.push(result);

            match status {
                ExecutionStatus::Cancelled => {
                    info!("Task {} cancelled, halting pipeline", ctx.task_id());
                    break;
                }
                ExecutionStatus::Failed if stop_on_failure => {
                    info!(
                        "Protocol {} failed, halting pipeline for task {}",
                        name,
                        ctx.task_id()
                    );
                    break;
                }
                _ => {}
            }
        }

        results
    }

    /// Run protocols concurrently.
    ///
    /// Results come back in input order. History is appended once all
    /// protocols have finished, also in input order. A failure does not
    /// cancel siblings.
    pub async fn execute_parallel(
        &self,
        names: &[String],
        ctx: &mut ReasoningContext,
        args: &ProtocolArgs,
    ) -> Vec<ProtocolResult> {
        let attempts = {
            let shared: &ReasoningContext = ctx;
            join_all(names.iter().map(|name| self.attempt(name, shared, args))).await
        };

        attempts
            .into_iter()
            .map(|attempt| {
                if attempt.invoked {
                    ctx.record_result(&attempt.result);
                }
                attempt.result
            })
            .collect()
    }

    async fn attempt(&self, name: &str, ctx: &ReasoningContext, args: &ProtocolArgs) -> Attempt {
        let (protocol, enabled) = {
            let registry = match self.registry.read() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            (registry.get(name), registry.is_enabled(name).unwrap_or(false))
        };

        let Some(protocol) = protocol else {
            warn!("Protocol {} not found", name);
            return Attempt::skipped(ProtocolResult::failed(
                name,
                EngineError::ProtocolNotFound(name.to_string()).to_string(),
            ));
        };

        if !enabled {
            debug!("Skipping disabled protocol {}", name);
            return Attempt::skipped(ProtocolResult::failed(
                name,
                EngineError::ProtocolDisabled(name.to_string()).to_string(),
            ));
        }

        if ctx.is_cancelled() {
            return Attempt::skipped(ProtocolResult::cancelled(
                name,
                EngineError::Cancelled(ctx.task_id().to_string()).to_string(),
            ));
        }

        if !protocol.validate_input(ctx) {
            warn!("Protocol {} rejected input for task {}", name, ctx.task_id());
            return Attempt::skipped(ProtocolResult::failed(
                name,
                EngineError::InvalidInput(name.to_string()).to_string(),
            ));
        }

        let start = Instant::now();
        let signal = ctx.cancel_signal().clone();

        let result = tokio::select! {
            outcome = tokio::time::timeout(self.timeout, protocol.execute(ctx, args)) => {
                match outcome {
                    Ok(Ok(result)) => result,
                    Ok(Err(e)) => {
                        error!("Protocol {} raised an error: {:#}", name, e);
                        ProtocolResult::failed(
                            name,
                            EngineError::ProtocolFailed {
                                name: name.to_string(),
                                reason: format!("{:#}", e),
                            }
                            .to_string(),
                        )
                    }
                    Err(_) => {
                        warn!("Protocol {} timed out after {:?}", name, self.timeout);
                        ProtocolResult::failed(
                            name,
                            EngineError::ProtocolTimeout {
                                name: name.to_string(),
                                timeout: self.timeout,
                            }
                            .to_string(),
                        )
                    }
                }
            }
            _ = signal.cancelled() => {
                info!("Protocol {} cancelled for task {}", name, ctx.task_id());
                ProtocolResult::cancelled(
                    name,
                    EngineError::Cancelled(ctx.task_id().to_string()).to_string(),
                )
            }
        };

        debug!(
            "Protocol {} finished with status {} in {:.3}s",
            name,
            result.status,
            start.elapsed().as_secs_f64()
        );

        Attempt::invoked(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sdk::{Protocol, ProtocolCategory};
    use serde_json::json;

    struct Boom;

    #[async_trait]
    impl Protocol for Boom {
        fn name(&self) -> &str {
            "Boom"
        }

        fn category(&self) -> ProtocolCategory {
            ProtocolCategory::Verification
        }

        async fn execute(
            &self,
            _ctx: &ReasoningContext,
            _args: &ProtocolArgs,
        ) -> anyhow::Result<ProtocolResult> {
            anyhow::bail!("kaboom")
        }
    }

    struct Echo;

    #[async_trait]
    impl Protocol for Echo {
        fn name(&self) -> &str {
            "Echo"
        }

        fn category(&self) -> ProtocolCategory {
            ProtocolCategory::Verification
        }

        fn validate_input(&self, ctx: &ReasoningContext) -> bool {
            ctx.query().starts_with("echo")
        }

        async fn execute(
            &self,
            ctx: &ReasoningContext,
            _args: &ProtocolArgs,
        ) -> anyhow::Result<ProtocolResult> {
            Ok(ProtocolResult::success("Echo", json!(ctx.query()), vec![]))
        }
    }

    struct Stall;

    #[async_trait]
    impl Protocol for Stall {
        fn name(&self) -> &str {
            "Stall"
        }

        fn category(&self) -> ProtocolCategory {
            ProtocolCategory::Verification
        }

        async fn execute(
            &self,
            _ctx: &ReasoningContext,
            _args: &ProtocolArgs,
        ) -> anyhow::Result<ProtocolResult> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(ProtocolResult::success("Stall", json!(null), vec![]))
        }
    }

    fn engine() -> ExecutionEngine {
        let mut registry = ProtocolRegistry::with_builtin_protocols();
        registry.register(Arc::new(Boom));
        registry.register(Arc::new(Echo));
        ExecutionEngine::new(Arc::new(RwLock::new(registry)), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_unknown_protocol_not_recorded() {
        let mut ctx = ReasoningContext::new("t", "q");
        let result = engine()
            .execute_single("Nope", &mut ctx, &ProtocolArgs::new())
            .await;

        assert_eq!(result.status, ExecutionStatus::Failed);
        assert!(result.error.unwrap().contains("Nope"));
        assert!(ctx.history().is_empty());
    }

    #[tokio::test]
    async fn test_error_becomes_failed_and_is_recorded() {
        let mut ctx = ReasoningContext::new("t", "q");
        let result = engine()
            .execute_single("Boom", &mut ctx, &ProtocolArgs::new())
            .await;

        assert_eq!(result.status, ExecutionStatus::Failed);
        assert!(result.error.unwrap().contains("kaboom"));
        assert_eq!(ctx.history().len(), 1);
        assert_eq!(ctx.history()[0].status, ExecutionStatus::Failed);
    }

    #[tokio::test]
    async fn test_invalid_input_skips_execute() {
        let mut ctx = ReasoningContext::new("t", "no");
        let result = engine()
            .execute_single("Echo", &mut ctx, &ProtocolArgs::new())
            .await;

        assert_eq!(result.status, ExecutionStatus::Failed);
        assert!(result.error.unwrap().contains("Invalid input"));
        assert!(ctx.history().is_empty());
    }

    #[tokio::test]
    async fn test_blank_query_rejected_by_default_validation() {
        let mut ctx = ReasoningContext::new("t", "   ");
        let result = engine()
            .execute_single("Chain-of-Thought", &mut ctx, &ProtocolArgs::new())
            .await;
        assert_eq!(result.status, ExecutionStatus::Failed);
        assert!(ctx.history().is_empty());
    }

    #[tokio::test]
    async fn test_pre_cancelled_context_skips_execute() {
        let mut ctx = ReasoningContext::new("t", "q");
        ctx.cancel_signal().cancel();
        let results = engine()
            .execute_pipeline(
                &["Chain-of-Thought".to_string(), "RAG".to_string()],
                &mut ctx,
                &ProtocolArgs::new(),
                false,
            )
            .await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, ExecutionStatus::Cancelled);
        assert!(ctx.history().is_empty());
    }

    #[tokio::test]
    async fn test_pipeline_continues_after_failure_by_default() {
        let mut ctx = ReasoningContext::new("t", "q");
        let names: Vec<String> = ["Boom", "RAG"].iter().map(|s| s.to_string()).collect();
        let results = engine()
            .execute_pipeline(&names, &mut ctx, &ProtocolArgs::new(), false)
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[1].status, ExecutionStatus::Success);
        assert_eq!(ctx.history().len(), 2);
    }

    #[tokio::test]
    async fn test_parallel_preserves_input_order() {
        let mut ctx = ReasoningContext::new("t", "echo me");
        let names: Vec<String> = ["Echo", "Boom", "Nope", "RAG"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let results = engine()
            .execute_parallel(&names, &mut ctx, &ProtocolArgs::new())
            .await;

        let got: Vec<&str> = results.iter().map(|r| r.protocol_name.as_str()).collect();
        assert_eq!(got, vec!["Echo", "Boom", "Nope", "RAG"]);

        let recorded: Vec<&str> = ctx.history().iter().map(|h| h.protocol.as_str()).collect();
        assert_eq!(recorded, vec!["Echo", "Boom", "RAG"]);
    }

    #[tokio::test]
    async fn test_sub_second_timeout_is_reported_in_millis() {
        let mut registry = ProtocolRegistry::new();
        registry.register(Arc::new(Stall));
        let engine =
            ExecutionEngine::new(Arc::new(RwLock::new(registry)), Duration::from_millis(50));

        let mut ctx = ReasoningContext::new("t", "q");
        let result = engine
            .execute_single("Stall", &mut ctx, &ProtocolArgs::new())
            .await;

        assert_eq!(result.status, ExecutionStatus::Failed);
        assert_eq!(
            result.error.as_deref(),
            Some("Protocol Stall timed out after 50ms")
        );
        assert_eq!(ctx.history().len(), 1);
    }
}
