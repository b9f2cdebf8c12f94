//! Core reasoning protocols

use super::placeholder;
use async_trait::async_trait;
use sdk::{Protocol, ProtocolArgs, ProtocolCategory, ProtocolResult, ReasoningContext};
use serde_json::json;

/// Upper bound on sampled reasoning paths
const MAX_SAMPLES: u64 = 32;

/// Reason-act loops stop after this many cycles even if more are allowed
const REACT_CONVERGENCE: u64 = 3;

/// Intermediate reasoning steps
pub struct ChainOfThought;

#[async_trait]
impl Protocol for ChainOfThought {
    fn name(&self) -> &str {
        "Chain-of-Thought"
    }

    fn category(&self) -> ProtocolCategory {
        ProtocolCategory::CoreReasoning
    }

    fn description(&self) -> &str {
        "Generate intermediate reasoning steps"
    }

    async fn execute(
        &self,
        ctx: &ReasoningContext,
        _args: &ProtocolArgs,
    ) -> anyhow::Result<ProtocolResult> {
        let steps = vec![
            format!("Breaking down: {}", ctx.query()),
            "Step 1: Identify key components".to_string(),
            "Step 2: Establish relationships".to_string(),
            "Step 3: Apply logical inference".to_string(),
            "Step 4: Synthesize conclusion".to_string(),
        ];

        let output = json!({
            "reasoning_steps": steps,
            "conclusion": "Result based on step-by-step reasoning",
        });

        Ok(placeholder(ProtocolResult::success(
            self.name(),
            output,
            steps,
        )))
    }
}

/// Sample several reasoning paths and aggregate them
pub struct SelfConsistency;

#[async_trait]
impl Protocol for SelfConsistency {
    fn name(&self) -> &str {
        "Self-Consistency"
    }

    fn category(&self) -> ProtocolCategory {
        ProtocolCategory::CoreReasoning
    }

    fn description(&self) -> &str {
        "Sample multiple reasoning paths and aggregate"
    }

    async fn execute(
        &self,
        _ctx: &ReasoningContext,
        args: &ProtocolArgs,
    ) -> anyhow::Result<ProtocolResult> {
        let num_samples = args.param_u64_or("num_samples", 3).min(MAX_SAMPLES);

        let samples: Vec<_> = (0..num_samples)
            .map(|i| {
                json!({
                    "path_id": i,
                    "reasoning": format!("Alternative reasoning path {}", i + 1),
                    "result": format!("Candidate answer {}", i + 1),
                })
            })
            .collect();

        Ok(placeholder(ProtocolResult::success(
            self.name(),
            json!({
                "samples": samples,
                "consensus": "Consensus answer from majority voting",
            }),
            vec![format!("Generated {} reasoning paths", num_samples)],
        )))
    }
}

/// Explore a branching tree of thoughts
pub struct TreeOfThoughts;

#[async_trait]
impl Protocol for TreeOfThoughts {
    fn name(&self) -> &str {
        "Tree-of-Thoughts"
    }

    fn category(&self) -> ProtocolCategory {
        ProtocolCategory::CoreReasoning
    }

    fn description(&self) -> &str {
        "Explore branching reasoning trees"
    }

    async fn execute(
        &self,
        ctx: &ReasoningContext,
        args: &ProtocolArgs,
    ) -> anyhow::Result<ProtocolResult> {
        let search_method = args.param_str_or("search_method", "BFS");

        let tree = json!({
            "root": ctx.query(),
            "search_method": search_method,
            "branches": [
                {"thought": "Approach 1: Direct solution"},
                {"thought": "Approach 2: Decomposition"},
                {"thought": "Approach 3: Analogical"},
            ],
            "best_path": "Approach 2: Decomposition",
        });

        Ok(placeholder(ProtocolResult::success(
            self.name(),
            tree,
            vec![format!("Explored tree using {}", search_method)],
        )))
    }
}

/// Interleaved reason and act cycles
pub struct ReAct;

#[async_trait]
impl Protocol for ReAct {
    fn name(&self) -> &str {
        "ReAct"
    }

    fn category(&self) -> ProtocolCategory {
        ProtocolCategory::CoreReasoning
    }

    fn description(&self) -> &str {
        "Reason + Act cycles"
    }

    async fn execute(
        &self,
        _ctx: &ReasoningContext,
        args: &ProtocolArgs,
    ) -> anyhow::Result<ProtocolResult> {
        let max_iterations = args.param_u64_or("max_iterations", 5);
        let tools = args.param_json("tools").cloned().unwrap_or_else(|| json!([]));
        let cycles = max_iterations.min(REACT_CONVERGENCE);

        let mut trace = Vec::with_capacity(cycles as usize * 3);
        for i in 0..cycles {
            trace.push(format!("Iteration {}: Reasoning about next action", i + 1));
            trace.push("Action: Use tool or gather info".to_string());
            trace.push("Observation: Result from action".to_string());
        }

        Ok(placeholder(ProtocolResult::success(
            self.name(),
            json!({
                "final_answer": "Result after reason-act cycles",
                "iterations": cycles,
                "tools": tools,
            }),
            trace,
        )))
    }
}

/// Self-reflection with memory.
///
/// Each run appends its reflection to `memory["reflexion_history"]`.
pub struct Reflexion;

#[async_trait]
impl Protocol for Reflexion {
    fn name(&self) -> &str {
        "Reflexion"
    }

    fn category(&self) -> ProtocolCategory {
        ProtocolCategory::CoreReasoning
    }

    fn description(&self) -> &str {
        "Self-reflection with memory"
    }

    async fn execute(
        &self,
        ctx: &ReasoningContext,
        _args: &ProtocolArgs,
    ) -> anyhow::Result<ProtocolResult> {
        let reflection = json!({
            "what_worked": ["Logical approach", "Clear reasoning"],
            "what_failed": ["Missing edge case", "Incomplete analysis"],
            "improvements": ["Add validation", "Consider alternatives"],
        });

        let depth = ctx.memory_push("reflexion_history", reflection.clone());

        Ok(placeholder(
            ProtocolResult::success(
                self.name(),
                json!({
                    "attempt": "Initial solution attempt",
                    "reflection": reflection,
                    "improved": "Improved solution based on reflection",
                }),
                vec![
                    "Initial attempt".to_string(),
                    "Reflection".to_string(),
                    "Improvement".to_string(),
                ],
            )
            .with_metadata("reflexion_depth", json!(depth)),
        ))
    }
}

/// Retrieval-augmented generation
pub struct Rag;

#[async_trait]
impl Protocol for Rag {
    fn name(&self) -> &str {
        "RAG"
    }

    fn category(&self) -> ProtocolCategory {
        ProtocolCategory::CoreReasoning
    }

    fn description(&self) -> &str {
        "Retrieval-Augmented Generation"
    }

    async fn execute(
        &self,
        _ctx: &ReasoningContext,
        _args: &ProtocolArgs,
    ) -> anyhow::Result<ProtocolResult> {
        // No knowledge base is attached, so nothing is retrieved
        Ok(placeholder(ProtocolResult::success(
            self.name(),
            json!({
                "retrieved": [],
                "generated_response": "Answer synthesized from retrieved knowledge",
                "sources": [],
            }),
            vec![
                "Retrieved relevant documents".to_string(),
                "Synthesized answer".to_string(),
            ],
        )))
    }
}
