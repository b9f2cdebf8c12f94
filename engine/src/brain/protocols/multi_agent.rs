//! Multi-agent protocols
//!
//! No agents are spawned. The bodies describe the requested coordination
//! and report `"executed": false`.

use super::placeholder;
use async_trait::async_trait;
use sdk::{Protocol, ProtocolArgs, ProtocolCategory, ProtocolResult, ReasoningContext};
use serde_json::json;

/// Upper bound on listed agents
const MAX_AGENTS: u64 = 64;

/// Orchestrate multiple agents on one problem
pub struct MultiAgentCoordination;

#[async_trait]
impl Protocol for MultiAgentCoordination {
    fn name(&self) -> &str {
        "Multi-Agent-Coordination"
    }

    fn category(&self) -> ProtocolCategory {
        ProtocolCategory::MultiAgent
    }

    fn description(&self) -> &str {
        "Orchestrate multiple agents on quantum problems"
    }

    async fn execute(
        &self,
        _ctx: &ReasoningContext,
        args: &ProtocolArgs,
    ) -> anyhow::Result<ProtocolResult> {
        let num_agents = args.param_u64_or("num_agents", 3).min(MAX_AGENTS);
        let agents: Vec<String> = (0..num_agents).map(|i| format!("Agent-{}", i)).collect();

        Ok(placeholder(ProtocolResult::success(
            self.name(),
            json!({
                "agents": agents,
                "communication": "Message passing protocol",
                "executed": false,
            }),
            vec![
                format!("Planned allocation across {} agents", num_agents),
                "No agents attached; nothing was executed".to_string(),
            ],
        )))
    }
}

/// Decentralized task allocation by bidding
pub struct ContractNet;

#[async_trait]
impl Protocol for ContractNet {
    fn name(&self) -> &str {
        "Contract-Net-Protocol"
    }

    fn category(&self) -> ProtocolCategory {
        ProtocolCategory::MultiAgent
    }

    fn description(&self) -> &str {
        "Decentralized task allocation"
    }

    async fn execute(
        &self,
        _ctx: &ReasoningContext,
        args: &ProtocolArgs,
    ) -> anyhow::Result<ProtocolResult> {
        let task = args.param_str_or("task", "quantum_optimization");

        Ok(placeholder(ProtocolResult::success(
            self.name(),
            json!({
                "task": task,
                "bids": [],
                "winner": null,
                "executed": false,
            }),
            vec![
                format!("Announced task {}", task),
                "No bidders attached; nothing was executed".to_string(),
            ],
        )))
    }
}
