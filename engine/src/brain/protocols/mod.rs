//! Built-in reasoning protocols
//!
//! Every built-in body is illustrative: it shapes its output the way a real
//! implementation would, but performs no model calls, no quantum execution
//! and no agent coordination. Each result carries `"placeholder": true` in
//! its metadata so callers can tell.

pub mod multi_agent;
pub mod quantum;
pub mod reasoning;

use sdk::{Protocol, ProtocolResult};
use serde_json::json;
use std::sync::Arc;

/// All built-in protocols, in registration order
pub fn builtin_protocols() -> Vec<Arc<dyn Protocol>> {
    vec![
        Arc::new(reasoning::ChainOfThought),
        Arc::new(reasoning::SelfConsistency),
        Arc::new(reasoning::TreeOfThoughts),
        Arc::new(reasoning::ReAct),
        Arc::new(reasoning::Reflexion),
        Arc::new(reasoning::Rag),
        Arc::new(quantum::QuantumJobOrchestration),
        Arc::new(quantum::Vqe),
        Arc::new(quantum::Qaoa),
        Arc::new(quantum::CircuitTranspilation),
        Arc::new(quantum::ErrorMitigation),
        Arc::new(multi_agent::MultiAgentCoordination),
        Arc::new(multi_agent::ContractNet),
    ]
}

/// Mark a result as produced by an illustrative body
fn placeholder(result: ProtocolResult) -> ProtocolResult {
    result.with_metadata("placeholder", json!(true))
}
