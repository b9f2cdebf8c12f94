//! Quantum-specific protocols
//!
//! No quantum backend is attached. These bodies echo the requested job
//! parameters and report `"executed": false`.

use super::placeholder;
use async_trait::async_trait;
use sdk::{Protocol, ProtocolArgs, ProtocolCategory, ProtocolResult, ReasoningContext};
use serde_json::{json, Value};

const NOT_EXECUTED: &str = "No quantum backend attached; nothing was executed";

fn not_executed(name: &str, mut request: Value, first_step: String) -> ProtocolResult {
    if let Value::Object(map) = &mut request {
        map.insert("executed".to_string(), json!(false));
    }
    placeholder(ProtocolResult::success(
        name,
        request,
        vec![first_step, NOT_EXECUTED.to_string()],
    ))
}

/// Orchestrate quantum computing jobs
pub struct QuantumJobOrchestration;

#[async_trait]
impl Protocol for QuantumJobOrchestration {
    fn name(&self) -> &str {
        "Quantum-Job-Orchestration"
    }

    fn category(&self) -> ProtocolCategory {
        ProtocolCategory::QuantumSpecific
    }

    fn description(&self) -> &str {
        "Orchestrate quantum computing jobs"
    }

    async fn execute(
        &self,
        _ctx: &ReasoningContext,
        args: &ProtocolArgs,
    ) -> anyhow::Result<ProtocolResult> {
        let circuit = args.param_json("circuit").cloned().unwrap_or(Value::Null);
        let backend = args.param_str_or("backend", "simulator");

        Ok(not_executed(
            self.name(),
            json!({"circuit": circuit, "backend": backend}),
            format!("Prepared job for backend {}", backend),
        ))
    }
}

/// Variational Quantum Eigensolver
pub struct Vqe;

#[async_trait]
impl Protocol for Vqe {
    fn name(&self) -> &str {
        "VQE"
    }

    fn category(&self) -> ProtocolCategory {
        ProtocolCategory::QuantumSpecific
    }

    fn description(&self) -> &str {
        "Variational Quantum Eigensolver"
    }

    async fn execute(
        &self,
        _ctx: &ReasoningContext,
        args: &ProtocolArgs,
    ) -> anyhow::Result<ProtocolResult> {
        let hamiltonian = args.param_str_or("hamiltonian", "H = Z0*Z1");
        let ansatz = args.param_str_or("ansatz", "hardware_efficient");

        Ok(not_executed(
            self.name(),
            json!({"hamiltonian": hamiltonian, "ansatz": ansatz}),
            format!("Initialized {} ansatz", ansatz),
        ))
    }
}

/// Quantum Approximate Optimization Algorithm
pub struct Qaoa;

#[async_trait]
impl Protocol for Qaoa {
    fn name(&self) -> &str {
        "QAOA"
    }

    fn category(&self) -> ProtocolCategory {
        ProtocolCategory::QuantumSpecific
    }

    fn description(&self) -> &str {
        "Quantum Approximate Optimization Algorithm"
    }

    async fn execute(
        &self,
        _ctx: &ReasoningContext,
        args: &ProtocolArgs,
    ) -> anyhow::Result<ProtocolResult> {
        let problem = args.param_str_or("problem", "MaxCut");
        let layers = args.param_u64_or("layers", 3);

        Ok(not_executed(
            self.name(),
            json!({"problem": problem, "layers": layers}),
            format!("QAOA with {} layers", layers),
        ))
    }
}

/// Map logical circuits to physical hardware
pub struct CircuitTranspilation;

#[async_trait]
impl Protocol for CircuitTranspilation {
    fn name(&self) -> &str {
        "Circuit-Transpilation"
    }

    fn category(&self) -> ProtocolCategory {
        ProtocolCategory::QuantumSpecific
    }

    fn description(&self) -> &str {
        "Map logical circuits to physical hardware"
    }

    async fn execute(
        &self,
        _ctx: &ReasoningContext,
        args: &ProtocolArgs,
    ) -> anyhow::Result<ProtocolResult> {
        let circuit = args
            .param_json("circuit")
            .cloned()
            .unwrap_or_else(|| json!("logical_circuit"));
        let backend = args.param_str_or("backend", "ibm_perth");

        Ok(not_executed(
            self.name(),
            json!({"circuit": circuit, "backend": backend}),
            format!("Analyzed circuit for {}", backend),
        ))
    }
}

/// Apply error mitigation techniques
pub struct ErrorMitigation;

#[async_trait]
impl Protocol for ErrorMitigation {
    fn name(&self) -> &str {
        "Error-Mitigation"
    }

    fn category(&self) -> ProtocolCategory {
        ProtocolCategory::QuantumSpecific
    }

    fn description(&self) -> &str {
        "Apply error mitigation techniques"
    }

    async fn execute(
        &self,
        _ctx: &ReasoningContext,
        args: &ProtocolArgs,
    ) -> anyhow::Result<ProtocolResult> {
        let technique = args.param_str_or("technique", "ZNE");

        Ok(not_executed(
            self.name(),
            json!({"technique": technique}),
            format!("Selected {} mitigation", technique),
        ))
    }
}
