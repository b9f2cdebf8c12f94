//! Protocol input/output types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Categories of reasoning protocols
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolCategory {
    CoreReasoning,
    QuantumSpecific,
    MultiAgent,
    AdvancedImplementation,
    Verification,
    Optimization,
}

impl ProtocolCategory {
    /// All categories, in declaration order
    pub const ALL: [ProtocolCategory; 6] = [
        ProtocolCategory::CoreReasoning,
        ProtocolCategory::QuantumSpecific,
        ProtocolCategory::MultiAgent,
        ProtocolCategory::AdvancedImplementation,
        ProtocolCategory::Verification,
        ProtocolCategory::Optimization,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            ProtocolCategory::CoreReasoning => "core_reasoning",
            ProtocolCategory::QuantumSpecific => "quantum_specific",
            ProtocolCategory::MultiAgent => "multi_agent",
            ProtocolCategory::AdvancedImplementation => "advanced_implementation",
            ProtocolCategory::Verification => "verification",
            ProtocolCategory::Optimization => "optimization",
        }
    }
}

impl fmt::Display for ProtocolCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a protocol execution
///
/// `Pending` and `Running` are reserved for callers that track in-flight
/// work; the execution engine only ever returns terminal states.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Success,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Success => "success",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Success | ExecutionStatus::Failed | ExecutionStatus::Cancelled
        )
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-form arguments forwarded to every protocol of a run
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ProtocolArgs {
    params: serde_json::Map<String, serde_json::Value>,
}

impl ProtocolArgs {
    /// Create an empty argument set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter
    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Insert a parameter in place
    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.params.insert(key.into(), value);
    }

    /// Get a parameter as a JSON value
    pub fn param_json(&self, key: &str) -> Option<&serde_json::Value> {
        self.params.get(key)
    }

    /// Get a string parameter, falling back to `default`
    pub fn param_str_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.params
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or(default)
    }

    /// Get an unsigned integer parameter, falling back to `default`
    pub fn param_u64_or(&self, key: &str, default: u64) -> u64 {
        self.params
            .get(key)
            .and_then(|v| v.as_u64())
            .unwrap_or(default)
    }

    /// Get an optional bool parameter
    pub fn param_bool_opt(&self, key: &str) -> Option<bool> {
        self.params.get(key).and_then(|v| v.as_bool())
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for ProtocolArgs {
    fn from(params: serde_json::Map<String, serde_json::Value>) -> Self {
        Self { params }
    }
}

/// Result of a single protocol invocation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProtocolResult {
    pub protocol_name: String,
    pub status: ExecutionStatus,
    pub output: serde_json::Value,
    #[serde(default)]
    pub reasoning_trace: Vec<String>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    /// Set only for `Failed` and `Cancelled` results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProtocolResult {
    /// Create a successful result
    pub fn success(
        protocol_name: impl Into<String>,
        output: serde_json::Value,
        reasoning_trace: Vec<String>,
    ) -> Self {
        Self {
            protocol_name: protocol_name.into(),
            status: ExecutionStatus::Success,
            output,
            reasoning_trace,
            metadata: serde_json::Map::new(),
            error: None,
        }
    }

    /// Create a failed result
    pub fn failed(protocol_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            protocol_name: protocol_name.into(),
            status: ExecutionStatus::Failed,
            output: serde_json::Value::Null,
            reasoning_trace: Vec::new(),
            metadata: serde_json::Map::new(),
            error: Some(error.into()),
        }
    }

    /// Create a cancelled result
    pub fn cancelled(protocol_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Cancelled,
            ..Self::failed(protocol_name, reason)
        }
    }

    /// Attach a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }
}

/// One record of the context history, appended per attempted protocol
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub protocol: String,
    pub result: serde_json::Value,
    pub trace: Vec<String>,
    pub status: ExecutionStatus,
}

impl From<&ProtocolResult> for HistoryEntry {
    fn from(result: &ProtocolResult) -> Self {
        Self {
            protocol: result.protocol_name.clone(),
            result: result.output.clone(),
            trace: result.reasoning_trace.clone(),
            status: result.status,
        }
    }
}
