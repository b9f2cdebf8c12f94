//! Lexbrain SDK
//!
//! Shared library providing the protocol trait, context and result types, and
//! error types. It is used by the engine and by crates that contribute
//! their own reasoning protocols.

/// Protocol trait and reasoning context
pub mod protocol;

/// Error types and handling
pub mod errors;

/// Protocol input/output types
pub mod types;

// Re-export commonly used types
pub use errors::{EngineError, ErrorExt};
pub use protocol::{CancelSignal, Protocol, ReasoningContext};
pub use types::{
    ExecutionStatus, HistoryEntry, ProtocolArgs, ProtocolCategory, ProtocolResult,
};
