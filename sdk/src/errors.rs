//! Error types and handling
//!
//! This module provides the error types used throughout the lexbrain engine.
//! All errors implement the `ErrorExt` trait which provides user-friendly
//! hints and indicates whether errors are recoverable.
//!
//! Inside the execution engine these errors never escape: they are rendered
//! into a failed `ProtocolResult` whose `error` field carries the `Display`
//! text. Application layers (configuration, case store, CLI) surface them
//! directly.

use std::time::Duration;
use thiserror::Error;

/// Trait for engine error extensions
///
/// Provides additional context for errors, including user-friendly hints
/// and recoverability information.
pub trait ErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is safe to display to end users and never contains
    /// API keys, file paths or raw provider payloads.
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried or worked around. Non-recoverable
    /// errors require a configuration change or code fix.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Protocol**: lookup, enablement, validation and execution failures
/// - **Task**: cancellation of an in-flight reasoning task
/// - **Configuration**: invalid or missing configuration
/// - **Database**: case store failures
/// - **LLM Provider**: chat completion failures
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, ErrorExt};
/// use std::time::Duration;
///
/// let error = EngineError::ProtocolNotFound("Socratic-Method".to_string());
/// assert!(error.to_string().contains("Socratic-Method"));
/// assert!(!error.is_recoverable());
///
/// let timeout = EngineError::ProtocolTimeout {
///     name: "RAG".to_string(),
///     timeout: Duration::from_millis(250),
/// };
/// assert_eq!(timeout.to_string(), "Protocol RAG timed out after 250ms");
/// assert!(timeout.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Protocol errors
    #[error("Protocol not found: {0}")]
    ProtocolNotFound(String),

    #[error("Protocol {0} is disabled")]
    ProtocolDisabled(String),

    #[error("Invalid input for protocol {0}: query must not be empty")]
    InvalidInput(String),

    #[error("Protocol {name} failed: {reason}")]
    ProtocolFailed { name: String, reason: String },

    #[error("Protocol {name} timed out after {timeout:?}")]
    ProtocolTimeout { name: String, timeout: Duration },

    // Task errors
    #[error("Task {0} was cancelled")]
    Cancelled(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Database errors
    #[error("Database error: {0}")]
    Database(String),

    // LLM provider errors
    #[error("LLM provider error: {0}")]
    LLMProvider(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::ProtocolNotFound(_) => "Run 'lexbrain protocols' to see available protocols",
            Self::ProtocolDisabled(_) => "Enable the protocol or remove it from disabled_protocols",
            Self::InvalidInput(_) => "Provide a non-empty query",
            Self::ProtocolFailed { .. } => "A reasoning protocol failed. Check the logs",
            Self::ProtocolTimeout { .. } => "A reasoning protocol took too long. Try again",
            Self::Cancelled(_) => "The task was cancelled before it finished",
            Self::Config(_) => "Check your config.toml file for errors",
            Self::Database(_) => "Case store operation failed. Check the data directory",
            Self::LLMProvider(_) => "LLM provider unavailable. Check your API keys and network",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // A missing protocol or bad config will fail the same way every time
            Self::ProtocolNotFound(_) | Self::Config(_) => false,
            _ => true,
        }
    }
}
