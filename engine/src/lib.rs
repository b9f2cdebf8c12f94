//! Lexbrain Engine Library
//!
//! This library provides the core functionality of the lexbrain engine.
//! It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Reasoning brain: registry, router, execution engine and facade
pub mod brain;

/// Database persistence module
pub mod db;

/// Chat provider abstraction layer
pub mod llm;

/// Legal assistant modes, prompt assembly, drafting and the planning agent
pub mod legal;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
