//! CLI interface for lexbrain
//!
//! This module provides the command-line interface using clap's derive API.
//! It defines all commands and global flags.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Lexbrain legal reasoning engine
///
/// Routes legal questions through reasoning protocols, asks a chat provider
/// for an answer, and keeps a local case store.
#[derive(Parser, Debug)]
#[command(name = "lexbrain")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run reasoning protocols over a query and print the summary
    Reason {
        /// The query to reason about
        query: String,

        /// Run the selected protocols concurrently
        #[arg(long)]
        parallel: bool,

        /// Append a Reflexion pass
        #[arg(long)]
        reflect: bool,

        /// Append multi-agent coordination
        #[arg(long)]
        multi_agent: bool,

        /// Stop at the first failed protocol
        #[arg(long)]
        stop_on_failure: bool,

        /// Use this task id instead of a generated one
        #[arg(long, value_name = "ID")]
        task_id: Option<String>,

        /// Protocol argument as key=value (value parsed as JSON when possible)
        #[arg(long = "arg", value_name = "KEY=VALUE")]
        args: Vec<String>,
    },

    /// Ask the legal assistant a question
    Ask {
        /// The question
        query: String,

        /// Legal mode (navigation, general, document_validation, legal_research,
        /// etymology, case_management, regulatory_updates)
        #[arg(short, long)]
        mode: Option<String>,

        /// Chat provider (huggingface, openai, perplexity, lmstudio, gemini)
        #[arg(short, long)]
        provider: Option<String>,

        /// Skip the reasoning protocols
        #[arg(long)]
        no_reasoning: bool,

        /// Maximum tokens to generate
        #[arg(long)]
        max_tokens: Option<u32>,

        /// Sampling temperature
        #[arg(long)]
        temperature: Option<f32>,

        /// Nucleus sampling
        #[arg(long)]
        top_p: Option<f32>,
    },

    /// Chat with the legal assistant, one question per line
    ///
    /// `/reset` clears the conversation, `/stats` shows cache counters,
    /// `/exit` or end of input quits.
    Chat {
        /// Legal mode
        #[arg(short, long)]
        mode: Option<String>,

        /// Chat provider
        #[arg(short, long)]
        provider: Option<String>,

        /// Skip the reasoning protocols
        #[arg(long)]
        no_reasoning: bool,
    },

    /// Draft a legal document (will, contract, motion, pleading or any other type)
    Draft {
        /// Document type
        document_type: String,

        /// Document detail as key=value, in the order given
        #[arg(long = "field", value_name = "KEY=VALUE")]
        fields: Vec<String>,

        /// Additional context for the drafter
        #[arg(long, default_value = "")]
        context: String,

        /// Chat provider
        #[arg(short, long)]
        provider: Option<String>,
    },

    /// Let the planning agent break a query into tasks and run them
    Agent {
        /// The query
        query: String,

        /// Skip planning and answer from the lawful and statutory perspectives
        #[arg(long)]
        dual: bool,

        /// Chat provider
        #[arg(short, long)]
        provider: Option<String>,
    },

    /// List available protocols by category
    Protocols,

    /// Manage legal cases
    Case {
        #[command(subcommand)]
        action: CaseAction,
    },
}

/// Case management actions
#[derive(Subcommand, Debug)]
pub enum CaseAction {
    /// Create a new case
    Create {
        /// Case title
        title: String,

        /// Case description
        #[arg(short, long, default_value = "")]
        description: String,

        /// Initial status (default: Open)
        #[arg(short, long)]
        status: Option<String>,
    },

    /// List cases
    List {
        /// Only show cases with this status
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Show a case with its notes and documents
    Show {
        /// Case ID
        id: i64,
    },

    /// Update case fields
    Update {
        /// Case ID
        id: i64,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        status: Option<String>,
    },

    /// Delete a case and everything attached to it
    Delete {
        /// Case ID
        id: i64,
    },

    /// Add a note to a case
    Note {
        /// Case ID
        id: i64,

        /// Note text
        content: String,
    },

    /// List notes of a case
    Notes {
        /// Case ID
        id: i64,
    },

    /// Attach a document reference to a case
    Doc {
        /// Case ID
        id: i64,

        /// Document title
        title: String,

        /// Path to the document file
        #[arg(long)]
        path: Option<String>,
    },

    /// List documents of a case
    Docs {
        /// Case ID
        id: i64,
    },
}
