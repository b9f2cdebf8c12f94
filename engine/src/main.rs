// Lexbrain legal reasoning engine
// Main entry point for the lexbrain binary

use clap::Parser;
use lexbrain_engine::cli::{Cli, Command};
use lexbrain_engine::config::Config;
use lexbrain_engine::handlers::{
    handle_agent, handle_ask, handle_case, handle_chat, handle_draft, handle_protocols,
    handle_reason, AskOptions, ChatOptions, OutputFormat, ReasonOptions,
};
use lexbrain_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration (or use custom path if provided)
    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // --log beats the config file; RUST_LOG beats both
    let log_level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(log_level);

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");

    tracing::info!("Lexbrain v{} ({} - {})", version, commit, timestamp);

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Handle commands
    match cli.command {
        Command::Reason {
            query,
            parallel,
            reflect,
            multi_agent,
            stop_on_failure,
            task_id,
            args,
        } => {
            tracing::info!("Reasoning over query: {}", query);
            let options = ReasonOptions {
                parallel,
                reflect,
                multi_agent,
                stop_on_failure,
                task_id,
                args,
            };
            handle_reason(query, options, &config, format).await
        }

        Command::Ask {
            query,
            mode,
            provider,
            no_reasoning,
            max_tokens,
            temperature,
            top_p,
        } => {
            tracing::info!("Asking: {}", query);
            let options = AskOptions {
                mode,
                provider,
                no_reasoning,
                max_tokens,
                temperature,
                top_p,
            };
            handle_ask(query, options, &config, format).await
        }

        Command::Chat {
            mode,
            provider,
            no_reasoning,
        } => {
            let options = ChatOptions {
                mode,
                provider,
                no_reasoning,
            };
            handle_chat(options, &config, format).await
        }

        Command::Draft {
            document_type,
            fields,
            context,
            provider,
        } => {
            tracing::info!("Drafting a {}", document_type);
            handle_draft(document_type, fields, context, provider, &config, format).await
        }

        Command::Agent {
            query,
            dual,
            provider,
        } => {
            tracing::info!("Agent query: {}", query);
            handle_agent(query, dual, provider, &config, format).await
        }

        Command::Protocols => handle_protocols(&config, format).await,

        Command::Case { action } => {
            tracing::info!("Case management: {:?}", action);
            handle_case(action, &config, format).await
        }
    }
}
