//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - reason: Run reasoning protocols and print the summary
//! - ask: Answer a question through the legal assistant
//! - chat: Interactive conversation with the legal assistant
//! - draft: Draft a legal document
//! - agent: Plan and run a multi-step legal task
//! - protocols: List available protocols
//! - case: Manage the case store

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::brain::{Brain, ExecutionMode, ProcessRequest};
use crate::cli::CaseAction;
use crate::config::Config;
use crate::db::{CaseUpdate, Database};
use crate::legal::{
    DocumentGenerator, DocumentType, LawAgent, LegalAssistant, LegalMode, ResponseCache,
};
use crate::llm::{build_provider, ChatProvider, GenerationParams, Message};
use sdk::ProtocolArgs;

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Options for the `reason` command
#[derive(Debug, Clone, Default)]
pub struct ReasonOptions {
    pub parallel: bool,
    pub reflect: bool,
    pub multi_agent: bool,
    pub stop_on_failure: bool,
    pub task_id: Option<String>,
    pub args: Vec<String>,
}

/// Options for the `ask` command
#[derive(Debug, Clone, Default)]
pub struct AskOptions {
    pub mode: Option<String>,
    pub provider: Option<String>,
    pub no_reasoning: bool,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
}

/// Options for the `chat` command
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    pub mode: Option<String>,
    pub provider: Option<String>,
    pub no_reasoning: bool,
}

/// Split `key=value` pairs, keeping their order and raw values
pub fn parse_fields(pairs: &[String]) -> Result<Vec<(String, String)>> {
    pairs
        .iter()
        .map(|pair| {
            let (key, value) = pair
                .split_once('=')
                .with_context(|| format!("Invalid field '{}', expected KEY=VALUE", pair))?;
            let key = key.trim();
            if key.is_empty() {
                anyhow::bail!("Invalid field '{}', key is empty", pair);
            }
            Ok((key.to_string(), value.to_string()))
        })
        .collect()
}

fn provider_for(config: &Config, name: Option<&str>) -> Result<Box<dyn ChatProvider>> {
    let name = name.unwrap_or(&config.llm.default_provider);
    build_provider(&config.llm, name)
        .with_context(|| format!("Failed to set up provider '{}'", name))
}

/// Assistant over the configured brain, with the response cache when enabled
fn build_assistant(config: &Config, provider: Option<&str>) -> Result<LegalAssistant> {
    let assistant = LegalAssistant::new(
        Arc::new(Brain::new(&config.brain)),
        provider_for(config, provider)?,
    );
    Ok(match config.legal.response_cache_size {
        0 => assistant,
        size => assistant.with_cache(ResponseCache::new(
            size,
            Duration::from_secs(config.legal.response_cache_ttl_secs),
        )),
    })
}

fn print_chunk(chunk: &str) {
    print!("{}", chunk);
    let _ = std::io::stdout().flush();
}

/// Parse `key=value` pairs into protocol arguments.
///
/// Values that parse as JSON keep their type; anything else is a string.
pub fn parse_protocol_args(pairs: &[String]) -> Result<ProtocolArgs> {
    let mut args = ProtocolArgs::new();
    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .with_context(|| format!("Invalid argument '{}', expected KEY=VALUE", pair))?;
        let key = key.trim();
        if key.is_empty() {
            anyhow::bail!("Invalid argument '{}', key is empty", pair);
        }
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        args.insert(key, value);
    }
    Ok(args)
}

/// Run reasoning protocols over a query
pub async fn handle_reason(
    query: String,
    options: ReasonOptions,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let brain = Brain::new(&config.brain);

    let mut request = ProcessRequest::new(query)
        .preference("use_reflection", options.reflect)
        .preference("multi_agent", options.multi_agent)
        .stop_on_failure(options.stop_on_failure)
        .args(parse_protocol_args(&options.args)?);
    if options.parallel {
        request = request.execution_mode(ExecutionMode::Parallel);
    }
    if let Some(task_id) = options.task_id {
        request = request.task_id(task_id);
    }

    let summary = brain.process(request).await;

    match format {
        OutputFormat::Text => {
            println!("Task ID: {}", summary.task_id);
            println!("Query:   {}", summary.query);
            println!("Protocols: {}", summary.protocols_used.join(", "));
            println!();

            for result in &summary.results {
                println!("{} [{}]", result.protocol, result.status);
                for step in &result.trace {
                    println!("  - {}", step);
                }
                if let Some(error) = &result.error {
                    println!("  error: {}", error);
                }
            }

            println!();
            if summary.success {
                println!("✓ All protocols succeeded");
            } else {
                println!("⚠ Some protocols did not succeed");
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}

/// Answer a question through the legal assistant
pub async fn handle_ask(
    query: String,
    options: AskOptions,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let mode = LegalMode::resolve(
        options
            .mode
            .as_deref()
            .unwrap_or(&config.legal.default_mode),
    );
    let mut params = GenerationParams::from(&config.llm);
    if let Some(max_tokens) = options.max_tokens {
        params.max_tokens = max_tokens;
    }
    if let Some(temperature) = options.temperature {
        params.temperature = temperature;
    }
    if let Some(top_p) = options.top_p {
        params.top_p = top_p;
    }

    let use_reasoning = config.legal.use_reasoning && !options.no_reasoning;
    let assistant = build_assistant(config, options.provider.as_deref())?;

    let streaming = matches!(format, OutputFormat::Text);
    let answer = assistant
        .respond(&query, &[], mode, use_reasoning, &params, |chunk| {
            if streaming {
                print_chunk(chunk);
            }
        })
        .await
        .context("Chat request failed")?;

    match format {
        OutputFormat::Text => println!(),
        OutputFormat::Json => {
            let output = json!({
                "mode": mode,
                "provider": assistant.provider_name(),
                "reasoning": use_reasoning,
                "answer": answer,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Interactive conversation; answers are cached per conversation state
pub async fn handle_chat(options: ChatOptions, config: &Config, format: OutputFormat) -> Result<()> {
    let mode = LegalMode::resolve(
        options
            .mode
            .as_deref()
            .unwrap_or(&config.legal.default_mode),
    );
    let use_reasoning = config.legal.use_reasoning && !options.no_reasoning;
    let params = GenerationParams::from(&config.llm);
    let assistant = build_assistant(config, options.provider.as_deref())?;

    if let OutputFormat::Text = format {
        println!(
            "{} mode with {}. /reset clears the conversation, /exit quits.",
            mode.label(),
            assistant.provider_name()
        );
    }

    let mut history: Vec<Message> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let query = line.trim();
        match query {
            "" => continue,
            "/exit" | "/quit" => break,
            "/reset" => {
                history.clear();
                if let OutputFormat::Text = format {
                    println!("Conversation cleared");
                }
                continue;
            }
            "/stats" => {
                match assistant.cache_stats().await {
                    Some(stats) => println!(
                        "{}",
                        json!({ "cache": stats, "hit_rate": stats.hit_rate() })
                    ),
                    None => println!("Response cache is disabled"),
                }
                continue;
            }
            _ => {}
        }

        let streaming = matches!(format, OutputFormat::Text);
        let answer = assistant
            .respond(query, &history, mode, use_reasoning, &params, |chunk| {
                if streaming {
                    print_chunk(chunk);
                }
            })
            .await;

        match answer {
            Ok(answer) => {
                match format {
                    OutputFormat::Text => println!("\n"),
                    OutputFormat::Json => {
                        println!("{}", json!({ "query": query, "answer": answer }))
                    }
                }
                history.push(Message::user(query));
                history.push(Message::assistant(answer));
            }
            Err(e) => eprintln!("Chat request failed: {}", e),
        }
    }

    if let Some(stats) = assistant.cache_stats().await {
        tracing::info!(
            "Chat finished: {} request(s), {:.2}% served from cache",
            stats.requests,
            stats.hit_rate()
        );
    }
    Ok(())
}

/// Draft a legal document
pub async fn handle_draft(
    document_type: String,
    fields: Vec<String>,
    context: String,
    provider: Option<String>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let document_type = DocumentType::parse(&document_type);
    let fields = parse_fields(&fields)?;
    let generator = DocumentGenerator::new(Arc::from(provider_for(config, provider.as_deref())?));

    let document = generator
        .generate(&document_type, &fields, &context)
        .await
        .context("Document generation failed")?;

    match format {
        OutputFormat::Text => println!("{}", document),
        OutputFormat::Json => {
            let output = json!({
                "document_type": document_type.as_str(),
                "provider": generator.provider_name(),
                "document": document,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Plan and run a legal task, or answer from both perspectives
pub async fn handle_agent(
    query: String,
    dual: bool,
    provider: Option<String>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let database = Database::new(&config.database_path())
        .await
        .context("Failed to open database")?;
    let agent = LawAgent::new(Arc::from(provider_for(config, provider.as_deref())?))
        .with_cases(database.cases());
    let params = GenerationParams::from(&config.llm);

    let output = if dual {
        agent.dual_analysis(&query, &[], &params).await?
    } else {
        agent.run(&query, &[], &params).await?
    };

    match format {
        OutputFormat::Text => println!("{}", output),
        OutputFormat::Json => {
            let output = json!({ "query": query, "dual": dual, "output": output });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    database.close().await
}

/// List available protocols by category
pub async fn handle_protocols(config: &Config, format: OutputFormat) -> Result<()> {
    let brain = Brain::new(&config.brain);
    let available = brain.get_available_protocols();

    match format {
        OutputFormat::Text => {
            println!("Available protocols:");
            for (category, names) in &available {
                println!();
                println!("{}:", category);
                if names.is_empty() {
                    println!("  (none)");
                }
                for name in names {
                    let state = match brain.is_protocol_enabled(name) {
                        Some(false) => " (disabled)",
                        _ => "",
                    };
                    println!("  - {}{}", name, state);
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&available)?);
        }
    }

    Ok(())
}

/// Manage the case store
pub async fn handle_case(action: CaseAction, config: &Config, format: OutputFormat) -> Result<()> {
    let database = Database::new(&config.database_path())
        .await
        .context("Failed to open database")?;
    let repo = database.cases();

    let output: Value = match action {
        CaseAction::Create {
            title,
            description,
            status,
        } => {
            let case = repo
                .create_case(&title, &description, status.as_deref())
                .await?;
            if let OutputFormat::Text = format {
                println!("Created case #{}: {}", case.case_id, case.title);
            }
            json!(case)
        }

        CaseAction::List { status } => {
            let cases = repo.list_cases(status.as_deref()).await?;
            if let OutputFormat::Text = format {
                if cases.is_empty() {
                    println!("No cases found");
                }
                for case in &cases {
                    println!("#{:<5} [{}] {}", case.case_id, case.status, case.title);
                }
            }
            json!({ "cases": cases, "count": cases.len() })
        }

        CaseAction::Show { id } => {
            let Some(case) = repo.get_case(id).await? else {
                anyhow::bail!("Case #{} not found", id);
            };
            let notes = repo.get_notes(id).await?;
            let documents = repo.get_documents(id).await?;
            if let OutputFormat::Text = format {
                println!("Case #{}: {}", case.case_id, case.title);
                println!("  Status:  {}", case.status);
                println!("  Created: {}", case.created_at);
                println!("  Updated: {}", case.updated_at);
                if !case.description.is_empty() {
                    println!("  {}", case.description);
                }
                println!("  Notes: {}  Documents: {}", notes.len(), documents.len());
            }
            json!({ "case": case, "notes": notes, "documents": documents })
        }

        CaseAction::Update {
            id,
            title,
            description,
            status,
        } => {
            let update = CaseUpdate {
                title,
                description,
                status,
            };
            if update.is_empty() {
                anyhow::bail!("Nothing to update; pass --title, --description or --status");
            }
            let updated = repo.update_case(id, &update).await?;
            if let OutputFormat::Text = format {
                if updated {
                    println!("Updated case #{}", id);
                } else {
                    println!("Case #{} not found", id);
                }
            }
            json!({ "case_id": id, "updated": updated })
        }

        CaseAction::Delete { id } => {
            let deleted = repo.delete_case(id).await?;
            if let OutputFormat::Text = format {
                if deleted {
                    println!("Deleted case #{}", id);
                } else {
                    println!("Case #{} not found", id);
                }
            }
            json!({ "case_id": id, "deleted": deleted })
        }

        CaseAction::Note { id, content } => {
            let Some(note) = repo.add_note(id, &content).await? else {
                anyhow::bail!("Case #{} not found", id);
            };
            if let OutputFormat::Text = format {
                println!("Added note #{} to case #{}", note.note_id, id);
            }
            json!(note)
        }

        CaseAction::Notes { id } => {
            let notes = repo.get_notes(id).await?;
            if let OutputFormat::Text = format {
                if notes.is_empty() {
                    println!("No notes for case #{}", id);
                }
                for note in &notes {
                    println!("[{}] {}", note.created_at, note.content);
                }
            }
            json!({ "notes": notes, "count": notes.len() })
        }

        CaseAction::Doc { id, title, path } => {
            let Some(document) = repo.add_document(id, &title, path.as_deref()).await? else {
                anyhow::bail!("Case #{} not found", id);
            };
            if let OutputFormat::Text = format {
                println!(
                    "Attached document #{} to case #{}",
                    document.document_id, id
                );
            }
            json!(document)
        }

        CaseAction::Docs { id } => {
            let documents = repo.get_documents(id).await?;
            if let OutputFormat::Text = format {
                if documents.is_empty() {
                    println!("No documents for case #{}", id);
                }
                for doc in &documents {
                    match &doc.file_path {
                        Some(path) => println!("{} ({})", doc.title, path),
                        None => println!("{}", doc.title),
                    }
                }
            }
            json!({ "documents": documents, "count": documents.len() })
        }
    };

    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(&output)?);
    }

    database.close().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_protocol_args_types() {
        let args = parse_protocol_args(&[
            "num_samples=5".to_string(),
            "backend=aer".to_string(),
            "tools=[\"search\"]".to_string(),
            "note=a=b".to_string(),
        ])
        .unwrap();

        assert_eq!(args.param_u64_or("num_samples", 0), 5);
        assert_eq!(args.param_str_or("backend", ""), "aer");
        assert_eq!(args.param_json("tools"), Some(&json!(["search"])));
        assert_eq!(args.param_str_or("note", ""), "a=b");
    }

    #[test]
    fn test_parse_fields_keeps_order_and_raw_values() {
        let fields = parse_fields(&[
            "testator=Jane Roe".to_string(),
            "shares=10".to_string(),
            "note=a=b".to_string(),
        ])
        .unwrap();
        assert_eq!(
            fields,
            vec![
                ("testator".to_string(), "Jane Roe".to_string()),
                ("shares".to_string(), "10".to_string()),
                ("note".to_string(), "a=b".to_string()),
            ]
        );
        assert!(parse_fields(&["missing".to_string()]).is_err());
    }

    #[test]
    fn test_parse_protocol_args_rejects_malformed() {
        assert!(parse_protocol_args(&["novalue".to_string()]).is_err());
        assert!(parse_protocol_args(&["=1".to_string()]).is_err());
    }
}
