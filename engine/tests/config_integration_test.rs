//! Integration tests for configuration management
//!
//! These tests verify that the Config struct can be loaded from TOML,
//! validated, and used to build a working brain.

use lexbrain_engine::brain::{Brain, ProcessRequest};
use lexbrain_engine::config::Config;
use std::fs;
use tempfile::TempDir;

fn with_data_dir(dir: &TempDir, body: &str) -> String {
    format!(
        "[core]\ndata_dir = \"{}\"\n\n{}",
        dir.path().join("data").display(),
        body
    )
}

#[test]
fn test_config_toml_parsing() {
    let dir = TempDir::new().unwrap();
    let toml_content = with_data_dir(
        &dir,
        r#"
[llm]
default_provider = "gemini"
max_tokens = 1024
temperature = 0.2

[llm.gemini]
base_url = "http://localhost:9000/v1beta"
model = "gemini-1.5-pro"
api_key_env = "MY_GEMINI_KEY"

[brain]
protocol_timeout_secs = 10
default_execution_mode = "parallel"
disabled_protocols = ["VQE"]

[legal]
default_mode = "legal_research"
use_reasoning = false
"#,
    );

    let config = Config::from_toml_str(&toml_content).unwrap();

    assert_eq!(config.core.log_level, "info");
    assert!(config.core.data_dir.exists());
    assert_eq!(config.database_path(), dir.path().join("data").join("lexbrain.db"));

    assert_eq!(config.llm.default_provider, "gemini");
    assert_eq!(config.llm.max_tokens, 1024);
    assert_eq!(config.llm.top_p, 0.95);
    assert_eq!(config.llm.gemini.model, "gemini-1.5-pro");
    assert_eq!(config.llm.gemini.api_key_env.as_deref(), Some("MY_GEMINI_KEY"));
    assert_eq!(config.llm.lmstudio.api_key_env, None);

    assert_eq!(config.brain.protocol_timeout_secs, 10);
    assert_eq!(config.brain.default_execution_mode, "parallel");
    assert_eq!(config.brain.max_active_contexts, 1024);
    assert_eq!(config.brain.disabled_protocols, vec!["VQE"]);

    assert_eq!(config.legal.default_mode, "legal_research");
    assert!(!config.legal.use_reasoning);
}

#[test]
fn test_minimal_config_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let toml_content = with_data_dir(&dir, "[llm]\ndefault_provider = \"lmstudio\"\n");

    let config = Config::from_toml_str(&toml_content).unwrap();
    assert_eq!(config.brain.context_ttl_secs, 3600);
    assert_eq!(config.brain.protocol_timeout_secs, 30);
    assert_eq!(config.brain.default_execution_mode, "sequential");
    assert!(config.brain.routes.is_empty());
    assert_eq!(config.legal.default_mode, "general");
    assert!(config.legal.use_reasoning);
    assert_eq!(config.legal.response_cache_size, 500);
    assert_eq!(config.legal.response_cache_ttl_secs, 1800);
}

#[test]
fn test_invalid_values_are_rejected() {
    let dir = TempDir::new().unwrap();
    let cases = [
        "[llm]\ndefault_provider = \"ollama\"\n",
        "[llm]\ndefault_provider = \"openai\"\ntemperature = 3.5\n",
        "[llm]\ndefault_provider = \"openai\"\ntop_p = 1.5\n",
        "[llm]\ndefault_provider = \"openai\"\n[brain]\nprotocol_timeout_secs = 0\n",
        "[llm]\ndefault_provider = \"openai\"\n[brain]\nmax_active_contexts = 0\n",
        "[llm]\ndefault_provider = \"openai\"\n[brain]\ndefault_execution_mode = \"Parallel\"\n",
        "[llm]\ndefault_provider = \"openai\"\n[[brain.routes]]\nkeywords = []\nprotocols = [\"RAG\"]\n",
        "[llm]\ndefault_provider = \"openai\"\n[legal]\nresponse_cache_ttl_secs = 0\n",
    ];

    for body in cases {
        let result = Config::from_toml_str(&with_data_dir(&dir, body));
        assert!(result.is_err(), "accepted invalid config:\n{}", body);
    }
}

#[test]
fn test_invalid_log_level_is_rejected() {
    let toml_content = r#"
[core]
log_level = "loud"

[llm]
default_provider = "openai"
"#;
    let err = Config::from_toml_str(toml_content).unwrap_err();
    assert!(err.to_string().contains("Invalid log level"));
}

#[test]
fn test_load_from_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        with_data_dir(&dir, "[llm]\ndefault_provider = \"perplexity\"\n"),
    )
    .unwrap();

    let config = Config::load_from_path(&path).unwrap();
    assert_eq!(config.llm.default_provider, "perplexity");

    assert!(Config::load_from_path(&dir.path().join("missing.toml")).is_err());
}

#[test]
fn test_default_config_round_trips_through_toml() {
    let config = Config::default_config();
    let text = toml::to_string_pretty(&config).unwrap();
    assert!(text.contains("default_provider = \"huggingface\""));
    assert!(text.contains("data_dir = \"~/.lexbrain\""));
}

#[tokio::test]
async fn test_configured_routes_and_disabled_protocols_reach_the_brain() {
    let dir = TempDir::new().unwrap();
    let toml_content = with_data_dir(
        &dir,
        r#"
[llm]
default_provider = "openai"

[brain]
disabled_protocols = ["RAG"]

[[brain.routes]]
keywords = ["Statute"]
protocols = ["RAG", "Chain-of-Thought"]
"#,
    );
    let config = Config::from_toml_str(&toml_content).unwrap();
    let brain = Brain::new(&config.brain);

    assert_eq!(brain.is_protocol_enabled("RAG"), Some(false));

    let summary = brain
        .process(ProcessRequest::new("Which statute applies?"))
        .await;
    assert_eq!(summary.protocols_used, vec!["RAG", "Chain-of-Thought"]);
    assert!(summary.results[0].error.as_ref().unwrap().contains("disabled"));
    assert_eq!(summary.context_history.len(), 1);
}
