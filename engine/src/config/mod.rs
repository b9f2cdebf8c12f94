//! Configuration management
//!
//! This module handles loading, validation, and management of the lexbrain
//! configuration. Configuration is stored in TOML format at
//! ~/.lexbrain/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level, data directory
//! - **llm**: Default chat provider, generation parameters, per-provider endpoints
//! - **brain**: Task store bounds, protocol timeout, disabled protocols, extra routes
//! - **legal**: Default legal mode, whether reasoning runs before answering,
//!   response cache bounds
//!
//! # Path Expansion
//!
//! The data directory supports `~` expansion and is created if it doesn't
//! exist.
//!
//! # Examples
//!
//! ```no_run
//! use lexbrain_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//! println!("Default provider: {}", config.llm.default_provider);
//! println!("Protocol timeout: {}s", config.brain.protocol_timeout_secs);
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Providers the engine knows how to build
pub const KNOWN_PROVIDERS: [&str; 5] = ["huggingface", "openai", "perplexity", "lmstudio", "gemini"];

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core engine settings
    pub core: CoreConfig,

    /// Chat provider configuration
    pub llm: LLMConfig,

    /// Reasoning brain configuration
    #[serde(default)]
    pub brain: BrainConfig,

    /// Legal assistant configuration
    #[serde(default)]
    pub legal: LegalConfig,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Data directory path (supports ~ expansion)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// Chat provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Default provider (huggingface, openai, perplexity, lmstudio, gemini)
    pub default_provider: String,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature (0.0-2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Nucleus sampling (0.0-1.0)
    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Request timeout for provider calls, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "ProviderConfig::huggingface")]
    pub huggingface: ProviderConfig,

    #[serde(default = "ProviderConfig::openai")]
    pub openai: ProviderConfig,

    #[serde(default = "ProviderConfig::perplexity")]
    pub perplexity: ProviderConfig,

    #[serde(default = "ProviderConfig::lmstudio")]
    pub lmstudio: ProviderConfig,

    #[serde(default = "ProviderConfig::gemini")]
    pub gemini: ProviderConfig,
}

/// Endpoint settings for one provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderConfig {
    /// Base URL for the API
    pub base_url: String,

    /// Model name
    pub model: String,

    /// Environment variable holding the API key; `None` for keyless local servers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

impl ProviderConfig {
    fn new(base_url: &str, model: &str, api_key_env: Option<&str>) -> Self {
        Self {
            base_url: base_url.to_string(),
            model: model.to_string(),
            api_key_env: api_key_env.map(str::to_string),
        }
    }

    pub fn huggingface() -> Self {
        Self::new(
            "https://router.huggingface.co/v1",
            "meta-llama/Llama-3.3-70B-Instruct",
            Some("HF_TOKEN"),
        )
    }

    pub fn openai() -> Self {
        Self::new(
            "https://api.openai.com/v1",
            "gpt-4o-mini",
            Some("OPENAI_API_KEY"),
        )
    }

    pub fn perplexity() -> Self {
        Self::new(
            "https://api.perplexity.ai",
            "sonar",
            Some("PERPLEXITY_API_KEY"),
        )
    }

    pub fn lmstudio() -> Self {
        Self::new("http://localhost:1234/v1", "local-model", None)
    }

    pub fn gemini() -> Self {
        Self::new(
            "https://generativelanguage.googleapis.com/v1beta",
            "gemini-1.5-flash",
            Some("GEMINI_API_KEY"),
        )
    }
}

/// One configured keyword route
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteConfig {
    /// Lower-case substrings that trigger the route
    pub keywords: Vec<String>,

    /// Protocol names appended when any keyword matches
    pub protocols: Vec<String>,
}

/// Reasoning brain configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrainConfig {
    /// Maximum number of task contexts kept for inspection
    #[serde(default = "default_max_active_contexts")]
    pub max_active_contexts: usize,

    /// Seconds a finished task context is kept before it expires
    #[serde(default = "default_context_ttl")]
    pub context_ttl_secs: u64,

    /// Per-protocol execution timeout in seconds
    #[serde(default = "default_protocol_timeout")]
    pub protocol_timeout_secs: u64,

    /// Default execution mode ("sequential" or "parallel")
    #[serde(default = "default_execution_mode")]
    pub default_execution_mode: String,

    /// Protocols disabled at startup
    #[serde(default)]
    pub disabled_protocols: Vec<String>,

    /// Extra keyword routes, checked after the built-in ones
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            max_active_contexts: default_max_active_contexts(),
            context_ttl_secs: default_context_ttl(),
            protocol_timeout_secs: default_protocol_timeout(),
            default_execution_mode: default_execution_mode(),
            disabled_protocols: Vec::new(),
            routes: Vec::new(),
        }
    }
}

/// Legal assistant configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegalConfig {
    /// Mode used when none is given on the command line
    #[serde(default = "default_legal_mode")]
    pub default_mode: String,

    /// Run the reasoning brain before answering
    #[serde(default = "default_true")]
    pub use_reasoning: bool,

    /// Answers kept in the response cache; 0 disables caching
    #[serde(default = "default_response_cache_size")]
    pub response_cache_size: usize,

    /// Seconds a cached answer stays valid
    #[serde(default = "default_response_cache_ttl")]
    pub response_cache_ttl_secs: u64,
}

impl Default for LegalConfig {
    fn default() -> Self {
        Self {
            default_mode: default_legal_mode(),
            use_reasoning: true,
            response_cache_size: default_response_cache_size(),
            response_cache_ttl_secs: default_response_cache_ttl(),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            default_provider: "huggingface".to_string(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            request_timeout_secs: default_request_timeout(),
            huggingface: ProviderConfig::huggingface(),
            openai: ProviderConfig::openai(),
            perplexity: ProviderConfig::perplexity(),
            lmstudio: ProviderConfig::lmstudio(),
            gemini: ProviderConfig::gemini(),
        }
    }
}

impl LLMConfig {
    /// Look up the endpoint settings for a provider name
    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        match name {
            "huggingface" => Some(&self.huggingface),
            "openai" => Some(&self.openai),
            "perplexity" => Some(&self.perplexity),
            "lmstudio" => Some(&self.lmstudio),
            "gemini" => Some(&self.gemini),
            _ => None,
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("~/.lexbrain")
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_p() -> f32 {
    0.95
}

fn default_request_timeout() -> u64 {
    120
}

fn default_max_active_contexts() -> usize {
    1024
}

fn default_context_ttl() -> u64 {
    3600
}

fn default_protocol_timeout() -> u64 {
    30
}

fn default_execution_mode() -> String {
    "sequential".to_string()
}

fn default_legal_mode() -> String {
    "general".to_string()
}

fn default_response_cache_size() -> usize {
    500
}

fn default_response_cache_ttl() -> u64 {
    1800
}

impl Config {
    /// Load configuration from the default location (~/.lexbrain/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        // Serialize before processing so the file keeps the portable "~" path
        let config = Self::default_config();
        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        let mut config = config;
        config.validate_and_process()?;

        Ok(config)
    }

    /// Get the default configuration file path (~/.lexbrain/config.toml)
    fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".lexbrain").join("config.toml"))
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            core: CoreConfig {
                log_level: default_log_level(),
                data_dir: default_data_dir(),
            },
            llm: LLMConfig::default(),
            brain: BrainConfig::default(),
            legal: LegalConfig::default(),
        }
    }

    /// Path of the case database inside the data directory
    pub fn database_path(&self) -> PathBuf {
        self.core.data_dir.join("lexbrain.db")
    }

    /// Validate and process configuration
    ///
    /// This method:
    /// - Validates enumerated fields and numeric ranges
    /// - Expands ~ in the data directory
    /// - Creates the data directory if it doesn't exist
    fn validate_and_process(&mut self) -> Result<(), EngineError> {
        self.validate()?;

        self.core.data_dir = expand_path(&self.core.data_dir)?;

        if !self.core.data_dir.exists() {
            fs::create_dir_all(&self.core.data_dir).map_err(|e| {
                EngineError::Config(format!("Failed to create data directory: {}", e))
            })?;
        }

        Ok(())
    }

    /// Validate field values without touching the file system
    pub fn validate(&self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if !KNOWN_PROVIDERS.contains(&self.llm.default_provider.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid default provider '{}'. Must be one of: {}",
                self.llm.default_provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(EngineError::Config(
                "temperature must be between 0.0 and 2.0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.llm.top_p) {
            return Err(EngineError::Config(
                "top_p must be between 0.0 and 1.0".to_string(),
            ));
        }
        if self.llm.max_tokens == 0 {
            return Err(EngineError::Config(
                "max_tokens must be greater than 0".to_string(),
            ));
        }

        if self.brain.max_active_contexts == 0 {
            return Err(EngineError::Config(
                "max_active_contexts must be greater than 0".to_string(),
            ));
        }
        if self.brain.protocol_timeout_secs == 0 {
            return Err(EngineError::Config(
                "protocol_timeout_secs must be greater than 0".to_string(),
            ));
        }

        let valid_modes = ["sequential", "parallel"];
        if !valid_modes.contains(&self.brain.default_execution_mode.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid execution mode '{}'. Must be one of: {}",
                self.brain.default_execution_mode,
                valid_modes.join(", ")
            )));
        }

        if self.legal.response_cache_size > 0 && self.legal.response_cache_ttl_secs == 0 {
            return Err(EngineError::Config(
                "response_cache_ttl_secs must be greater than 0 when caching is enabled"
                    .to_string(),
            ));
        }

        for route in &self.brain.routes {
            if route.keywords.is_empty() || route.protocols.is_empty() {
                return Err(EngineError::Config(
                    "Each brain route needs at least one keyword and one protocol".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Expand ~ in path to user's home directory
fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}
