//! Telemetry and Observability
//!
//! Sets up `tracing-subscriber` for structured logging. Logs always go to
//! stderr so `--json` command output on stdout stays machine-readable.
//!
//! Priority for the filter: `RUST_LOG` > the level passed in > "info".
//! `LEXBRAIN_LOG_FORMAT=json|pretty` overrides the build-dependent format.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable that forces a log format
pub const LOG_FORMAT_ENV: &str = "LEXBRAIN_LOG_FORMAT";

/// Crates that log at `warn` unless `RUST_LOG` says otherwise
const NOISY_CRATES: [&str; 4] = ["sqlx", "hyper", "reqwest", "rustls"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// Pretty in debug builds, JSON in release builds
    pub fn for_build() -> Self {
        if cfg!(debug_assertions) {
            LogFormat::Pretty
        } else {
            LogFormat::Json
        }
    }

    fn from_env() -> Self {
        match std::env::var(LOG_FORMAT_ENV).as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("pretty") => LogFormat::Pretty,
            _ => Self::for_build(),
        }
    }
}

/// Filter directives for a log level: engine and sdk at `log_level`,
/// dependency noise capped at `warn`.
pub fn default_directives(log_level: &str) -> String {
    let mut directives = vec![
        log_level.to_string(),
        format!("lexbrain_engine={}", log_level),
        format!("sdk={}", log_level),
    ];
    directives.extend(NOISY_CRATES.iter().map(|c| format!("{}=warn", c)));
    directives.join(",")
}

/// Initialize the tracing subscriber with the given log level from config.
pub fn init_telemetry_with_level(log_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(log_level)));

    // A subscriber may already be installed (tests); keep the first one
    match LogFormat::from_env() {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .ok(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .ok(),
    };
}
