//! Provider logging.
//!
//! Terraform captures the plugin's stderr and shows it when `TF_LOG` is set;
//! stdout carries the handshake only, so every event goes to stderr.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use crate::env::SourceEnv;

/// Variables consulted for the log level, most specific first.
pub const LOG_LEVEL_VARS: [&str; 3] = ["TF_LOG_PROVIDER_ENV", "TF_LOG_PROVIDER", "TF_LOG"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogSettings {
    pub level: LevelFilter,
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: LevelFilter::WARN,
            json: false,
        }
    }
}

impl LogSettings {
    pub fn from_env(env: &SourceEnv) -> Self {
        LOG_LEVEL_VARS
            .iter()
            .filter_map(|name| env.var(name))
            .find(|value| !value.trim().is_empty())
            .map(|value| Self::parse(&value))
            .unwrap_or_default()
    }

    /// Terraform's level names; unrecognised values mean `TRACE` like in
    /// Terraform itself.
    pub fn parse(value: &str) -> Self {
        let level = match value.trim().to_ascii_uppercase().as_str() {
            "OFF" => LevelFilter::OFF,
            "ERROR" => LevelFilter::ERROR,
            "WARN" => LevelFilter::WARN,
            "INFO" => LevelFilter::INFO,
            "DEBUG" => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        };
        Self {
            level,
            json: value.trim().eq_ignore_ascii_case("JSON"),
        }
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn try_init(settings: LogSettings) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::new(settings.level.to_string());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false);

    if settings.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    }
}
