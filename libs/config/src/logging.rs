//! Logging setup shared by binaries

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset, e.g. `info` or
    /// `codec=debug,warn`
    pub level: String,

    /// Emit one JSON object per event instead of human-readable lines
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl LoggingConfig {
    /// Filter from `RUST_LOG`, falling back to the configured level
    pub fn env_filter(&self) -> Result<EnvFilter> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(&self.level)
                .with_context(|| format!("Invalid log filter '{}'", self.level)),
        }
    }
}

/// Install the global subscriber; fails if one is already installed
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = config.env_filter()?;

    tracing_subscriber::registry()
        .with(filter)
        .with(config.json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!config.json).then(|| fmt::layer().with_writer(std::io::stderr)))
        .try_init()
        .context("Failed to initialize logging")
}
