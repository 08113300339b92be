//! Application configuration loading
//!
//! Supports loading from TOML files with environment-specific overrides and
//! `PUBSUB_` environment variables on top.

use crate::logging::LoggingConfig;
use anyhow::{ensure, Context, Result};
use codec::{BufferPool, CodecConfig, LENGTH_FIELD_SIZE};
use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const DEFAULT_CONFIG_PATH: &str = "config/pubsub.toml";
const ENVIRONMENTS_DIR: &str = "config/environments";

/// Everything a codec user configures at startup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub codec: CodecConfig,
}

impl AppConfig {
    /// Load configuration from files with environment overrides
    ///
    /// An explicit `base_path` must exist; the default path is optional so a
    /// bare deployment runs on built-in defaults.
    pub fn load(base_path: Option<&Path>, environment: Option<&str>) -> Result<Self> {
        let base = match base_path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_PATH).required(false),
        };

        let mut builder = Config::builder().add_source(base);

        if let Some(env) = environment {
            let env_file = PathBuf::from(ENVIRONMENTS_DIR).join(format!("{}.toml", env));
            if env_file.exists() {
                info!("Loading environment config: {:?}", env_file);
                builder = builder.add_source(File::from(env_file));
            } else {
                warn!("Environment config not found: {:?}", env_file);
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("PUBSUB")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        debug!(?config, "Configuration loaded");
        Ok(config)
    }

    /// Reject settings the codec cannot run with
    pub fn validate(&self) -> Result<()> {
        BufferPool::try_new(self.codec.pool.clone()).context("Invalid codec.pool settings")?;

        // Smallest frame: total_length, command_length, metadata_length
        let minimum = 3 * LENGTH_FIELD_SIZE;
        ensure!(
            self.codec.max_frame_size >= minimum,
            "codec.max_frame_size must be at least {} bytes, got {}",
            minimum,
            self.codec.max_frame_size
        );
        ensure!(
            self.codec.max_frame_size <= u32::MAX as usize,
            "codec.max_frame_size {} cannot be expressed in a 32-bit length field",
            self.codec.max_frame_size
        );
        Ok(())
    }

    /// Render as TOML, e.g. to seed a config file
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}

/// Load configuration from the default location
pub fn load_config(environment: Option<&str>) -> Result<AppConfig> {
    AppConfig::load(None, environment)
}
