//! # Pub/Sub Configuration
//!
//! Loads the settings a codec user needs at startup and initializes logging.
//!
//! ## Sources
//!
//! Later sources override earlier ones:
//!
//! 1. Built-in defaults ([`AppConfig::default`])
//! 2. Base TOML file (`config/pubsub.toml` unless a path is given)
//! 3. Environment overlay file (`config/environments/<env>.toml`)
//! 4. Environment variables: `PUBSUB_` prefix, `__` between nested keys,
//!    e.g. `PUBSUB_CODEC__CHECKSUM=none`
//!
//! ## Usage
//!
//! ```rust,no_run
//! let config = config::load_config(Some("production"))?;
//! config::init_logging(&config.logging)?;
//! let encoder = codec::FrameEncoder::from_config(&config.codec);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod app_config;
pub mod logging;

pub use app_config::{load_config, AppConfig};
pub use logging::{init_logging, LoggingConfig};
