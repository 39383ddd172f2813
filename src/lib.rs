//! config-resolver: layered configuration for typed structs
//!
//! Loads a JSON or YAML config file, merges it over default values, applies
//! environment-variable overrides, and deserializes the result into a
//! caller-owned struct. Precedence is env > file > defaults.
//!
//! ```no_run
//! use config_resolver::{ConfigFileType, Resolver};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! #[serde(rename_all = "camelCase")]
//! struct Settings {
//!     listen_port: u16,
//!     log_level: String,
//! }
//!
//! let mut settings = Settings::default();
//! Resolver::new(ConfigFileType::Yaml)
//!     .file("settings.yaml")
//!     .default_value("listenPort", 8080)?
//!     .env_prefix("myapp")
//!     .resolve(&mut settings)?;
//! # Ok::<(), config_resolver::ConfigError>(())
//! ```

pub mod config;
pub mod error;
mod utils;

pub use config::{resolve, ConfigFileType, Defaults, Environment, Resolver};
pub use error::{ConfigError, Result};
