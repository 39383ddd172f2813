//! Error types

use crate::config::ConfigFileType;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// The target type does not deserialize as a struct or map.
    #[error("target type `{type_name}` is not an addressable struct or map")]
    TargetNotAddressable { type_name: &'static str },

    #[error("config file does not exist: {}", .path.display())]
    FileNotFound { path: PathBuf },

    #[error("invalid config file type: {0:?} (expected json or yaml)")]
    InvalidConfigType(String),

    #[error("failed reading config file: {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid {format} syntax: {}", .path.display())]
    Parse {
        path: PathBuf,
        format: ConfigFileType,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("config file must contain a mapping at the top level: {}", .path.display())]
    NotAMapping { path: PathBuf },

    #[error("default for key `{key}` could not be serialized")]
    InvalidDefault {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed merging configuration sources")]
    Merge(#[source] Box<figment::Error>),

    #[error("failed to unmarshal configuration into target")]
    Unmarshal(#[source] serde_json::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Merge(Box::new(err))
    }
}
