//! Config file loading

use crate::config::ConfigFileType;
use crate::error::{ConfigError, Result};
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Read and parse a config file.
///
/// Returns `Ok(None)` when the file is blank or its document is null, so an
/// empty config contributes no keys instead of failing.
pub fn load_file(path: &Path, file_type: ConfigFileType) -> Result<Option<Value>> {
    let content = fs::read_to_string(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => ConfigError::FileNotFound { path: path.to_path_buf() },
        _ => ConfigError::Io { path: path.to_path_buf(), source },
    })?;

    if content.trim().is_empty() {
        tracing::debug!("Config file {} is empty; no keys contributed", path.display());
        return Ok(None);
    }

    let parsed = parse_content(&content, file_type, path)?;

    match parsed {
        Value::Null => {
            tracing::debug!("Config file {} has a null document; no keys contributed", path.display());
            Ok(None)
        }
        Value::Object(_) => Ok(Some(parsed)),
        _ => Err(ConfigError::NotAMapping { path: path.to_path_buf() }),
    }
}

fn parse_content(content: &str, file_type: ConfigFileType, path: &Path) -> Result<Value> {
    let parse_err = |source: Box<dyn std::error::Error + Send + Sync>| ConfigError::Parse {
        path: path.to_path_buf(),
        format: file_type,
        source,
    };

    match file_type {
        ConfigFileType::Json => serde_json::from_str(content).map_err(|e| parse_err(Box::new(e))),
        ConfigFileType::Yaml => {
            let mut document: serde_yaml::Value = serde_yaml::from_str(content).map_err(|e| parse_err(Box::new(e)))?;
            // `<<: *anchor` merge keys
            document.apply_merge().map_err(|e| parse_err(Box::new(e)))?;
            serde_json::to_value(document).map_err(|e| parse_err(Box::new(e)))
        }
    }
}
