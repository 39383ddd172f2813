//! Config file grammars

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Grammar used to parse a config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigFileType {
    Json,
    Yaml,
}

impl ConfigFileType {
    pub fn as_str(self) -> &'static str {
        match self {
            ConfigFileType::Json => "json",
            ConfigFileType::Yaml => "yaml",
        }
    }

    /// Infer the grammar from a file extension (`.json`, `.yaml`, `.yml`).
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        ext.parse()
    }
}

impl FromStr for ConfigFileType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().trim_start_matches('.').to_ascii_lowercase();
        match name.as_str() {
            "json" => Ok(ConfigFileType::Json),
            "yaml" | "yml" => Ok(ConfigFileType::Yaml),
            _ => Err(ConfigError::InvalidConfigType(s.to_string())),
        }
    }
}

impl fmt::Display for ConfigFileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
