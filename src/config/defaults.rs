//! Default values keyed by dotted path

use crate::error::{ConfigError, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Lowest-precedence configuration source.
///
/// Keys are dotted paths (`server.port`) and are matched case-insensitively
/// during resolution. Values are captured as JSON values at insertion time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Defaults {
    entries: BTreeMap<String, Value>,
}

impl Defaults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a default, replacing any previous value for the same key.
    pub fn insert<T: Serialize>(&mut self, key: impl Into<String>, value: T) -> Result<&mut Self> {
        let key = key.into();
        let value =
            serde_json::to_value(value).map_err(|source| ConfigError::InvalidDefault { key: key.clone(), source })?;
        self.entries.insert(key, value);
        Ok(self)
    }

    /// Builder form of [`Defaults::insert`].
    pub fn with<T: Serialize>(mut self, key: impl Into<String>, value: T) -> Result<Self> {
        self.insert(key, value)?;
        Ok(self)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Defaults {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self { entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect() }
    }
}

impl From<HashMap<String, Value>> for Defaults {
    fn from(map: HashMap<String, Value>) -> Self {
        map.into_iter().collect()
    }
}

impl From<BTreeMap<String, Value>> for Defaults {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Self { entries }
    }
}
