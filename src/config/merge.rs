//! Layered resolution store
//!
//! Each resolution builds its own [`ResolutionContext`]: a figment whose
//! providers are stacked so later layers override earlier ones. All keys are
//! lower-cased on the way in so sources that spell a key differently still
//! land on the same entry.

use crate::config::Defaults;
use crate::error::Result;
use crate::utils::keys::fold_key;
use figment::providers::Serialized;
use figment::Figment;
use serde_json::{Map, Value};

/// Per-call key/value store, never shared between resolutions.
pub struct ResolutionContext {
    figment: Figment,
}

impl ResolutionContext {
    pub fn new() -> Self {
        Self { figment: Figment::new() }
    }

    /// Seed the store with defaults. Dotted keys nest: `a.b` sets `{a: {b: ..}}`.
    pub fn seed_defaults(mut self, defaults: &Defaults) -> Self {
        for (key, value) in defaults.iter() {
            let value = fold_keys(value.clone());
            let key = fold_key(key);
            self.figment = if key.is_empty() {
                self.figment.merge(Serialized::defaults(value))
            } else {
                self.figment.merge(Serialized::default(&key, value))
            };
        }
        self
    }

    /// Overlay a parsed document; its values override everything seeded so far.
    pub fn overlay(mut self, document: Value) -> Self {
        self.figment = self.figment.merge(Serialized::defaults(fold_keys(document)));
        self
    }

    /// Collapse the layers into a single JSON object.
    pub fn into_value(self) -> Result<Value> {
        Ok(self.figment.extract::<Value>()?)
    }
}

impl Default for ResolutionContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Lower-case every object key, recursing into objects and arrays.
pub fn fold_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut folded = Map::with_capacity(map.len());
            for (key, child) in map {
                let key = fold_key(&key);
                if folded.contains_key(&key) {
                    tracing::debug!(key = %key, "duplicate key after case folding; later value wins");
                }
                folded.insert(key, fold_keys(child));
            }
            Value::Object(folded)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(fold_keys).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use serde_json::json;

    #[test]
    fn test_empty_context_is_empty_object() {
        let value = ResolutionContext::new().into_value().unwrap();
        assert_eq!(value, json!({}));
    }

    #[test]
    fn test_dotted_defaults_nest() {
        let defaults = Defaults::new()
            .with("server.port", 8080)
            .unwrap()
            .with("server.host", "localhost")
            .unwrap()
            .with("debug", false)
            .unwrap();

        let value = ResolutionContext::new().seed_defaults(&defaults).into_value().unwrap();
        assert_eq!(value, json!({"server": {"port": 8080, "host": "localhost"}, "debug": false}));
    }

    #[test]
    fn test_document_overrides_defaults() {
        let defaults = Defaults::new()
            .with("sliceValue", vec![1, 2, 3])
            .unwrap()
            .with("intValue", 1)
            .unwrap();
        let document = json!({"intValue": 123, "stringValue": "test string"});

        let value = ResolutionContext::new().seed_defaults(&defaults).overlay(document).into_value().unwrap();
        assert_eq!(
            value,
            json!({"slicevalue": [1, 2, 3], "intvalue": 123, "stringvalue": "test string"})
        );
    }

    #[test]
    fn test_nested_objects_merge_and_arrays_replace() {
        let defaults = Defaults::new()
            .with("server", json!({"host": "a", "port": 1}))
            .unwrap()
            .with("tags", vec!["x", "y"])
            .unwrap();
        let document = json!({"Server": {"Port": 2}, "tags": ["z"]});

        let value = ResolutionContext::new().seed_defaults(&defaults).overlay(document).into_value().unwrap();
        assert_eq!(value, json!({"server": {"host": "a", "port": 2}, "tags": ["z"]}));
    }

    #[test]
    fn test_default_keys_are_case_insensitive() {
        let defaults = Defaults::new().with("Server.PORT", 1).unwrap();
        let value = ResolutionContext::new()
            .seed_defaults(&defaults)
            .overlay(json!({"server": {"port": 2}}))
            .into_value()
            .unwrap();
        assert_eq!(value, json!({"server": {"port": 2}}));
    }

    #[test]
    fn test_non_object_root_default_is_merge_error() {
        let defaults = Defaults::new().with("", 5).unwrap();
        let err = ResolutionContext::new().seed_defaults(&defaults).into_value().unwrap_err();
        assert!(matches!(err, ConfigError::Merge(_)));
    }

    #[test]
    fn test_fold_keys_recurses_into_arrays() {
        let value = fold_keys(json!({"Items": [{"Name": "a"}], "Flag": true}));
        assert_eq!(value, json!({"items": [{"name": "a"}], "flag": true}));
    }
}
