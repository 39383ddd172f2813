//! Environment variable overrides

use crate::utils::keys::{env_var_name, join_key};
use serde_json::Value;
use std::collections::HashMap;

/// Snapshot of environment variables used for one resolution.
///
/// Variables with an empty value are treated as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    /// Capture the current process environment. Non-UTF-8 entries are skipped.
    pub fn from_process() -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Self { vars }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str).filter(|v| !v.is_empty())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self { vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }
}

/// Replace every leaf of `store` that has a matching environment variable.
///
/// Objects are walked recursively; arrays and scalars are leaves. The variable
/// value is stored as a string and coerced to the target field type at decode
/// time. Returns the number of overrides applied.
pub fn apply_env_overrides(store: &mut Value, env: &Environment, prefix: Option<&str>) -> usize {
    apply_at(store, "", env, prefix)
}

fn apply_at(value: &mut Value, path: &str, env: &Environment, prefix: Option<&str>) -> usize {
    match value {
        Value::Object(map) => map
            .iter_mut()
            .map(|(key, child)| apply_at(child, &join_key(path, key), env, prefix))
            .sum(),
        leaf => {
            if path.is_empty() {
                return 0;
            }
            let var = env_var_name(prefix, path);
            match env.get(&var) {
                Some(raw) => {
                    tracing::debug!(key = %path, var = %var, "applying environment override");
                    *leaf = Value::String(raw.to_string());
                    1
                }
                None => 0,
            }
        }
    }
}
