//! Configuration resolution
//!
//! Merges defaults, an optional config file, and environment variables into a
//! caller-owned struct with precedence env > file > defaults. Fields that no
//! source sets keep whatever value the target already held.

use crate::config::decode::{decode, decode_over, is_struct_like};
use crate::config::env::{apply_env_overrides, Environment};
use crate::config::loader::load_file;
use crate::config::merge::ResolutionContext;
use crate::config::{ConfigFileType, Defaults};
use crate::error::{ConfigError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Resolve configuration into `target`.
///
/// An empty or absent `file_path` means there is no file source. An empty or
/// absent `env_prefix` means environment variables are matched unprefixed.
/// On error `target` is left untouched.
pub fn resolve<T>(
    file_type: ConfigFileType,
    file_path: Option<&Path>,
    target: &mut T,
    defaults: &Defaults,
    env_prefix: Option<&str>,
) -> Result<()>
where
    T: Serialize + DeserializeOwned,
{
    let mut resolver = Resolver::new(file_type).defaults(defaults.clone());
    if let Some(path) = file_path {
        resolver = resolver.file(path);
    }
    if let Some(prefix) = env_prefix {
        resolver = resolver.env_prefix(prefix);
    }
    resolver.resolve(target)
}

/// Reusable description of where configuration comes from.
///
/// Every call to [`Resolver::resolve`] builds a fresh resolution context and
/// takes a fresh environment snapshot, so one `Resolver` can be shared across
/// threads without resolutions observing each other.
#[derive(Debug, Clone)]
pub struct Resolver {
    file_type: ConfigFileType,
    file: Option<PathBuf>,
    defaults: Defaults,
    env_prefix: Option<String>,
    environment: Option<Environment>,
}

impl Resolver {
    pub fn new(file_type: ConfigFileType) -> Self {
        Self { file_type, file: None, defaults: Defaults::new(), env_prefix: None, environment: None }
    }

    /// Resolver reading `path`, with the grammar inferred from its extension.
    pub fn for_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        Ok(Self::new(ConfigFileType::from_path(path)?).file(path))
    }

    /// Read the config file at `path`. An empty path disables the file source.
    pub fn file(mut self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        self.file = if path.as_os_str().is_empty() { None } else { Some(path.to_path_buf()) };
        self
    }

    pub fn defaults(mut self, defaults: Defaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn default_value<V: Serialize>(mut self, key: impl Into<String>, value: V) -> Result<Self> {
        self.defaults.insert(key, value)?;
        Ok(self)
    }

    /// Only consider variables named `PREFIX_...`. An empty prefix disables filtering.
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.env_prefix = if prefix.is_empty() { None } else { Some(prefix) };
        self
    }

    /// Use `environment` instead of a snapshot of the process environment.
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    pub fn file_type(&self) -> ConfigFileType {
        self.file_type
    }

    /// Resolve into `target`. Fields with no resolved value keep their current value.
    pub fn resolve<T>(&self, target: &mut T) -> Result<()>
    where
        T: Serialize + DeserializeOwned,
    {
        ensure_struct_like::<T>()?;
        let store = self.resolve_value()?;
        let prior = serde_json::to_value(&*target).map_err(ConfigError::Unmarshal)?;
        *target = decode_over(store, prior).map_err(ConfigError::Unmarshal)?;
        Ok(())
    }

    /// Resolve into a fresh `T`. Fields with no resolved value must have serde defaults.
    pub fn extract<T: DeserializeOwned>(&self) -> Result<T> {
        ensure_struct_like::<T>()?;
        let store = self.resolve_value()?;
        decode(store).map_err(ConfigError::Unmarshal)
    }

    /// The resolved key/value store after environment overrides, with lower-cased keys.
    pub fn resolve_value(&self) -> Result<Value> {
        let mut context = ResolutionContext::new().seed_defaults(&self.defaults);

        match &self.file {
            Some(path) => {
                if let Some(document) = load_file(path, self.file_type)? {
                    context = context.overlay(document);
                }
            }
            None => tracing::debug!("No config file given; skipping file source"),
        }

        let mut store = context.into_value()?;

        let process_env;
        let env = match &self.environment {
            Some(env) => env,
            None => {
                process_env = Environment::from_process();
                &process_env
            }
        };
        let applied = apply_env_overrides(&mut store, env, self.env_prefix.as_deref());
        tracing::debug!(overrides = applied, "Resolved configuration store");

        Ok(store)
    }
}

fn ensure_struct_like<T: DeserializeOwned>() -> Result<()> {
    if is_struct_like::<T>() {
        Ok(())
    } else {
        Err(ConfigError::TargetNotAddressable { type_name: std::any::type_name::<T>() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::fs;
    use tempfile::TempDir;

    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct TestConfig {
        int_value: i32,
        string_value: String,
        bool_value: bool,
        slice_value: Vec<i32>,
    }

    #[derive(Debug, Default, PartialEq, Deserialize)]
    #[serde(default)]
    struct Partial {
        name: String,
        port: u16,
    }

    fn write(tmp: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = tmp.path().join(name);
        fs::write(&path, content).expect("write");
        path
    }

    #[test]
    fn test_defaults_only_without_file() {
        let defaults = Defaults::new()
            .with("intValue", 7)
            .unwrap()
            .with("stringValue", "dflt")
            .unwrap()
            .with("boolValue", true)
            .unwrap()
            .with("sliceValue", vec![9])
            .unwrap();

        let mut cfg = TestConfig::default();
        Resolver::new(ConfigFileType::Json)
            .defaults(defaults)
            .environment(Environment::empty())
            .resolve(&mut cfg)
            .expect("resolve");

        assert_eq!(
            cfg,
            TestConfig { int_value: 7, string_value: "dflt".into(), bool_value: true, slice_value: vec![9] }
        );
    }

    #[test]
    fn test_empty_path_means_no_file() {
        let mut cfg = TestConfig::default();
        Resolver::new(ConfigFileType::Yaml)
            .file("")
            .environment(Environment::empty())
            .resolve(&mut cfg)
            .expect("empty path is not an error");
        assert_eq!(cfg, TestConfig::default());
    }

    #[test]
    fn test_prior_values_are_kept() {
        let tmp = TempDir::new().expect("tmp");
        let path = write(&tmp, "c.json", r#"{"stringValue": "from file"}"#);

        let mut cfg = TestConfig { int_value: 5, slice_value: vec![1], ..Default::default() };
        Resolver::new(ConfigFileType::Json)
            .file(&path)
            .environment(Environment::empty())
            .resolve(&mut cfg)
            .expect("resolve");

        assert_eq!(
            cfg,
            TestConfig { int_value: 5, string_value: "from file".into(), bool_value: false, slice_value: vec![1] }
        );
    }

    #[test]
    fn test_failure_leaves_target_untouched() {
        let tmp = TempDir::new().expect("tmp");
        let path = write(&tmp, "c.json", r#"{"intValue": "not a number", "stringValue": "x"}"#);

        let before = TestConfig { int_value: 1, string_value: "keep".into(), ..Default::default() };
        let mut cfg = before.clone();
        let err = Resolver::new(ConfigFileType::Json)
            .file(&path)
            .environment(Environment::empty())
            .resolve(&mut cfg)
            .unwrap_err();

        assert!(matches!(err, ConfigError::Unmarshal(_)));
        assert_eq!(cfg, before);
    }

    #[test]
    fn test_non_struct_target_fails_before_io() {
        let mut target = 0i32;
        let err = Resolver::new(ConfigFileType::Json)
            .file("/path/to/non-existent/file")
            .resolve(&mut target)
            .unwrap_err();
        assert!(matches!(err, ConfigError::TargetNotAddressable { type_name } if type_name == "i32"));

        let mut list: Vec<String> = Vec::new();
        let err = Resolver::new(ConfigFileType::Json).resolve(&mut list).unwrap_err();
        assert!(matches!(err, ConfigError::TargetNotAddressable { .. }));
    }

    #[test]
    fn test_for_file_infers_grammar() {
        let tmp = TempDir::new().expect("tmp");
        let path = write(&tmp, "app.yml", "name: svc\nport: 9000\n");

        let resolver = Resolver::for_file(&path).expect("resolver");
        assert_eq!(resolver.file_type(), ConfigFileType::Yaml);

        let parsed: Partial = resolver.environment(Environment::empty()).extract().expect("extract");
        assert_eq!(parsed, Partial { name: "svc".into(), port: 9000 });

        assert!(matches!(Resolver::for_file("app.toml"), Err(ConfigError::InvalidConfigType(_))));
    }

    #[test]
    fn test_extract_uses_serde_defaults_for_missing_fields() {
        let parsed: Partial = Resolver::new(ConfigFileType::Json)
            .default_value("port", 80)
            .unwrap()
            .environment(Environment::empty())
            .extract()
            .expect("extract");
        assert_eq!(parsed, Partial { name: String::new(), port: 80 });
    }

    #[test]
    fn test_resolve_value_exposes_store() {
        let env: Environment = [("APP_SERVER_PORT", "1234")].into_iter().collect();
        let store = Resolver::new(ConfigFileType::Json)
            .default_value("server.port", 80)
            .unwrap()
            .env_prefix("app")
            .environment(env)
            .resolve_value()
            .expect("store");
        assert_eq!(store, serde_json::json!({"server": {"port": "1234"}}));
    }

    #[test]
    fn test_free_function_matches_builder() {
        let tmp = TempDir::new().expect("tmp");
        let path = write(&tmp, "c.yaml", "intValue: 3\nstringValue: y\nboolValue: true\nsliceValue: [2]\n");

        let mut cfg = TestConfig::default();
        // Unique prefix so process variables cannot leak in
        resolve(ConfigFileType::Yaml, Some(&path), &mut cfg, &Defaults::new(), Some("_CFGRES_UNIT_NOPE"))
            .expect("resolve");
        assert_eq!(
            cfg,
            TestConfig { int_value: 3, string_value: "y".into(), bool_value: true, slice_value: vec![2] }
        );
    }
}
