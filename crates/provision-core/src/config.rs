//! Configuration management.
//!
//! This module provides multi-layer configuration support with:
//! - File-based configuration
//! - Environment variable overrides
//! - Programmatic updates
//!
//! ## Configuration Layers
//!
//! Configuration values are resolved in this priority order:
//! 1. Environment variables (`PROVISION_RUNTIME__JAVA_VERSION=21`)
//! 2. Programmatically set values
//! 3. Values loaded from file
//! 4. Default values
//!
//! ## Example
//!
//! ```no_run
//! use provision_core::config::{Config, ProvisionConfig};
//!
//! let mut config = Config::load("~/.provision/config")?.with_env_prefix("PROVISION");
//! let java: Option<u32> = config.get("runtime.java_version");
//! config.set("activation.max_parallel", 8)?;
//!
//! let typed = ProvisionConfig::from_layers(&config)?;
//! # Ok::<(), provision_types::ProvisionError>(())
//! ```

use provision_types::{ProcessType, ProvisionError, Result};
use provision_types::config::{LogConfig, RepositoryConfig};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::fs;
use crate::util::{deep_merge, expand_path, load_yaml, load_yaml_file, save_yaml_file};

/// Configuration layer priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigLayer {
    /// Default values
    Default = 0,
    /// Values loaded from file
    Loaded = 1,
    /// Values set programmatically
    Set = 2,
    /// Values from environment variables
    Environment = 3,
}

impl ConfigLayer {
    const ASCENDING: [ConfigLayer; 4] = [
        ConfigLayer::Default,
        ConfigLayer::Loaded,
        ConfigLayer::Set,
        ConfigLayer::Environment,
    ];
}

/// Layered configuration store.
///
/// This is the low-level configuration type; [`ProvisionConfig`] is the
/// typed view over its merged layers.
#[derive(Clone, Debug, Default)]
pub struct Config {
    layers: HashMap<ConfigLayer, Value>,
    file_path: Option<PathBuf>,
    auto_save: bool,
}

impl Config {
    /// Create a new configuration from a file path.
    ///
    /// If the file doesn't exist, an empty configuration is created.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = expand_path(path);
        let mut layers = HashMap::new();

        if path.exists() {
            let value = load_yaml_file(&path)
                .map_err(|e| ProvisionError::Config(format!("Failed to load config: {}", e)))?;

            if !value.is_null() {
                layers.insert(ConfigLayer::Loaded, value);
            }
        }

        Ok(Self {
            layers,
            file_path: Some(path),
            auto_save: false,
        })
    }

    /// Replace the default layer.
    pub fn with_defaults(mut self, defaults: Value) -> Self {
        self.layers.insert(ConfigLayer::Default, defaults);
        self
    }

    /// Populate the environment layer from process variables.
    ///
    /// `{PREFIX}_A__B=value` sets the dotted key `a.b`. Values are parsed as
    /// YAML scalars, so `17` becomes a number and `[a, b]` a list.
    pub fn with_env_prefix(self, prefix: &str) -> Self {
        self.with_env_vars(prefix, std::env::vars())
    }

    /// Populate the environment layer from an explicit variable list.
    pub fn with_env_vars(
        mut self,
        prefix: &str,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        let marker = format!("{}_", prefix.to_ascii_uppercase());
        let mut env_layer = Value::Object(Default::default());

        for (key, raw) in vars {
            let Some(stripped) = key.strip_prefix(&marker) else {
                continue;
            };
            if stripped.is_empty() {
                continue;
            }
            let dotted = stripped.to_ascii_lowercase().replace("__", ".");
            let value = load_yaml(&raw)
                .ok()
                .filter(|v| !v.is_null())
                .unwrap_or(Value::String(raw));
            Self::set_value_at_path(&mut env_layer, &dotted, value);
        }

        self.layers.insert(ConfigLayer::Environment, env_layer);
        self
    }

    /// Get a configuration value by key, respecting layer priority.
    ///
    /// Returns None if the key doesn't exist in any layer.
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        ConfigLayer::ASCENDING.iter().rev().find_map(|layer| {
            let data = self.layers.get(layer)?;
            let value = Self::get_value_at_path(data, key)?;
            serde_json::from_value(value.clone()).ok()
        })
    }

    /// Set a configuration value programmatically.
    pub fn set(&mut self, key: &str, value: impl Serialize) -> Result<()> {
        if key.is_empty() {
            return Err(ProvisionError::Config("Empty configuration key".to_string()));
        }

        let value = serde_json::to_value(value)
            .map_err(|e| ProvisionError::Config(format!("Failed to serialize value: {}", e)))?;

        let set_layer = self
            .layers
            .entry(ConfigLayer::Set)
            .or_insert(Value::Object(Default::default()));

        Self::set_value_at_path(set_layer, key, value);

        if self.auto_save {
            self.save()?;
        }

        Ok(())
    }

    /// Save configuration to file.
    pub fn save(&self) -> Result<()> {
        let path = self.file_path.as_ref().ok_or_else(|| {
            ProvisionError::Config("Cannot save: no file path set".to_string())
        })?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        save_yaml_file(path, &self.merged())
            .map_err(|e| ProvisionError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Merged data from all layers, lowest priority first.
    pub fn merged(&self) -> Value {
        ConfigLayer::ASCENDING
            .iter()
            .filter_map(|layer| self.layers.get(layer))
            .fold(Value::Object(Default::default()), |merged, layer| {
                deep_merge(merged, layer.clone())
            })
    }

    /// Enable auto-save on changes.
    pub fn with_auto_save(mut self, auto_save: bool) -> Self {
        self.auto_save = auto_save;
        self
    }

    fn get_value_at_path<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
        path.split('.').try_fold(data, |current, part| current.get(part))
    }

    fn set_value_at_path(data: &mut Value, path: &str, value: Value) {
        let mut current = data;
        let mut parts = path.split('.').peekable();

        while let Some(part) = parts.next() {
            if !current.is_object() {
                *current = Value::Object(Default::default());
            }
            let Value::Object(map) = current else {
                return;
            };
            if parts.peek().is_none() {
                map.insert(part.to_string(), value);
                return;
            }
            current = map
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Default::default()));
        }
    }
}

/// Facts about the runtime being provisioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeSettings {
    /// Operating system name
    #[serde(default = "default_os")]
    pub os: String,

    /// Major Java level of the runtime
    #[serde(default = "default_java_version")]
    pub java_version: u32,

    /// Ordered list of active platforms
    #[serde(default)]
    pub platforms: Vec<String>,

    /// Process type being provisioned
    #[serde(default)]
    pub process_type: ProcessType,
}

fn default_os() -> String {
    std::env::consts::OS.to_string()
}

fn default_java_version() -> u32 {
    17
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            os: default_os(),
            java_version: default_java_version(),
            platforms: Vec::new(),
            process_type: ProcessType::Server,
        }
    }
}

/// Resolver switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverSettings {
    /// Skip the singleton check (packaging use only)
    #[serde(default)]
    pub allow_multiple_versions: bool,

    /// Highest `IBM-Feature-Version` this runtime understands
    #[serde(default = "default_max_feature_version")]
    pub max_feature_version: u32,
}

fn default_max_feature_version() -> u32 {
    2
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            allow_multiple_versions: false,
            max_feature_version: default_max_feature_version(),
        }
    }
}

/// Activator switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationSettings {
    /// Worker pool width for parallel features
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,

    /// Start level for bundles that do not declare one
    #[serde(default = "default_start_level")]
    pub default_start_level: u32,
}

fn default_max_parallel() -> usize {
    4
}

fn default_start_level() -> u32 {
    20
}

impl Default for ActivationSettings {
    fn default() -> Self {
        Self {
            max_parallel: default_max_parallel(),
            default_start_level: default_start_level(),
        }
    }
}

/// Typed provisioning configuration (`~/.provision/config`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvisionConfig {
    /// Runtime facts
    #[serde(default)]
    pub runtime: RuntimeSettings,

    /// Resolver switches
    #[serde(default)]
    pub resolver: ResolverSettings,

    /// Activator switches
    #[serde(default)]
    pub activation: ActivationSettings,

    /// Feature definition directories
    #[serde(default)]
    pub repositories: Vec<RepositoryConfig>,

    /// Log outputs
    #[serde(default)]
    pub logs: Vec<LogConfig>,
}

impl ProvisionConfig {
    /// Load from a file, applying `PROVISION_*` environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let config = Config::load(path)?.with_env_prefix(crate::APP_NAME);
        Self::from_layers(&config)
    }

    /// Load from the default location.
    pub fn load_default() -> Result<Self> {
        Self::load(Self::default_path()?)
    }

    /// Build the typed view from a layered store.
    pub fn from_layers(config: &Config) -> Result<Self> {
        let mut typed: ProvisionConfig = serde_json::from_value(config.merged())
            .map_err(|e| ProvisionError::Config(format!("Failed to parse provisioning config: {}", e)))?;
        for repo in &mut typed.repositories {
            repo.path = expand_path(&repo.path);
        }
        typed.validate()?;
        Ok(typed)
    }

    /// Default path for the configuration file.
    pub fn default_path() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|home| home.join(".provision").join("config"))
            .ok_or_else(|| ProvisionError::Config("Could not determine home directory".to_string()))
    }

    /// Reject values the resolver and activator cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.activation.max_parallel == 0 {
            return Err(ProvisionError::Config(
                "activation.max_parallel must be at least 1".to_string(),
            ));
        }
        if self.activation.default_start_level == 0 {
            return Err(ProvisionError::Config(
                "activation.default_start_level must be a positive integer".to_string(),
            ));
        }
        if self.runtime.os.trim().is_empty() {
            return Err(ProvisionError::Config("runtime.os must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use provision_types::BundleRepositoryType;
    use serde_json::json;

    #[test]
    fn test_config_layers() {
        let mut config = Config::default()
            .with_defaults(json!({"key": "default_value", "other": 1}));
        config.layers.insert(ConfigLayer::Loaded, json!({"key": "loaded_value"}));

        let value: String = config.get("key").unwrap();
        assert_eq!(value, "loaded_value");
        assert_eq!(config.get::<u32>("other"), Some(1));

        config.set("key", "set_value").unwrap();
        assert_eq!(config.get::<String>("key").as_deref(), Some("set_value"));
    }

    #[test]
    fn test_env_layer_overrides_everything() {
        let mut config = Config::default().with_env_vars(
            "PROVISION",
            vec![
                ("PROVISION_RUNTIME__JAVA_VERSION".to_string(), "21".to_string()),
                ("PROVISION_RUNTIME__PLATFORMS".to_string(), "[jakartaee-10.0]".to_string()),
                ("UNRELATED".to_string(), "x".to_string()),
            ],
        );
        config.set("runtime.java_version", 11).unwrap();

        assert_eq!(config.get::<u32>("runtime.java_version"), Some(21));
        assert_eq!(
            config.get::<Vec<String>>("runtime.platforms"),
            Some(vec!["jakartaee-10.0".to_string()])
        );
        assert_eq!(config.get::<String>("unrelated"), None);
    }

    #[test]
    fn test_set_nested_key_creates_objects() {
        let mut config = Config::default();
        config.set("activation.max_parallel", 8).unwrap();
        assert_eq!(config.merged(), json!({"activation": {"max_parallel": 8}}));
        assert!(config.set("", 1).is_err());
    }

    #[test]
    fn test_provision_config_defaults() {
        let typed = ProvisionConfig::from_layers(&Config::default()).unwrap();
        assert_eq!(typed.runtime.java_version, 17);
        assert_eq!(typed.runtime.os, std::env::consts::OS);
        assert_eq!(typed.activation.max_parallel, 4);
        assert_eq!(typed.activation.default_start_level, 20);
        assert_eq!(typed.resolver.max_feature_version, 2);
        assert!(!typed.resolver.allow_multiple_versions);
    }

    #[test]
    fn test_provision_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config");
        fs::write(
            &path,
            "runtime:\n  platforms: [javaee-8.0]\n  process_type: client\nrepositories:\n  - type: usr\n    path: /opt/features\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        let typed = ProvisionConfig::from_layers(&config).unwrap();
        assert_eq!(typed.runtime.platforms, vec!["javaee-8.0".to_string()]);
        assert_eq!(typed.runtime.process_type, ProcessType::Client);
        assert_eq!(typed.repositories[0].repository, BundleRepositoryType::User);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = Config::default();
        config.set("activation.max_parallel", 0).unwrap();
        assert!(matches!(
            ProvisionConfig::from_layers(&config),
            Err(ProvisionError::Config(_))
        ));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config");
        let mut config = Config::load(&path).unwrap().with_auto_save(true);
        config.set("runtime.os", "aix").unwrap();

        let reloaded = Config::load(&path).unwrap();
        assert_eq!(reloaded.get::<String>("runtime.os").as_deref(), Some("aix"));
    }
}
