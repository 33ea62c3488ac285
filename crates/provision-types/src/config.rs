//! Configuration types and structures.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use crate::enums::BundleRepositoryType;

/// A directory of feature definitions belonging to one bundle repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Repository the definitions belong to (`core`, `usr`, or a product name)
    #[serde(rename = "type", default)]
    pub repository: BundleRepositoryType,
    /// Directory scanned recursively for `.mf` and `.yml` definitions
    pub path: PathBuf,
}

/// Log configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log file path template; `-` writes to stderr and `{date}` expands
    /// to the current date
    pub path: String,
    /// Log level for this output
    pub level: crate::LogLevel,
    /// Log format (pretty, json, compact)
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format with colors
    Pretty,
    /// JSON format for machine parsing
    Json,
    /// Compact single-line format
    Compact,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_config_yaml() {
        let repo: RepositoryConfig =
            serde_yaml::from_str("type: usr\npath: /opt/wlp/usr/extension/lib/features").unwrap();
        assert_eq!(repo.repository, BundleRepositoryType::User);

        let core: RepositoryConfig = serde_yaml::from_str("path: lib/features").unwrap();
        assert_eq!(core.repository, BundleRepositoryType::Core);
    }

    #[test]
    fn test_log_config_defaults_to_pretty() {
        let log: LogConfig = serde_yaml::from_str("path: '-'\nlevel: debug").unwrap();
        assert_eq!(log.format, LogFormat::Pretty);
        assert_eq!(log.level, crate::LogLevel::Debug);
    }
}
