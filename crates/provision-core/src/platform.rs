//! Configured platform detection.

use provision_types::{PlatformDetector, ProcessType};
use crate::config::{ProvisionConfig, RuntimeSettings};

/// A [`PlatformDetector`] answering from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfiguredPlatform {
    os: String,
    java_version: u32,
    platforms: Vec<String>,
    process_type: ProcessType,
}

impl ConfiguredPlatform {
    /// Build from the runtime section of the configuration.
    pub fn from_config(config: &ProvisionConfig) -> Self {
        Self::from_runtime(&config.runtime)
    }

    /// Build from runtime settings.
    pub fn from_runtime(runtime: &RuntimeSettings) -> Self {
        Self {
            os: runtime.os.to_ascii_lowercase(),
            java_version: runtime.java_version,
            platforms: runtime.platforms.clone(),
            process_type: runtime.process_type,
        }
    }

    /// Append platforms, e.g. from `--platform` flags, keeping order and
    /// dropping duplicates.
    pub fn with_platforms(mut self, extra: impl IntoIterator<Item = String>) -> Self {
        for platform in extra {
            if !self.platforms.iter().any(|p| p.eq_ignore_ascii_case(&platform)) {
                self.platforms.push(platform);
            }
        }
        self
    }
}

impl Default for ConfiguredPlatform {
    fn default() -> Self {
        Self::from_runtime(&RuntimeSettings::default())
    }
}

impl PlatformDetector for ConfiguredPlatform {
    fn os(&self) -> &str {
        &self.os
    }

    fn java_version(&self) -> u32 {
        self.java_version
    }

    fn platforms(&self) -> &[String] {
        &self.platforms
    }

    fn process_type(&self) -> ProcessType {
        self.process_type
    }
}
