//! # Provision Core
//!
//! Configuration management, logging, and shared utilities for the
//! feature provisioning tools.
//!
//! This crate provides:
//!
//! - **Configuration**: Layered configuration (defaults, file, programmatic,
//!   environment) and the typed [`ProvisionConfig`]
//! - **Logging**: `tracing` subscriber setup with multiple outputs
//! - **Platform**: [`ConfiguredPlatform`], the configured answer to
//!   "which OS, Java level, and platforms are we provisioning for"
//! - **Utilities**: YAML handling, deep merging, path expansion
//!
//! ## Example
//!
//! ```no_run
//! use provision_core::{log, ProvisionConfig, ConfiguredPlatform};
//!
//! log::init_default()?;
//!
//! let config = ProvisionConfig::load("~/.provision/config")?;
//! let platform = ConfiguredPlatform::from_config(&config);
//! # Ok::<(), provision_types::ProvisionError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod log;
pub mod platform;
pub mod util;

// Re-export commonly used items
pub use config::{Config, ProvisionConfig};
pub use platform::ConfiguredPlatform;
pub use provision_types::{ProvisionError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name, also the environment variable prefix
pub const APP_NAME: &str = "provision";
