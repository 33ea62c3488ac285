//! # Provision Types
//!
//! Core types, manifest tokens, and errors shared by all provisioning crates.
//!
//! This crate provides:
//!
//! - Total parsers for manifest header tokens (`SubsystemContentType`,
//!   `ActivationType`, `Visibility`, `ProcessType`)
//! - OSGi versions and version ranges
//! - Feature name helpers and request parsing
//! - The `ProvisionError` taxonomy and `Result` alias
//! - Seam traits for capability evaluation and platform detection
//!
//! ## Example
//!
//! ```
//! use provision_types::{ActivationType, SubsystemContentType, parse_name_and_version};
//!
//! assert_eq!(ActivationType::parse(Some("Parallel")), ActivationType::Parallel);
//! assert_eq!(ActivationType::parse(Some("eventually")), ActivationType::Sequential);
//! assert_eq!(SubsystemContentType::parse(Some("")), SubsystemContentType::BundleType);
//!
//! let (family, version) = parse_name_and_version("com.acme.servlet-4.0");
//! assert_eq!(family, "com.acme.servlet");
//! assert_eq!(version, Some("4.0"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod identifiers;
pub mod enums;
pub mod traits;
pub mod config;

// Re-export common types for convenience
pub use errors::{ProvisionError, Result};
pub use identifiers::{parse_name_and_version, FeatureRequest, Version, VersionRange};
pub use enums::{
    ActivationType, BundleRepositoryType, LogLevel, ProcessType, SubsystemContentType, Visibility,
};
pub use traits::{CapabilityProvider, PlatformDetector};
