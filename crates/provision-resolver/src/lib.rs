//! # Provision Resolver
//!
//! Turns feature requests into an ordered [`ActivationPlan`] and drives a
//! [`BundleInstaller`] through it.
//!
//! Resolution is synchronous and performs no I/O. Activation is async;
//! bundles of a parallel feature that share a start level are started
//! concurrently and joined before the next level.
//!
//! ## Example
//!
//! ```
//! use provision_catalog::{Catalog, FeatureDefinition, FeatureResource};
//! use provision_core::ConfiguredPlatform;
//! use provision_resolver::Resolver;
//!
//! let catalog = Catalog::new(vec![
//!     FeatureDefinition::builder("app").constituent(FeatureResource::feature("core")).build(),
//!     FeatureDefinition::builder("core").build(),
//! ])?;
//! let platform = ConfiguredPlatform::default();
//!
//! let plan = Resolver::new(&catalog, &platform).resolve_names(&["app"])?;
//! assert_eq!(plan.resolved_features(), vec!["core", "app"]);
//! # Ok::<(), provision_types::ProvisionError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod activator;
pub mod plan;
pub mod provisioner;
pub mod resolver;

pub use activator::{ActivationReport, Activator, BundleInstaller};
pub use plan::{
    ActivationPlan, ActivationReason, ActivationStep, ArtifactInstall, BundleActivation,
    FeatureActivation, ResolutionWarning, ResolvedRequest, StartLevelGroup,
};
pub use provisioner::{ProvisionOutcome, Provisioner};
pub use resolver::{Resolver, ResolverOptions};
