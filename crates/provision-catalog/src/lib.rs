//! # Provision Catalog
//!
//! Feature definitions and the catalog the resolver reads them from.
//!
//! This crate provides:
//!
//! - **Header parsing**: OSGi `name; attr=value; directive:=value` clauses
//! - **Constituents**: [`FeatureResource`], one `Subsystem-Content` entry
//! - **Definitions**: [`FeatureDefinition`] with its pure queries
//! - **Capabilities**: the LDAP-style auto-feature trigger grammar
//! - **Loading**: `.mf` manifests and YAML definitions
//! - **Catalog**: the immutable [`Catalog`] snapshot, the
//!   [`FeatureRepository`] lookup seam, and [`ProcessRestricted`]
//!
//! ## Example
//!
//! ```
//! use provision_catalog::{Catalog, FeatureDefinition, FeatureRepository, FeatureResource};
//! use provision_types::FeatureRequest;
//!
//! let catalog = Catalog::new(vec![
//!     FeatureDefinition::builder("com.acme.servlet-4.0")
//!         .short_name("servlet-4.0")
//!         .constituent(FeatureResource::bundle("com.acme.servlet.api").with_start_level(10))
//!         .build(),
//! ])?;
//!
//! let request = FeatureRequest::parse("servlet-4.0")?;
//! let servlet = catalog.lookup(&request).unwrap();
//! assert_eq!(servlet.family(), "com.acme.servlet");
//! # Ok::<(), provision_types::ProvisionError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod capability;
pub mod catalog;
pub mod definition;
pub mod header;
pub mod manifest;
pub mod metadata;
pub mod resource;

pub use capability::{Filter, ProvisionCapability};
pub use catalog::{Catalog, CatalogIssue, FeatureRepository, ProcessRestricted};
pub use definition::{FeatureDefinition, FeatureDefinitionBuilder, FeatureKind};
pub use header::HeaderClause;
pub use resource::FeatureResource;
