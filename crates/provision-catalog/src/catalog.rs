//! The immutable feature catalog and repository lookup.

use crate::definition::FeatureDefinition;
use crate::manifest::load_manifest_file;
use crate::metadata::load_metadata_file;
use indexmap::IndexMap;
use provision_core::util::expand_path;
use provision_types::config::RepositoryConfig;
use provision_types::{
    BundleRepositoryType, FeatureRequest, ProcessType, ProvisionError, Result, SubsystemContentType,
};
use std::fmt;
use std::path::Path;
use tracing::{debug, info, trace};
use walkdir::WalkDir;

/// Read access to a set of feature definitions.
///
/// Lookups are case-insensitive.
pub trait FeatureRepository {
    /// Definition with this symbolic name.
    fn get(&self, symbolic_name: &str) -> Option<&FeatureDefinition>;

    /// All visible definitions, in load order.
    fn features(&self) -> Box<dyn Iterator<Item = &FeatureDefinition> + '_>;

    /// Resolve a request name.
    ///
    /// Symbolic names match in any repository. Short names match core
    /// features, or extension features when the request carries their
    /// repository prefix. A symbolic match wins over a short-name match.
    fn lookup(&self, request: &FeatureRequest) -> Option<&FeatureDefinition> {
        let prefix = request.repository.as_deref();
        let mut by_short_name = None;
        for def in self.features() {
            if !in_repository(def.bundle_repository_type(), prefix) {
                continue;
            }
            if def.symbolic_name().eq_ignore_ascii_case(&request.name) {
                return Some(def);
            }
            let short_match = def
                .short_name()
                .map_or(false, |s| s.eq_ignore_ascii_case(&request.name));
            let reachable = prefix.is_some() || *def.bundle_repository_type() == BundleRepositoryType::Core;
            if by_short_name.is_none() && short_match && reachable {
                by_short_name = Some(def);
            }
        }
        by_short_name
    }

    /// Process type that hides a feature which otherwise matches
    /// `request`, if any.
    fn hidden_for(&self, _request: &FeatureRequest) -> Option<ProcessType> {
        None
    }
}

fn in_repository(repository: &BundleRepositoryType, prefix: Option<&str>) -> bool {
    match (prefix, repository.prefix()) {
        (None, _) => true,
        (Some(p), None) => p.eq_ignore_ascii_case("core"),
        (Some(p), Some(r)) => p.eq_ignore_ascii_case(r),
    }
}

/// A consistency problem found by [`Catalog::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogIssue {
    /// A constituent's type token is not recognised.
    UnknownContentType {
        /// Declaring feature
        feature: String,
        /// Constituent symbolic name
        entry: String,
        /// Token as written
        raw_type: Option<String>,
    },
    /// An auto-feature's capability header did not parse.
    InvalidCapability {
        /// Declaring feature
        feature: String,
        /// Parse failure
        reason: String,
    },
    /// A compatibility feature must name exactly one platform.
    CompatibilityPlatforms {
        /// Declaring feature
        feature: String,
        /// Number of platforms declared
        count: usize,
    },
    /// A mandatory nested feature has no definition.
    MissingFeature {
        /// Declaring feature
        feature: String,
        /// Referenced name
        reference: String,
    },
    /// Manifest format level is newer than supported.
    UnsupportedFeatureVersion {
        /// Feature
        feature: String,
        /// Declared level
        level: u32,
    },
}

impl fmt::Display for CatalogIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogIssue::UnknownContentType { feature, entry, raw_type } => write!(
                f,
                "{}: constituent '{}' has unknown type '{}'",
                feature,
                entry,
                raw_type.as_deref().unwrap_or("?")
            ),
            CatalogIssue::InvalidCapability { feature, reason } => {
                write!(f, "{}: invalid provision capability: {}", feature, reason)
            }
            CatalogIssue::CompatibilityPlatforms { feature, count } => write!(
                f,
                "{}: compatibility feature declares {} platforms, expected exactly one",
                feature, count
            ),
            CatalogIssue::MissingFeature { feature, reference } => {
                write!(f, "{}: includes unknown feature '{}'", feature, reference)
            }
            CatalogIssue::UnsupportedFeatureVersion { feature, level } => {
                write!(f, "{}: unsupported IBM-Feature-Version {}", feature, level)
            }
        }
    }
}

/// Immutable snapshot of every loaded feature definition.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    features: IndexMap<String, FeatureDefinition>,
}

impl Catalog {
    /// Build from definitions.
    ///
    /// # Errors
    ///
    /// Returns `ProvisionError::Catalog` when two definitions share a
    /// symbolic name (case-insensitively).
    pub fn new(definitions: impl IntoIterator<Item = FeatureDefinition>) -> Result<Self> {
        let mut features: IndexMap<String, FeatureDefinition> = IndexMap::new();
        for def in definitions {
            let key = def.symbolic_name().to_ascii_lowercase();
            if let Some(existing) = features.get(&key) {
                return Err(ProvisionError::Catalog(format!(
                    "Duplicate feature '{}' ({} and {})",
                    def.symbolic_name(),
                    describe_source(existing.source()),
                    describe_source(def.source()),
                )));
            }
            features.insert(key, def);
        }
        Ok(Self { features })
    }

    /// Load every configured repository.
    pub fn load(repositories: &[RepositoryConfig]) -> Result<Self> {
        let mut definitions = Vec::new();
        for repository in repositories {
            definitions.extend(Self::load_directory(&repository.path, &repository.repository)?);
        }
        let catalog = Self::new(definitions)?;
        info!(
            "Loaded {} feature definitions from {} repositories",
            catalog.len(),
            repositories.len()
        );
        Ok(catalog)
    }

    /// Load `.mf`, `.yml`, and `.yaml` files below `path`, in file name
    /// order.
    pub fn load_directory(
        path: impl AsRef<Path>,
        repository: &BundleRepositoryType,
    ) -> Result<Vec<FeatureDefinition>> {
        let root = expand_path(path);
        if !root.is_dir() {
            return Err(ProvisionError::Catalog(format!(
                "Repository directory does not exist: {}",
                root.display()
            )));
        }

        let mut definitions = Vec::new();
        for entry in WalkDir::new(&root).sort_by_file_name() {
            let entry = entry.map_err(|e| ProvisionError::Catalog(format!("Failed to walk {}: {}", root.display(), e)))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let file = entry.path();
            let extension = file
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_ascii_lowercase);
            match extension.as_deref() {
                Some("mf") => definitions.push(load_manifest_file(file, repository.clone())?),
                Some("yml") | Some("yaml") => definitions.extend(load_metadata_file(file, repository.clone())?),
                _ => trace!("Skipping {}", file.display()),
            }
        }

        debug!("Loaded {} definitions from {} ({})", definitions.len(), root.display(), repository);
        Ok(definitions)
    }

    /// Number of definitions.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// A view hiding features that do not support `process_type`.
    pub fn restricted_to(&self, process_type: ProcessType) -> ProcessRestricted<'_, Self> {
        ProcessRestricted::new(self, process_type)
    }

    /// Check the catalog for problems that would surface during
    /// resolution.
    pub fn validate(&self) -> Vec<CatalogIssue> {
        let mut issues = Vec::new();
        for def in self.features.values() {
            let feature = def.symbolic_name().to_string();

            if !def.is_supported_feature_version() {
                issues.push(CatalogIssue::UnsupportedFeatureVersion {
                    feature: feature.clone(),
                    level: def.ibm_feature_version(),
                });
            }

            if let Some(crate::capability::ProvisionCapability::Invalid { reason, .. }) = def.capability() {
                issues.push(CatalogIssue::InvalidCapability {
                    feature: feature.clone(),
                    reason: reason.clone(),
                });
            }

            if def.is_compatibility() && def.platforms().len() != 1 {
                issues.push(CatalogIssue::CompatibilityPlatforms {
                    feature: feature.clone(),
                    count: def.platforms().len(),
                });
            }

            for resource in def.constituents(Some(SubsystemContentType::Unknown)) {
                issues.push(CatalogIssue::UnknownContentType {
                    feature: feature.clone(),
                    entry: resource.symbolic_name().to_string(),
                    raw_type: resource.raw_type().map(str::to_string),
                });
            }

            for resource in def.constituents(Some(SubsystemContentType::FeatureType)) {
                let known = resource
                    .acceptable_names()
                    .iter()
                    .any(|name| self.get(name).is_some());
                if !known && !resource.is_optional() {
                    issues.push(CatalogIssue::MissingFeature {
                        feature: feature.clone(),
                        reference: resource.symbolic_name().to_string(),
                    });
                }
            }
        }
        issues
    }
}

fn describe_source(source: Option<&Path>) -> String {
    source.map_or_else(|| "<memory>".to_string(), |p| p.display().to_string())
}

impl FeatureRepository for Catalog {
    fn get(&self, symbolic_name: &str) -> Option<&FeatureDefinition> {
        self.features.get(&symbolic_name.to_ascii_lowercase())
    }

    fn features(&self) -> Box<dyn Iterator<Item = &FeatureDefinition> + '_> {
        Box::new(self.features.values())
    }
}

/// A repository view exposing only features that support one process
/// type.
#[derive(Debug, Clone, Copy)]
pub struct ProcessRestricted<'a, R: FeatureRepository + ?Sized> {
    inner: &'a R,
    process_type: ProcessType,
}

impl<'a, R: FeatureRepository + ?Sized> ProcessRestricted<'a, R> {
    /// Wrap `inner`.
    pub fn new(inner: &'a R, process_type: ProcessType) -> Self {
        Self { inner, process_type }
    }

    /// The process type features must support.
    pub fn process_type(&self) -> ProcessType {
        self.process_type
    }
}

impl<'a, R: FeatureRepository + ?Sized> FeatureRepository for ProcessRestricted<'a, R> {
    fn get(&self, symbolic_name: &str) -> Option<&FeatureDefinition> {
        self.inner
            .get(symbolic_name)
            .filter(|d| d.supports_process_type(self.process_type))
    }

    fn features(&self) -> Box<dyn Iterator<Item = &FeatureDefinition> + '_> {
        let process_type = self.process_type;
        Box::new(
            self.inner
                .features()
                .filter(move |d| d.supports_process_type(process_type)),
        )
    }

    fn hidden_for(&self, request: &FeatureRequest) -> Option<ProcessType> {
        match self.inner.lookup(request) {
            Some(def) if !def.supports_process_type(self.process_type) => Some(self.process_type),
            _ => self.inner.hidden_for(request),
        }
    }
}
