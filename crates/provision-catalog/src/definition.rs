//! Feature definitions: the resolver's view of one feature manifest.

use crate::capability::ProvisionCapability;
use crate::resource::FeatureResource;
use indexmap::IndexMap;
use provision_types::{
    parse_name_and_version, ActivationType, BundleRepositoryType, CapabilityProvider, ProcessType,
    SubsystemContentType, Version, Visibility,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Highest `IBM-Feature-Version` this resolver understands.
pub const MAX_SUPPORTED_FEATURE_VERSION: u32 = 2;

/// Capability `type` value every feature provides.
pub const FEATURE_CAPABILITY_TYPE: &str = "osgi.subsystem.feature";

/// How a feature relates to platform selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    /// Ordinary versioned feature
    #[default]
    Standard,
    /// Version-free name resolved to a platform variant
    Versionless,
    /// Bundle of features for one platform, e.g. `jakartaee-10.0`
    Convenience,
    /// Marker selecting exactly one platform, e.g. `eeCompatible-10.0`
    Compatibility,
}

/// An immutable feature definition.
///
/// Built with [`FeatureDefinition::builder`] by the manifest and YAML
/// loaders. All queries are pure.
#[derive(Debug, Clone)]
pub struct FeatureDefinition {
    symbolic_name: String,
    short_name: Option<String>,
    version: Version,
    feature_version: u32,
    visibility: Visibility,
    singleton: bool,
    superseded: bool,
    superseded_by: Vec<String>,
    kind: FeatureKind,
    platforms: Vec<String>,
    activation_type: ActivationType,
    process_types: Vec<ProcessType>,
    capability: Option<ProvisionCapability>,
    constituents: Vec<FeatureResource>,
    repository: BundleRepositoryType,
    source: Option<PathBuf>,
    headers: IndexMap<String, String>,
}

impl FeatureDefinition {
    /// Start building a definition.
    pub fn builder(symbolic_name: impl Into<String>) -> FeatureDefinitionBuilder {
        FeatureDefinitionBuilder::new(symbolic_name)
    }

    /// Symbolic name.
    pub fn symbolic_name(&self) -> &str {
        &self.symbolic_name
    }

    /// Short name (`IBM-ShortName`), if any.
    pub fn short_name(&self) -> Option<&str> {
        self.short_name.as_deref()
    }

    /// User-facing name: the short name (or symbolic name) qualified by
    /// the repository prefix for extension features.
    pub fn feature_name(&self) -> String {
        let name = self.short_name().unwrap_or(&self.symbolic_name);
        match self.repository.prefix() {
            Some(prefix) => format!("{}:{}", prefix, name),
            None => name.to_string(),
        }
    }

    /// Feature version.
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// `IBM-Feature-Version` manifest format level.
    pub fn ibm_feature_version(&self) -> u32 {
        self.feature_version
    }

    /// Whether this definition can take part in resolution at all.
    pub fn is_supported_feature_version(&self) -> bool {
        self.supports_feature_version(MAX_SUPPORTED_FEATURE_VERSION)
    }

    /// Like [`Self::is_supported_feature_version`] with a configured limit.
    pub fn supports_feature_version(&self, max: u32) -> bool {
        self.feature_version <= max
    }

    /// Singleton family: the symbolic name without its version suffix.
    pub fn family(&self) -> &str {
        parse_name_and_version(&self.symbolic_name).0
    }

    /// Visibility.
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Whether at most one member of the family may be active.
    pub fn is_singleton(&self) -> bool {
        self.singleton
    }

    /// Whether this is an auto-feature.
    pub fn is_auto_feature(&self) -> bool {
        self.capability.is_some()
    }

    /// Trigger condition of an auto-feature.
    pub fn capability(&self) -> Option<&ProvisionCapability> {
        self.capability.as_ref()
    }

    /// Whether a newer feature replaces this one.
    pub fn is_superseded(&self) -> bool {
        self.superseded
    }

    /// Replacement features, when superseded.
    pub fn superseded_by(&self) -> &[String] {
        &self.superseded_by
    }

    /// Platform-selection kind.
    pub fn kind(&self) -> FeatureKind {
        self.kind
    }

    /// Whether this is a versionless feature.
    pub fn is_versionless(&self) -> bool {
        self.kind == FeatureKind::Versionless
    }

    /// Whether this is a convenience feature.
    pub fn is_convenience(&self) -> bool {
        self.kind == FeatureKind::Convenience
    }

    /// Whether this is a compatibility feature.
    pub fn is_compatibility(&self) -> bool {
        self.kind == FeatureKind::Compatibility
    }

    /// Platforms this feature belongs to, in declaration order.
    pub fn platforms(&self) -> &[String] {
        &self.platforms
    }

    /// Canonical platform: the first declared.
    pub fn platform_value(&self) -> Option<&str> {
        self.platforms.first().map(String::as_str)
    }

    /// Whether any declared platform is in `active` (case-insensitive).
    pub fn matches_any_platform(&self, active: &[String]) -> bool {
        self.platforms
            .iter()
            .any(|p| active.iter().any(|a| a.eq_ignore_ascii_case(p)))
    }

    /// Bundle activation policy.
    pub fn activation_type(&self) -> ActivationType {
        self.activation_type
    }

    /// Process types this feature may be provisioned into.
    pub fn process_types(&self) -> &[ProcessType] {
        &self.process_types
    }

    /// Whether this feature supports `process_type`.
    pub fn supports_process_type(&self, process_type: ProcessType) -> bool {
        self.process_types.contains(&process_type)
    }

    /// Constituents, all of them when `content_type` is `None`.
    pub fn constituents(
        &self,
        content_type: Option<SubsystemContentType>,
    ) -> impl Iterator<Item = &FeatureResource> + '_ {
        self.constituents
            .iter()
            .filter(move |r| content_type.map_or(true, |t| r.is_type(t)))
    }

    /// Whether the auto-feature trigger is met by `supplying`.
    ///
    /// This definition itself is never counted as a supplier. Always
    /// false for features that are not auto-features.
    pub fn is_capability_satisfied(&self, supplying: &[&FeatureDefinition]) -> bool {
        self.satisfying_features(supplying).is_some()
    }

    /// The suppliers that triggered this auto-feature, or `None` when the
    /// trigger is not met.
    pub fn satisfying_features<'a>(
        &self,
        supplying: &[&'a FeatureDefinition],
    ) -> Option<Vec<&'a FeatureDefinition>> {
        let capability = self.capability.as_ref()?;
        let others: Vec<&FeatureDefinition> = supplying
            .iter()
            .copied()
            .filter(|d| !d.symbolic_name.eq_ignore_ascii_case(&self.symbolic_name))
            .collect();
        capability
            .satisfying(&others)
            .map(|indices| indices.into_iter().map(|i| others[i]).collect())
    }

    /// Repository this definition was loaded from.
    pub fn bundle_repository_type(&self) -> &BundleRepositoryType {
        &self.repository
    }

    /// File this definition was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub(crate) fn with_source(mut self, path: &Path) -> Self {
        self.source = Some(path.to_path_buf());
        self
    }

    /// Raw manifest header value, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl CapabilityProvider for FeatureDefinition {
    fn attribute_values(&self, attribute: &str) -> Vec<&str> {
        match attribute.to_ascii_lowercase().as_str() {
            "type" => vec![FEATURE_CAPABILITY_TYPE],
            "osgi.identity" => vec![self.symbolic_name.as_str()],
            "shortname" => self.short_name.as_deref().into_iter().collect(),
            "platform" => self.platforms.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

/// Builder for [`FeatureDefinition`].
#[derive(Debug, Clone)]
pub struct FeatureDefinitionBuilder {
    inner: FeatureDefinition,
}

impl FeatureDefinitionBuilder {
    fn new(symbolic_name: impl Into<String>) -> Self {
        Self {
            inner: FeatureDefinition {
                symbolic_name: symbolic_name.into(),
                short_name: None,
                version: Version::new(1, 0, 0),
                feature_version: 0,
                visibility: Visibility::default(),
                singleton: false,
                superseded: false,
                superseded_by: Vec::new(),
                kind: FeatureKind::default(),
                platforms: Vec::new(),
                activation_type: ActivationType::default(),
                process_types: vec![ProcessType::Server],
                capability: None,
                constituents: Vec::new(),
                repository: BundleRepositoryType::Core,
                source: None,
                headers: IndexMap::new(),
            },
        }
    }

    /// Set the short name.
    pub fn short_name(mut self, name: impl Into<String>) -> Self {
        self.inner.short_name = Some(name.into());
        self
    }

    /// Set the feature version.
    pub fn version(mut self, version: Version) -> Self {
        self.inner.version = version;
        self
    }

    /// Set the `IBM-Feature-Version` level.
    pub fn feature_version(mut self, level: u32) -> Self {
        self.inner.feature_version = level;
        self
    }

    /// Set the visibility.
    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.inner.visibility = visibility;
        self
    }

    /// Mark as singleton.
    pub fn singleton(mut self, singleton: bool) -> Self {
        self.inner.singleton = singleton;
        self
    }

    /// Mark as superseded by the given features.
    pub fn superseded<I, S>(mut self, superseded: bool, by: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.superseded = superseded;
        self.inner.superseded_by = by.into_iter().map(Into::into).collect();
        self
    }

    /// Set the platform-selection kind.
    pub fn kind(mut self, kind: FeatureKind) -> Self {
        self.inner.kind = kind;
        self
    }

    /// Set the platforms.
    pub fn platforms<I, S>(mut self, platforms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.platforms = platforms.into_iter().map(Into::into).collect();
        self
    }

    /// Set the activation policy.
    pub fn activation_type(mut self, activation_type: ActivationType) -> Self {
        self.inner.activation_type = activation_type;
        self
    }

    /// Set the supported process types; empty means server only.
    pub fn process_types(mut self, types: Vec<ProcessType>) -> Self {
        self.inner.process_types = if types.is_empty() { vec![ProcessType::Server] } else { types };
        self
    }

    /// Set the auto-feature trigger.
    pub fn capability(mut self, capability: ProvisionCapability) -> Self {
        self.inner.capability = Some(capability);
        self
    }

    /// Append one constituent.
    pub fn constituent(mut self, resource: FeatureResource) -> Self {
        self.inner.constituents.push(resource);
        self
    }

    /// Append constituents.
    pub fn constituents(mut self, resources: impl IntoIterator<Item = FeatureResource>) -> Self {
        self.inner.constituents.extend(resources);
        self
    }

    /// Set the originating repository.
    pub fn repository(mut self, repository: BundleRepositoryType) -> Self {
        self.inner.repository = repository;
        self
    }

    /// Set the source file.
    pub fn source(mut self, path: impl Into<PathBuf>) -> Self {
        self.inner.source = Some(path.into());
        self
    }

    /// Keep the raw manifest headers.
    pub fn headers(mut self, headers: IndexMap<String, String>) -> Self {
        self.inner.headers = headers;
        self
    }

    /// Finish building.
    pub fn build(self) -> FeatureDefinition {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trigger(filter: &str) -> ProvisionCapability {
        ProvisionCapability::parse(&format!(r#"osgi.identity; filter:="{}""#, filter))
    }

    #[test]
    fn test_builder_defaults() {
        let def = FeatureDefinition::builder("com.acme.servlet-4.0").build();
        assert_eq!(def.family(), "com.acme.servlet");
        assert_eq!(def.visibility(), Visibility::Private);
        assert_eq!(def.activation_type(), ActivationType::Sequential);
        assert_eq!(def.process_types(), &[ProcessType::Server]);
        assert!(!def.is_auto_feature());
        assert!(def.is_supported_feature_version());
        assert_eq!(def.feature_name(), "com.acme.servlet-4.0");
    }

    #[test]
    fn test_feature_name_uses_prefix_and_short_name() {
        let def = FeatureDefinition::builder("com.acme.ext-1.0")
            .short_name("ext-1.0")
            .repository(BundleRepositoryType::User)
            .build();
        assert_eq!(def.feature_name(), "usr:ext-1.0");
    }

    #[test]
    fn test_constituent_filter() {
        let def = FeatureDefinition::builder("f")
            .constituent(FeatureResource::bundle("b1"))
            .constituent(FeatureResource::feature("g"))
            .constituent(FeatureResource::bundle("b2"))
            .build();
        assert_eq!(def.constituents(None).count(), 3);
        let bundles: Vec<_> = def
            .constituents(Some(SubsystemContentType::BundleType))
            .map(FeatureResource::symbolic_name)
            .collect();
        assert_eq!(bundles, vec!["b1", "b2"]);
        assert_eq!(def.constituents(Some(SubsystemContentType::FileType)).count(), 0);
    }

    #[test]
    fn test_supported_feature_version() {
        let def = FeatureDefinition::builder("f").feature_version(3).build();
        assert!(!def.is_supported_feature_version());
        assert!(def.supports_feature_version(3));
    }

    #[test]
    fn test_capability_excludes_self() {
        let auto = FeatureDefinition::builder("com.acme.auto")
            .capability(trigger("(osgi.identity=com.acme.*)"))
            .build();
        assert!(auto.is_auto_feature());
        assert!(!auto.is_capability_satisfied(&[&auto]));

        let other = FeatureDefinition::builder("com.acme.x").build();
        assert!(auto.is_capability_satisfied(&[&auto, &other]));
        let suppliers = auto.satisfying_features(&[&auto, &other]).unwrap();
        assert_eq!(suppliers.len(), 1);
        assert_eq!(suppliers[0].symbolic_name(), "com.acme.x");
    }

    #[test]
    fn test_capability_matches_short_name_and_platform() {
        let auto = FeatureDefinition::builder("auto")
            .capability(trigger("(&(shortName=servlet-*)(platform=jakartaee-10.0))"))
            .build();
        let servlet = FeatureDefinition::builder("com.acme.servlet-6.0")
            .short_name("servlet-6.0")
            .platforms(["JakartaEE-10.0"])
            .build();
        let other_platform = FeatureDefinition::builder("com.acme.servlet-4.0")
            .short_name("servlet-4.0")
            .platforms(["javaee-8.0"])
            .build();
        assert!(auto.is_capability_satisfied(&[&servlet]));
        assert!(!auto.is_capability_satisfied(&[&other_platform]));
    }

    #[test]
    fn test_capability_is_pure() {
        let auto = FeatureDefinition::builder("auto")
            .capability(trigger("(osgi.identity=x)"))
            .build();
        let x = FeatureDefinition::builder("x").build();
        let first = auto.is_capability_satisfied(&[&x]);
        let second = auto.is_capability_satisfied(&[&x]);
        assert_eq!(first, second);
        assert!(first);
    }

    #[test]
    fn test_platforms() {
        let def = FeatureDefinition::builder("io.acme.eeCompatible-10.0")
            .kind(FeatureKind::Compatibility)
            .platforms(["jakartaee-10.0", "javaee-10"])
            .build();
        assert!(def.is_compatibility());
        assert_eq!(def.platform_value(), Some("jakartaee-10.0"));
        assert!(def.matches_any_platform(&["JAKARTAEE-10.0".to_string()]));
        assert!(!def.matches_any_platform(&[]));
    }
}
