//! Feature resolution.
//!
//! A resolve is a pure function of the repository, the platform facts,
//! and the requests. It runs in these stages:
//!
//! 1. unsupported catalog entries are dropped from candidacy
//! 2. requests are resolved to definitions, versionless names to a
//!    platform variant
//! 3. nested features are expanded breadth-first, honouring tolerates
//!    and any family preference from an earlier attempt
//! 4. auto-features are added until a fixpoint is reached
//! 5. cycles are rejected
//! 6. singleton families with several members are retried with a
//!    preference, or rejected
//! 7. features are ordered dependencies-first and bundles grouped by
//!    start level

use crate::plan::{
    ActivationPlan, ActivationReason, ArtifactInstall, BundleActivation, FeatureActivation,
    ResolutionWarning, ResolvedRequest, StartLevelGroup,
};
use indexmap::IndexMap;
use provision_catalog::{FeatureDefinition, FeatureRepository, FeatureResource};
use provision_core::ProvisionConfig;
use provision_types::{
    bug, parse_name_and_version, FeatureRequest, PlatformDetector, ProvisionError, Result,
    SubsystemContentType, Visibility,
};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use tracing::{debug, info, warn};

/// Resolver switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverOptions {
    /// Skip the singleton check
    pub allow_multiple_versions: bool,
    /// Highest supported `IBM-Feature-Version`
    pub max_feature_version: u32,
    /// Start level for bundles that declare none
    pub default_start_level: u32,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            allow_multiple_versions: false,
            max_feature_version: provision_catalog::definition::MAX_SUPPORTED_FEATURE_VERSION,
            default_start_level: 20,
        }
    }
}

impl ResolverOptions {
    /// Options from configuration.
    pub fn from_config(config: &ProvisionConfig) -> Self {
        Self {
            allow_multiple_versions: config.resolver.allow_multiple_versions,
            max_feature_version: config.resolver.max_feature_version,
            default_start_level: config.activation.default_start_level,
        }
    }
}

fn key(name: &str) -> String {
    name.to_ascii_lowercase()
}

struct Root<'a> {
    def: &'a FeatureDefinition,
    request: String,
}

enum Origin {
    Requested(String),
    Included(String),
    Auto(Vec<String>),
}

struct Selected<'a> {
    def: &'a FeatureDefinition,
    origin: Origin,
}

/// Acceptable members of one family, as demanded by one edge.
struct Requirement {
    acceptable: Vec<String>,
}

#[derive(Default)]
struct Selection<'a> {
    features: IndexMap<String, Selected<'a>>,
    depends_on: HashMap<String, Vec<String>>,
    requirements: HashMap<String, Vec<Requirement>>,
    warnings: Vec<ResolutionWarning>,
}

impl<'a> Selection<'a> {
    /// Returns true when `def` was not yet selected.
    fn insert(&mut self, def: &'a FeatureDefinition, origin: Origin) -> bool {
        let k = key(def.symbolic_name());
        if self.features.contains_key(&k) {
            return false;
        }
        self.features.insert(k, Selected { def, origin });
        true
    }

    fn contains(&self, def: &FeatureDefinition) -> bool {
        self.features.contains_key(&key(def.symbolic_name()))
    }

    fn add_edge(&mut self, dependent: &str, dependency: &str) {
        let deps = self.depends_on.entry(key(dependent)).or_default();
        let dependency = key(dependency);
        if !deps.contains(&dependency) {
            deps.push(dependency);
        }
    }

    fn require(&mut self, family: &str, acceptable: &[String]) {
        self.requirements.entry(key(family)).or_default().push(Requirement {
            acceptable: acceptable.iter().map(|a| key(a)).collect(),
        });
    }

    fn definitions(&self) -> Vec<&'a FeatureDefinition> {
        self.features.values().map(|s| s.def).collect()
    }

    fn name(&self, k: &str) -> String {
        self.features
            .get(k)
            .map_or_else(|| k.to_string(), |s| s.def.symbolic_name().to_string())
    }
}

/// Resolves feature requests into an [`ActivationPlan`].
///
/// ```
/// use provision_catalog::{Catalog, FeatureDefinition, FeatureResource};
/// use provision_core::ConfiguredPlatform;
/// use provision_resolver::Resolver;
///
/// let catalog = Catalog::new(vec![
///     FeatureDefinition::builder("f1")
///         .constituent(FeatureResource::bundle("b2").with_start_level(20))
///         .constituent(FeatureResource::bundle("b1").with_start_level(10))
///         .build(),
/// ])?;
/// let platform = ConfiguredPlatform::default();
///
/// let plan = Resolver::new(&catalog, &platform).resolve_names(&["f1"])?;
/// let bundles: Vec<_> = plan.features[0].bundles().map(|b| b.symbolic_name.as_str()).collect();
/// assert_eq!(bundles, vec!["b1", "b2"]);
/// # Ok::<(), provision_types::ProvisionError>(())
/// ```
pub struct Resolver<'a, R: FeatureRepository + ?Sized> {
    repository: &'a R,
    platform: &'a dyn PlatformDetector,
    options: ResolverOptions,
}

impl<'a, R: FeatureRepository + ?Sized> Resolver<'a, R> {
    /// Create a resolver with default options.
    pub fn new(repository: &'a R, platform: &'a dyn PlatformDetector) -> Self {
        Self {
            repository,
            platform,
            options: ResolverOptions::default(),
        }
    }

    /// Replace the options.
    pub fn with_options(mut self, options: ResolverOptions) -> Self {
        self.options = options;
        self
    }

    /// Parse request strings and resolve them.
    pub fn resolve_names<S: AsRef<str>>(&self, names: &[S]) -> Result<ActivationPlan> {
        let requests = names
            .iter()
            .map(|n| FeatureRequest::parse(n.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        self.resolve(&requests)
    }

    /// Resolve requests into an activation plan.
    ///
    /// # Errors
    ///
    /// Returns `UnresolvedReference`, `CyclicDependency`, or
    /// `SingletonConflict`; no partial plan is ever returned.
    pub fn resolve(&self, requests: &[FeatureRequest]) -> Result<ActivationPlan> {
        let mut warnings = self.unsupported_warnings();
        let roots = self.resolve_roots(requests, &mut warnings)?;

        let mut preferences: HashMap<String, String> = HashMap::new();
        let max_attempts = self.repository.features().count() + 1;
        let mut attempt = 0;

        let (selection, order) = loop {
            attempt += 1;
            let selection = self.select(&roots, &preferences)?;
            let order = activation_order(&selection)?;
            if self.options.allow_multiple_versions {
                break (selection, order);
            }

            let Some((family, members)) = singleton_conflict(&selection) else {
                break (selection, order);
            };
            match self.common_member(&selection, &family) {
                Some(preferred) if attempt < max_attempts && preferences.get(&family) != Some(&preferred) => {
                    debug!(
                        "Singleton family '{}' has {} members; retrying with '{}'",
                        family,
                        members.len(),
                        preferred
                    );
                    preferences.insert(family, preferred);
                }
                _ => {
                    return Err(ProvisionError::SingletonConflict {
                        family: members
                            .first()
                            .map_or(family, |d| d.family().to_string()),
                        candidates: members.iter().map(|d| d.symbolic_name().to_string()).collect(),
                    });
                }
            }
        };

        warnings.extend(selection.warnings.iter().cloned());
        let plan = self.build_plan(&roots, &selection, &order, warnings)?;
        info!(
            "Resolved {} features ({} bundles) for {} requests",
            plan.features.len(),
            plan.bundle_count(),
            requests.len()
        );
        Ok(plan)
    }

    fn usable(&self, def: &FeatureDefinition) -> bool {
        def.supports_feature_version(self.options.max_feature_version)
    }

    fn candidate(&self, name: &str) -> Option<&'a FeatureDefinition> {
        let repository: &'a R = self.repository;
        repository.get(name).filter(|d| self.usable(d))
    }

    /// Whether a replacement of the superseded `auto` is already selected,
    /// or is an auto-feature the current selection satisfies.
    fn replacement_active(&self, auto: &FeatureDefinition, selection: &Selection<'a>) -> bool {
        let active = selection.definitions();
        auto.superseded_by()
            .iter()
            .filter_map(|name| self.candidate(name))
            .any(|r| selection.contains(r) || (r.is_auto_feature() && r.satisfying_features(&active).is_some()))
    }

    fn unsupported_warnings(&self) -> Vec<ResolutionWarning> {
        self.repository
            .features()
            .filter(|d| !self.usable(d))
            .map(|d| {
                warn!(
                    "Ignoring {}: IBM-Feature-Version {} is newer than {}",
                    d.symbolic_name(),
                    d.ibm_feature_version(),
                    self.options.max_feature_version
                );
                ResolutionWarning::UnsupportedVersion {
                    feature: d.symbolic_name().to_string(),
                    feature_version: d.ibm_feature_version(),
                }
            })
            .collect()
    }

    fn resolve_roots(
        &self,
        requests: &[FeatureRequest],
        warnings: &mut Vec<ResolutionWarning>,
    ) -> Result<Vec<Root<'a>>> {
        let mut found = Vec::with_capacity(requests.len());
        for request in requests {
            if let Some(def) = self.lookup_request(request, warnings)? {
                found.push((request, def));
            }
        }

        let mut platforms: Vec<String> = Vec::new();
        let mut add_platform = |p: &str| {
            if !platforms.iter().any(|existing| existing.eq_ignore_ascii_case(p)) {
                platforms.push(p.to_string());
            }
        };
        requests.iter().filter_map(|r| r.platform.as_deref()).for_each(&mut add_platform);
        self.platform.platforms().iter().for_each(|p| add_platform(p.as_str()));
        found
            .iter()
            .filter(|(_, d)| d.is_convenience() || d.is_compatibility())
            .filter_map(|(_, d)| d.platform_value())
            .for_each(&mut add_platform);

        let mut roots: Vec<Root<'a>> = Vec::with_capacity(found.len());
        for (request, requested) in found {
            if requested.visibility() != Visibility::Public {
                warn!("{} is {} and should not be requested directly", requested.symbolic_name(), requested.visibility());
                warnings.push(ResolutionWarning::NonPublicRoot {
                    feature: requested.symbolic_name().to_string(),
                    visibility: requested.visibility().to_string(),
                });
            }

            let def = if requested.is_versionless() {
                self.select_variant(request, requested, &platforms)?
            } else {
                requested
            };

            if def.is_superseded() {
                warn!("{} is superseded", def.symbolic_name());
                warnings.push(ResolutionWarning::Superseded {
                    feature: def.symbolic_name().to_string(),
                    superseded_by: def.superseded_by().to_vec(),
                });
            }

            if !roots.iter().any(|r| std::ptr::eq(r.def, def)) {
                debug!("Request '{}' resolved to {}", request, def.symbolic_name());
                roots.push(Root {
                    def,
                    request: request.to_string(),
                });
            }
        }
        Ok(roots)
    }

    fn lookup_request(
        &self,
        request: &FeatureRequest,
        warnings: &mut Vec<ResolutionWarning>,
    ) -> Result<Option<&'a FeatureDefinition>> {
        let repository: &'a R = self.repository;
        let Some(def) = repository.lookup(request) else {
            if let Some(process_type) = repository.hidden_for(request) {
                warn!("{} is not available to {} processes; skipping", request, process_type);
                warnings.push(ResolutionWarning::RestrictedAccess {
                    feature: request.to_string(),
                    process_type,
                });
                return Ok(None);
            }
            return Err(ProvisionError::unresolved(
                &request.name,
                None,
                "no feature definition matches this name",
            ));
        };

        if !self.usable(def) {
            return Err(ProvisionError::unresolved(
                &request.name,
                None,
                format!("IBM-Feature-Version {} is not supported", def.ibm_feature_version()),
            ));
        }
        Ok(Some(def))
    }

    fn select_variant(
        &self,
        request: &FeatureRequest,
        versionless: &'a FeatureDefinition,
        platforms: &[String],
    ) -> Result<&'a FeatureDefinition> {
        let active: Vec<String> = match &request.platform {
            Some(p) => vec![p.clone()],
            None => platforms.to_vec(),
        };

        let mut candidates: Vec<&'a FeatureDefinition> = Vec::new();
        for resource in versionless.constituents(Some(SubsystemContentType::FeatureType)) {
            if let Some(variant) = self.candidate(resource.symbolic_name()) {
                if variant.matches_any_platform(&active) && !candidates.iter().any(|c| std::ptr::eq(*c, variant)) {
                    candidates.push(variant);
                }
            }
        }
        if candidates.iter().any(|c| !c.is_superseded()) {
            candidates.retain(|c| !c.is_superseded());
        }

        match candidates.as_slice() {
            [one] => Ok(*one),
            [] => Err(ProvisionError::unresolved(
                &request.name,
                None,
                format!(
                    "no variant of {} for platforms [{}]",
                    versionless.symbolic_name(),
                    active.join(", ")
                ),
            )),
            many => Err(ProvisionError::unresolved(
                &request.name,
                None,
                format!(
                    "ambiguous: {} all match platforms [{}]; qualify the request with @platform",
                    many.iter().map(|c| c.symbolic_name()).collect::<Vec<_>>().join(", "),
                    active.join(", ")
                ),
            )),
        }
    }

    fn select(&self, roots: &[Root<'a>], preferences: &HashMap<String, String>) -> Result<Selection<'a>> {
        let repository: &'a R = self.repository;
        let mut selection = Selection::default();
        let mut queue: VecDeque<&'a FeatureDefinition> = VecDeque::new();

        for root in roots {
            selection.require(root.def.family(), &[root.def.symbolic_name().to_string()]);
            if selection.insert(root.def, Origin::Requested(root.request.clone())) {
                queue.push_back(root.def);
            }
        }
        self.expand(&mut selection, &mut queue, preferences)?;

        loop {
            let mut added = false;
            for auto in repository.features() {
                if !auto.is_auto_feature() || !self.usable(auto) || selection.contains(auto) {
                    continue;
                }
                if auto.is_superseded() && self.replacement_active(auto, &selection) {
                    debug!("Skipping superseded auto-feature {}", auto.symbolic_name());
                    continue;
                }

                let active = selection.definitions();
                let Some(triggers) = auto.satisfying_features(&active) else {
                    continue;
                };
                let triggers: Vec<String> = triggers.iter().map(|d| d.symbolic_name().to_string()).collect();
                debug!("Auto-feature {} satisfied by {}", auto.symbolic_name(), triggers.join(", "));

                selection.require(auto.family(), &[auto.symbolic_name().to_string()]);
                selection.insert(auto, Origin::Auto(triggers.clone()));
                for trigger in &triggers {
                    selection.add_edge(auto.symbolic_name(), trigger);
                }
                queue.push_back(auto);
                self.expand(&mut selection, &mut queue, preferences)?;
                added = true;
            }
            if !added {
                break;
            }
        }

        Ok(selection)
    }

    fn expand(
        &self,
        selection: &mut Selection<'a>,
        queue: &mut VecDeque<&'a FeatureDefinition>,
        preferences: &HashMap<String, String>,
    ) -> Result<()> {
        while let Some(def) = queue.pop_front() {
            let from = def.symbolic_name();
            if def.is_compatibility() && def.platforms().len() != 1 {
                return Err(ProvisionError::unresolved(
                    from,
                    required_by(selection, def),
                    format!(
                        "compatibility feature declares {} platforms; exactly one is required",
                        def.platforms().len()
                    ),
                ));
            }

            for resource in def.constituents(None) {
                if !self.eligible(def, resource, &mut selection.warnings) {
                    continue;
                }
                match resource.content_type() {
                    SubsystemContentType::Unknown => {
                        if !resource.is_optional() && resource.tolerates().is_empty() {
                            return Err(ProvisionError::unresolved(
                                resource.symbolic_name(),
                                Some(from),
                                format!(
                                    "mandatory constituent has unknown content type '{}'",
                                    resource.raw_type().unwrap_or("?")
                                ),
                            ));
                        }
                        warn!("{}: not provisioning '{}' of unknown type", from, resource.symbolic_name());
                        selection.warnings.push(ResolutionWarning::UnknownContentType {
                            feature: from.to_string(),
                            entry: resource.symbolic_name().to_string(),
                            raw_type: resource.raw_type().map(str::to_string),
                        });
                    }
                    SubsystemContentType::FeatureType => {
                        let acceptable = resource.acceptable_names();
                        let (family, _) = parse_name_and_version(resource.symbolic_name());
                        selection.require(family, &acceptable);

                        match self.choose(&acceptable, family, preferences) {
                            Some(target) => {
                                selection.add_edge(from, target.symbolic_name());
                                if selection.insert(target, Origin::Included(from.to_string())) {
                                    queue.push_back(target);
                                }
                            }
                            None if resource.is_optional() => {
                                debug!("{}: optional feature '{}' not available", from, resource.symbolic_name());
                                selection.warnings.push(ResolutionWarning::OptionalMissing {
                                    feature: from.to_string(),
                                    entry: resource.symbolic_name().to_string(),
                                });
                            }
                            None => {
                                return Err(ProvisionError::unresolved(
                                    resource.symbolic_name(),
                                    Some(from),
                                    self.missing_reason(resource),
                                ));
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn choose(
        &self,
        acceptable: &[String],
        family: &str,
        preferences: &HashMap<String, String>,
    ) -> Option<&'a FeatureDefinition> {
        if let Some(preferred) = preferences.get(&key(family)) {
            if acceptable.iter().any(|a| a.eq_ignore_ascii_case(preferred)) {
                if let Some(def) = self.candidate(preferred) {
                    return Some(def);
                }
            }
        }
        acceptable.iter().find_map(|name| self.candidate(name))
    }

    fn missing_reason(&self, resource: &FeatureResource) -> String {
        let request = FeatureRequest {
            repository: None,
            name: resource.symbolic_name().to_string(),
            platform: None,
        };
        if let Some(process_type) = self.repository.hidden_for(&request) {
            return format!("not available to {} processes", process_type);
        }
        if self.repository.get(resource.symbolic_name()).is_some() {
            return "IBM-Feature-Version is not supported".to_string();
        }
        match resource.tolerates() {
            [] => "no feature definition found".to_string(),
            tolerated => format!("no feature definition found (tolerates {})", tolerated.join(", ")),
        }
    }

    fn eligible(
        &self,
        def: &FeatureDefinition,
        resource: &FeatureResource,
        warnings: &mut Vec<ResolutionWarning>,
    ) -> bool {
        if !resource.applies_to_os(self.platform.os()) {
            debug!(
                "{}: skipping '{}', not for {}",
                def.symbolic_name(),
                resource.symbolic_name(),
                self.platform.os()
            );
            return false;
        }
        let runtime = self.platform.java_version();
        match resource.require_java() {
            Some(required) if required > runtime => {
                warn!(
                    "{}: skipping '{}', requires Java {} but runtime is {}",
                    def.symbolic_name(),
                    resource.symbolic_name(),
                    required,
                    runtime
                );
                warnings.push(ResolutionWarning::RequiresNewerJava {
                    feature: def.symbolic_name().to_string(),
                    entry: resource.symbolic_name().to_string(),
                    required,
                    runtime,
                });
                false
            }
            _ => true,
        }
    }

    fn applies(&self, resource: &FeatureResource) -> bool {
        resource.applies_to_os(self.platform.os())
            && resource
                .require_java()
                .map_or(true, |required| required <= self.platform.java_version())
    }

    /// Member acceptable to every edge into `family`, if one exists.
    fn common_member(&self, selection: &Selection<'a>, family: &str) -> Option<String> {
        let requirements = selection.requirements.get(family)?;
        let (first, rest) = requirements.split_first()?;
        let mut common = first.acceptable.clone();
        for requirement in rest {
            common.retain(|c| requirement.acceptable.contains(c));
        }
        common.into_iter().find(|c| self.candidate(c).is_some())
    }

    fn build_plan(
        &self,
        roots: &[Root<'a>],
        selection: &Selection<'a>,
        order: &[String],
        warnings: Vec<ResolutionWarning>,
    ) -> Result<ActivationPlan> {
        let mut seen_bundles: HashSet<String> = HashSet::new();
        let mut seen_artifacts: HashSet<String> = HashSet::new();
        let mut features = Vec::with_capacity(order.len());

        for k in order {
            let Some(selected) = selection.features.get(k) else {
                bug!("Feature '{}' was ordered but never selected", k);
            };
            let def = selected.def;
            let mut levels: BTreeMap<u32, Vec<BundleActivation>> = BTreeMap::new();
            let mut artifacts = Vec::new();

            for resource in def.constituents(None) {
                if !self.applies(resource) {
                    continue;
                }
                let content_type = resource.content_type();
                if content_type == SubsystemContentType::BundleType {
                    if !seen_bundles.insert(resource.match_string()) {
                        debug!("{}: bundle '{}' already planned", def.symbolic_name(), resource.symbolic_name());
                        continue;
                    }
                    let start_level = resource.start_level().unwrap_or(self.options.default_start_level);
                    levels.entry(start_level).or_default().push(BundleActivation {
                        symbolic_name: resource.symbolic_name().to_string(),
                        location: resource.location().to_string(),
                        version_range: resource.version_range().clone(),
                        start_level,
                    });
                } else if content_type.is_artifact() && seen_artifacts.insert(resource.match_string()) {
                    artifacts.push(ArtifactInstall {
                        symbolic_name: resource.symbolic_name().to_string(),
                        content_type,
                        location: resource.location().to_string(),
                        version_range: resource.version_range().clone(),
                    });
                }
            }

            let reason = match &selected.origin {
                Origin::Requested(request) => ActivationReason::Requested { request: request.clone() },
                Origin::Included(by) => ActivationReason::Included { by: by.clone() },
                Origin::Auto(triggers) => ActivationReason::Auto { triggered_by: triggers.clone() },
            };

            features.push(FeatureActivation {
                symbolic_name: def.symbolic_name().to_string(),
                feature_name: def.feature_name(),
                version: def.version().clone(),
                repository: def.bundle_repository_type().clone(),
                activation_type: def.activation_type(),
                reason,
                artifacts,
                groups: levels
                    .into_iter()
                    .map(|(start_level, bundles)| StartLevelGroup { start_level, bundles })
                    .collect(),
            });
        }

        Ok(ActivationPlan {
            requests: roots
                .iter()
                .map(|r| ResolvedRequest {
                    request: r.request.clone(),
                    feature: r.def.symbolic_name().to_string(),
                })
                .collect(),
            features,
            warnings,
        })
    }
}

fn required_by<'s>(selection: &'s Selection<'_>, def: &FeatureDefinition) -> Option<&'s str> {
    match selection.features.get(&key(def.symbolic_name())).map(|s| &s.origin) {
        Some(Origin::Included(by)) => Some(by.as_str()),
        _ => None,
    }
}

/// Dependencies-first order over every selected feature, rejecting
/// cycles. Ties follow discovery order.
fn activation_order(selection: &Selection<'_>) -> Result<Vec<String>> {
    fn visit(
        k: &str,
        selection: &Selection<'_>,
        visited: &mut HashSet<String>,
        path: &mut Vec<String>,
        sorted: &mut Vec<String>,
    ) -> Result<()> {
        if visited.contains(k) {
            return Ok(());
        }
        if let Some(start) = path.iter().position(|p| p == k) {
            let mut cycle: Vec<String> = path[start..].iter().map(|p| selection.name(p)).collect();
            cycle.push(selection.name(k));
            return Err(ProvisionError::CyclicDependency { cycle });
        }

        path.push(k.to_string());
        if let Some(deps) = selection.depends_on.get(k) {
            for dep in deps {
                visit(dep, selection, visited, path, sorted)?;
            }
        }
        path.pop();
        visited.insert(k.to_string());
        sorted.push(k.to_string());
        Ok(())
    }

    let mut sorted = Vec::with_capacity(selection.features.len());
    let mut visited = HashSet::new();
    let mut path = Vec::new();
    for k in selection.features.keys() {
        visit(k, selection, &mut visited, &mut path, &mut sorted)?;
    }
    Ok(sorted)
}

/// First family, in discovery order, holding several members of which at
/// least one is a singleton.
fn singleton_conflict<'a>(selection: &Selection<'a>) -> Option<(String, Vec<&'a FeatureDefinition>)> {
    let mut families: IndexMap<String, Vec<&'a FeatureDefinition>> = IndexMap::new();
    for selected in selection.features.values() {
        families.entry(key(selected.def.family())).or_default().push(selected.def);
    }
    families
        .into_iter()
        .find(|(_, members)| members.len() > 1 && members.iter().any(|d| d.is_singleton()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use provision_catalog::{Catalog, FeatureKind, ProvisionCapability};
    use provision_core::ConfiguredPlatform;
    use provision_core::config::RuntimeSettings;
    use provision_types::ProcessType;
    use proptest::prelude::*;

    fn platform() -> ConfiguredPlatform {
        ConfiguredPlatform::from_runtime(&RuntimeSettings {
            os: "linux".to_string(),
            java_version: 17,
            platforms: Vec::new(),
            process_type: ProcessType::Server,
        })
    }

    fn public(name: &str) -> provision_catalog::FeatureDefinitionBuilder {
        FeatureDefinition::builder(name).visibility(Visibility::Public)
    }

    fn includes(name: &str) -> FeatureResource {
        FeatureResource::feature(name)
    }

    fn trigger(filter: &str) -> ProvisionCapability {
        ProvisionCapability::parse(&format!(r#"osgi.identity; filter:="{}""#, filter))
    }

    fn resolve(catalog: &Catalog, names: &[&str]) -> Result<ActivationPlan> {
        Resolver::new(catalog, &platform()).resolve_names(names)
    }

    #[test]
    fn test_single_feature_without_constituents() {
        let catalog = Catalog::new(vec![public("f1").build()]).unwrap();
        let plan = resolve(&catalog, &["f1"]).unwrap();
        assert_eq!(plan.resolved_features(), vec!["f1"]);
        assert_eq!(plan.steps().len(), 1);
        assert!(plan.warnings.is_empty());
    }

    #[test]
    fn test_bundles_follow_start_level() {
        let catalog = Catalog::new(vec![public("f1")
            .constituent(FeatureResource::bundle("b2").with_start_level(20))
            .constituent(FeatureResource::bundle("b1").with_start_level(10))
            .build()])
        .unwrap();
        let plan = resolve(&catalog, &["f1"]).unwrap();
        let feature = &plan.features[0];
        let levels: Vec<u32> = feature.groups.iter().map(|g| g.start_level).collect();
        assert_eq!(levels, vec![10, 20]);
        let bundles: Vec<_> = feature.bundles().map(|b| b.symbolic_name.as_str()).collect();
        assert_eq!(bundles, vec!["b1", "b2"]);
    }

    #[test]
    fn test_default_start_level_applies() {
        let catalog = Catalog::new(vec![public("f1")
            .constituent(FeatureResource::bundle("late").with_start_level(30))
            .constituent(FeatureResource::bundle("plain"))
            .build()])
        .unwrap();
        let plan = resolve(&catalog, &["f1"]).unwrap();
        let bundles: Vec<_> = plan.features[0].bundles().map(|b| (b.symbolic_name.as_str(), b.start_level)).collect();
        assert_eq!(bundles, vec![("plain", 20), ("late", 30)]);
    }

    #[test]
    fn test_singleton_family_conflict() {
        let catalog = Catalog::new(vec![
            public("com.acme.f-1.0").singleton(true).build(),
            public("com.acme.f-2.0").singleton(true).build(),
        ])
        .unwrap();
        match resolve(&catalog, &["com.acme.f-1.0", "com.acme.f-2.0"]) {
            Err(ProvisionError::SingletonConflict { family, candidates }) => {
                assert_eq!(family, "com.acme.f");
                assert_eq!(candidates, vec!["com.acme.f-1.0", "com.acme.f-2.0"]);
            }
            other => panic!("expected singleton conflict, got {:?}", other.map(|p| p.resolved_features().len())),
        }
    }

    #[test]
    fn test_allow_multiple_versions_skips_singleton_check() {
        let catalog = Catalog::new(vec![
            public("f-1.0").singleton(true).build(),
            public("f-2.0").singleton(true).build(),
        ])
        .unwrap();
        let options = ResolverOptions {
            allow_multiple_versions: true,
            ..Default::default()
        };
        let platform = platform();
        let plan = Resolver::new(&catalog, &platform)
            .with_options(options)
            .resolve_names(&["f-1.0", "f-2.0"])
            .unwrap();
        assert_eq!(plan.resolved_features(), vec!["f-1.0", "f-2.0"]);
    }

    #[test]
    fn test_auto_feature_follows_trigger() {
        let catalog = Catalog::new(vec![
            FeatureDefinition::builder("fauto")
                .capability(trigger("(osgi.identity=fx)"))
                .build(),
            public("fx").build(),
        ])
        .unwrap();
        let plan = resolve(&catalog, &["fx"]).unwrap();
        assert_eq!(plan.resolved_features(), vec!["fx", "fauto"]);
        assert_eq!(
            plan.features[1].reason,
            ActivationReason::Auto { triggered_by: vec!["fx".to_string()] }
        );
        assert_eq!(plan.resolved_features().len(), 2);
    }

    #[test]
    fn test_auto_feature_not_triggered() {
        let catalog = Catalog::new(vec![
            FeatureDefinition::builder("fauto").capability(trigger("(osgi.identity=fx)")).build(),
            public("fx").build(),
            public("fy").build(),
        ])
        .unwrap();
        let plan = resolve(&catalog, &["fy"]).unwrap();
        assert_eq!(plan.resolved_features(), vec!["fy"]);
    }

    #[test]
    fn test_auto_features_chain_to_fixpoint() {
        let catalog = Catalog::new(vec![
            FeatureDefinition::builder("second")
                .capability(trigger("(osgi.identity=first)"))
                .build(),
            FeatureDefinition::builder("first")
                .capability(trigger("(osgi.identity=base)"))
                .constituent(includes("helper"))
                .build(),
            FeatureDefinition::builder("helper").build(),
            public("base").build(),
        ])
        .unwrap();
        let plan = resolve(&catalog, &["base"]).unwrap();
        assert_eq!(plan.resolved_features(), vec!["base", "helper", "first", "second"]);
    }

    #[test]
    fn test_invalid_capability_never_triggers() {
        let catalog = Catalog::new(vec![
            FeatureDefinition::builder("broken")
                .capability(ProvisionCapability::parse("osgi.identity; filter:=\"(osgi.identity=x\""))
                .build(),
            public("x").build(),
        ])
        .unwrap();
        let plan = resolve(&catalog, &["x"]).unwrap();
        assert_eq!(plan.resolved_features(), vec!["x"]);
    }

    #[test]
    fn test_superseded_auto_feature_skipped_when_replacement_exists() {
        let catalog = Catalog::new(vec![
            FeatureDefinition::builder("old-auto")
                .capability(trigger("(osgi.identity=x)"))
                .superseded(true, ["new-auto"])
                .build(),
            FeatureDefinition::builder("new-auto")
                .capability(trigger("(osgi.identity=x)"))
                .build(),
            public("x").build(),
        ])
        .unwrap();
        let plan = resolve(&catalog, &["x"]).unwrap();
        assert_eq!(plan.resolved_features(), vec!["x", "new-auto"]);
    }

    #[test]
    fn test_superseded_auto_feature_activates_when_replacement_is_not_triggered() {
        let catalog = Catalog::new(vec![
            FeatureDefinition::builder("old-auto")
                .capability(trigger("(osgi.identity=x)"))
                .superseded(true, ["new-auto"])
                .build(),
            FeatureDefinition::builder("new-auto")
                .capability(trigger("(osgi.identity=y)"))
                .build(),
            public("x").build(),
            public("y").build(),
        ])
        .unwrap();
        let plan = resolve(&catalog, &["x"]).unwrap();
        assert_eq!(plan.resolved_features(), vec!["x", "old-auto"]);

        let plan = resolve(&catalog, &["x", "y"]).unwrap();
        assert!(plan.resolved_features().contains(&"new-auto"));
        assert!(!plan.resolved_features().contains(&"old-auto"));
    }

    #[test]
    fn test_cycle_detected_in_either_order() {
        let catalog = Catalog::new(vec![
            public("a").constituent(includes("b")).build(),
            public("b").constituent(includes("a")).build(),
        ])
        .unwrap();
        for names in [["a", "b"], ["b", "a"]] {
            match resolve(&catalog, &names) {
                Err(ProvisionError::CyclicDependency { cycle }) => {
                    assert_eq!(cycle.first(), cycle.last());
                    assert_eq!(cycle.len(), 3);
                }
                other => panic!("expected a cycle for {:?}, got {:?}", names, other.is_ok()),
            }
        }
        assert!(matches!(resolve(&catalog, &["a"]), Err(ProvisionError::CyclicDependency { .. })));
    }

    #[test]
    fn test_dependencies_activate_first() {
        let catalog = Catalog::new(vec![
            public("app").constituent(includes("web")).constituent(includes("db")).build(),
            FeatureDefinition::builder("web").constituent(includes("core")).build(),
            FeatureDefinition::builder("db").constituent(includes("core")).build(),
            FeatureDefinition::builder("core").build(),
        ])
        .unwrap();
        let plan = resolve(&catalog, &["app"]).unwrap();
        assert_eq!(plan.resolved_features(), vec!["core", "web", "db", "app"]);
        assert_eq!(plan.features[0].reason, ActivationReason::Included { by: "web".to_string() });
    }

    #[test]
    fn test_unresolved_nested_reference() {
        let catalog = Catalog::new(vec![public("a").constituent(includes("missing-1.0")).build()]).unwrap();
        match resolve(&catalog, &["a"]) {
            Err(ProvisionError::UnresolvedReference { name, required_by, .. }) => {
                assert_eq!(name, "missing-1.0");
                assert_eq!(required_by.as_deref(), Some("a"));
            }
            other => panic!("expected unresolved, got {:?}", other.is_ok()),
        }
        assert!(matches!(
            resolve(&catalog, &["nope"]),
            Err(ProvisionError::UnresolvedReference { .. })
        ));
    }

    #[test]
    fn test_optional_missing_feature_is_a_warning() {
        let catalog = Catalog::new(vec![public("a").constituent(includes("extra-1.0").optional()).build()]).unwrap();
        let plan = resolve(&catalog, &["a"]).unwrap();
        assert_eq!(plan.resolved_features(), vec!["a"]);
        assert!(matches!(plan.warnings[0], ResolutionWarning::OptionalMissing { .. }));
    }

    #[test]
    fn test_tolerated_version_used_when_primary_absent() {
        let catalog = Catalog::new(vec![
            public("app").constituent(includes("com.acme.jndi-2.0").with_tolerates(["1.0"])).build(),
            FeatureDefinition::builder("com.acme.jndi-1.0").build(),
        ])
        .unwrap();
        let plan = resolve(&catalog, &["app"]).unwrap();
        assert_eq!(plan.resolved_features(), vec!["com.acme.jndi-1.0", "app"]);
    }

    #[test]
    fn test_tolerates_resolves_singleton_clash() {
        let catalog = Catalog::new(vec![
            public("com.acme.servlet-3.1").singleton(true).build(),
            FeatureDefinition::builder("com.acme.servlet-4.0").singleton(true).build(),
            public("app")
                .constituent(includes("com.acme.servlet-4.0").with_tolerates(["3.1"]))
                .build(),
        ])
        .unwrap();
        let plan = resolve(&catalog, &["com.acme.servlet-3.1", "app"]).unwrap();
        assert_eq!(plan.resolved_features(), vec!["com.acme.servlet-3.1", "app"]);

        let strict = Catalog::new(vec![
            public("com.acme.servlet-3.1").singleton(true).build(),
            FeatureDefinition::builder("com.acme.servlet-4.0").singleton(true).build(),
            public("app").constituent(includes("com.acme.servlet-4.0")).build(),
        ])
        .unwrap();
        assert!(matches!(
            resolve(&strict, &["com.acme.servlet-3.1", "app"]),
            Err(ProvisionError::SingletonConflict { .. })
        ));
    }

    #[test]
    fn test_unknown_content_type() {
        let tolerated = Catalog::new(vec![public("a")
            .constituent(FeatureResource::new("weird", SubsystemContentType::Unknown).optional())
            .constituent(FeatureResource::bundle("b"))
            .build()])
        .unwrap();
        let plan = resolve(&tolerated, &["a"]).unwrap();
        assert_eq!(plan.bundle_count(), 1);
        assert!(matches!(plan.warnings[0], ResolutionWarning::UnknownContentType { .. }));

        let mandatory = Catalog::new(vec![public("a")
            .constituent(FeatureResource::new("weird", SubsystemContentType::Unknown))
            .build()])
        .unwrap();
        assert!(matches!(
            resolve(&mandatory, &["a"]),
            Err(ProvisionError::UnresolvedReference { .. })
        ));
    }

    #[test]
    fn test_unsupported_feature_version_excluded() {
        let catalog = Catalog::new(vec![
            public("future").feature_version(5).build(),
            public("app").constituent(includes("future").optional()).build(),
        ])
        .unwrap();
        let plan = resolve(&catalog, &["app"]).unwrap();
        assert_eq!(plan.resolved_features(), vec!["app"]);
        assert!(plan
            .warnings
            .iter()
            .any(|w| matches!(w, ResolutionWarning::UnsupportedVersion { feature_version: 5, .. })));
        assert!(matches!(
            resolve(&catalog, &["future"]),
            Err(ProvisionError::UnresolvedReference { .. })
        ));
    }

    #[test]
    fn test_os_and_java_filters() {
        let catalog = Catalog::new(vec![public("a")
            .constituent(FeatureResource::bundle("linux-only").with_os_list(["linux"]))
            .constituent(FeatureResource::bundle("windows-only").with_os_list(["windows"]))
            .constituent(FeatureResource::bundle("nowhere").with_os_list(Vec::<String>::new()))
            .constituent(FeatureResource::bundle("java21").with_require_java(21))
            .constituent(includes("win-feature").with_os_list(["windows"]))
            .build()])
        .unwrap();
        let plan = resolve(&catalog, &["a"]).unwrap();
        let bundles: Vec<_> = plan.features[0].bundles().map(|b| b.symbolic_name.as_str()).collect();
        assert_eq!(bundles, vec!["linux-only"]);
        assert_eq!(plan.resolved_features(), vec!["a"]);
        assert!(plan
            .warnings
            .iter()
            .any(|w| matches!(w, ResolutionWarning::RequiresNewerJava { required: 21, runtime: 17, .. })));
    }

    #[test]
    fn test_shared_bundle_activated_once() {
        let catalog = Catalog::new(vec![
            public("a").constituent(includes("b")).constituent(FeatureResource::bundle("shared")).build(),
            FeatureDefinition::builder("b").constituent(FeatureResource::bundle("shared")).build(),
        ])
        .unwrap();
        let plan = resolve(&catalog, &["a"]).unwrap();
        assert_eq!(plan.feature("b").unwrap().bundles().count(), 1);
        assert_eq!(plan.feature("a").unwrap().bundles().count(), 0);
    }

    #[test]
    fn test_artifacts_are_planned_separately() {
        let catalog = Catalog::new(vec![public("a")
            .constituent(FeatureResource::new("lib/x.jar", SubsystemContentType::JarType))
            .constituent(FeatureResource::new("bin/tool", SubsystemContentType::FileType))
            .constituent(FeatureResource::bundle("b"))
            .build()])
        .unwrap();
        let plan = resolve(&catalog, &["a"]).unwrap();
        let feature = &plan.features[0];
        assert_eq!(feature.artifacts.len(), 2);
        assert_eq!(feature.bundles().count(), 1);
    }

    #[test]
    fn test_visibility_and_supersession_warnings() {
        let catalog = Catalog::new(vec![
            FeatureDefinition::builder("private").build(),
            public("old").superseded(true, ["new"]).build(),
        ])
        .unwrap();
        let plan = resolve(&catalog, &["private", "old"]).unwrap();
        assert_eq!(plan.resolved_features(), vec!["private", "old"]);
        assert!(matches!(plan.warnings[0], ResolutionWarning::NonPublicRoot { .. }));
        assert!(matches!(plan.warnings[1], ResolutionWarning::Superseded { .. }));
    }

    #[test]
    fn test_process_restriction() {
        let catalog = Catalog::new(vec![
            public("server-only").build(),
            public("client-only").process_types(vec![ProcessType::Client]).build(),
            public("app").constituent(includes("client-only")).build(),
        ])
        .unwrap();
        let restricted = catalog.restricted_to(ProcessType::Server);
        let platform = platform();
        let resolver = Resolver::new(&restricted, &platform);

        let plan = resolver.resolve_names(&["server-only", "client-only"]).unwrap();
        assert_eq!(plan.resolved_features(), vec!["server-only"]);
        assert!(matches!(
            plan.warnings[0],
            ResolutionWarning::RestrictedAccess { process_type: ProcessType::Server, .. }
        ));

        match resolver.resolve_names(&["app"]) {
            Err(ProvisionError::UnresolvedReference { reason, .. }) => assert!(reason.contains("server processes")),
            other => panic!("expected unresolved, got {:?}", other.is_ok()),
        }
    }

    fn versionless_catalog() -> Catalog {
        Catalog::new(vec![
            public("io.openliberty.versionless.servlet")
                .kind(FeatureKind::Versionless)
                .constituent(includes("com.acme.servlet-4.0"))
                .constituent(includes("com.acme.servlet-6.0"))
                .build(),
            public("com.acme.servlet-4.0").singleton(true).platforms(["javaee-8.0"]).build(),
            public("com.acme.servlet-6.0").singleton(true).platforms(["jakartaee-10.0"]).build(),
            public("com.acme.javaee-8.0")
                .kind(FeatureKind::Convenience)
                .platforms(["javaee-8.0"])
                .build(),
            public("com.acme.eeCompatible-10.0")
                .kind(FeatureKind::Compatibility)
                .platforms(["jakartaee-10.0"])
                .build(),
            public("com.acme.eeCompatible-9.0")
                .kind(FeatureKind::Compatibility)
                .build(),
        ])
        .unwrap()
    }

    #[test]
    fn test_versionless_with_request_qualifier() {
        let catalog = versionless_catalog();
        let plan = resolve(&catalog, &["io.openliberty.versionless.servlet@jakartaee-10.0"]).unwrap();
        assert_eq!(plan.resolved_features(), vec!["com.acme.servlet-6.0"]);
        assert_eq!(plan.requests[0].feature, "com.acme.servlet-6.0");
    }

    #[test]
    fn test_versionless_with_convenience_and_compatibility_platforms() {
        let catalog = versionless_catalog();
        let plan = resolve(&catalog, &["io.openliberty.versionless.servlet", "com.acme.javaee-8.0"]).unwrap();
        assert!(plan.resolved_features().contains(&"com.acme.servlet-4.0"));

        let plan = resolve(&catalog, &["com.acme.eeCompatible-10.0", "io.openliberty.versionless.servlet"]).unwrap();
        assert!(plan.resolved_features().contains(&"com.acme.servlet-6.0"));
    }

    #[test]
    fn test_versionless_with_configured_platform() {
        let catalog = versionless_catalog();
        let platform = platform().with_platforms(vec!["JAVAEE-8.0".to_string()]);
        let plan = Resolver::new(&catalog, &platform)
            .resolve_names(&["io.openliberty.versionless.servlet"])
            .unwrap();
        assert_eq!(plan.resolved_features(), vec!["com.acme.servlet-4.0"]);
    }

    #[test]
    fn test_versionless_absent_or_ambiguous() {
        let catalog = versionless_catalog();
        match resolve(&catalog, &["io.openliberty.versionless.servlet"]) {
            Err(ProvisionError::UnresolvedReference { reason, .. }) => assert!(reason.contains("no variant")),
            other => panic!("expected unresolved, got {:?}", other.is_ok()),
        }

        let platform = platform().with_platforms(vec!["javaee-8.0".to_string(), "jakartaee-10.0".to_string()]);
        match Resolver::new(&catalog, &platform).resolve_names(&["io.openliberty.versionless.servlet"]) {
            Err(ProvisionError::UnresolvedReference { reason, .. }) => assert!(reason.contains("ambiguous")),
            other => panic!("expected unresolved, got {:?}", other.is_ok()),
        }
    }

    #[test]
    fn test_versionless_prefers_non_superseded() {
        let catalog = Catalog::new(vec![
            public("io.openliberty.versionless.jdbc")
                .kind(FeatureKind::Versionless)
                .constituent(includes("jdbc-4.2"))
                .constituent(includes("jdbc-4.3"))
                .build(),
            public("jdbc-4.2").platforms(["javaee-8.0"]).superseded(true, ["jdbc-4.3"]).build(),
            public("jdbc-4.3").platforms(["javaee-8.0"]).build(),
        ])
        .unwrap();
        let plan = resolve(&catalog, &["io.openliberty.versionless.jdbc@javaee-8.0"]).unwrap();
        assert_eq!(plan.resolved_features(), vec!["jdbc-4.3"]);
    }

    #[test]
    fn test_compatibility_needs_one_platform() {
        let catalog = versionless_catalog();
        assert!(matches!(
            resolve(&catalog, &["com.acme.eeCompatible-9.0"]),
            Err(ProvisionError::UnresolvedReference { .. })
        ));
    }

    fn idempotence_catalog() -> Catalog {
        Catalog::new(vec![
            public("a").constituent(includes("c")).build(),
            public("b").constituent(includes("c")).constituent(includes("d")).build(),
            public("c").constituent(FeatureResource::bundle("cb").with_start_level(5)).build(),
            public("d").build(),
            public("e").build(),
            FeatureDefinition::builder("auto-cd")
                .capability(trigger("(|(osgi.identity=c)(osgi.identity=e))"))
                .constituent(FeatureResource::bundle("glue"))
                .build(),
        ])
        .unwrap()
    }

    proptest! {
        #[test]
        fn prop_resolve_is_idempotent(names in proptest::sample::subsequence(vec!["a", "b", "c", "d", "e"], 0..=5)) {
            let catalog = idempotence_catalog();
            let first = resolve(&catalog, &names).unwrap();
            let second = resolve(&catalog, &names).unwrap();
            prop_assert_eq!(first.resolved_features(), second.resolved_features());
            prop_assert_eq!(first.fingerprint(), second.fingerprint());
        }

        #[test]
        fn prop_resolved_set_ignores_request_order(names in proptest::sample::subsequence(vec!["a", "b", "c", "d", "e"], 1..=5)) {
            let catalog = idempotence_catalog();
            let mut reversed = names.clone();
            reversed.reverse();
            let mut forward: Vec<String> = resolve(&catalog, &names).unwrap().resolved_features().iter().map(|s| s.to_string()).collect();
            let mut backward: Vec<String> = resolve(&catalog, &reversed).unwrap().resolved_features().iter().map(|s| s.to_string()).collect();
            forward.sort();
            backward.sort();
            prop_assert_eq!(forward, backward);
        }
    }
}
