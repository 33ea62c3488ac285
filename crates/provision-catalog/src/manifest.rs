//! Feature manifest (`.mf`) loading.
//!
//! Manifests use Java manifest syntax: `Name: value` lines, where a line
//! starting with a single space continues the previous value. Parsing
//! stops at the first blank line after the main section.

use crate::capability::ProvisionCapability;
use crate::definition::{FeatureDefinition, FeatureKind};
use crate::header::{parse_header, parse_list};
use crate::resource::FeatureResource;
use indexmap::IndexMap;
use provision_core::util::slurp;
use provision_types::{
    bail, parse_name_and_version, ActivationType, BundleRepositoryType, ProcessType, ProvisionError,
    Result, Version, Visibility,
};
use std::path::Path;
use tracing::{debug, warn};

/// Manifest header names.
pub mod headers {
    /// Symbolic name plus visibility/singleton/supersession directives
    pub const SYMBOLIC_NAME: &str = "Subsystem-SymbolicName";
    /// Feature version
    pub const VERSION: &str = "Subsystem-Version";
    /// Constituents
    pub const CONTENT: &str = "Subsystem-Content";
    /// User-facing short name
    pub const SHORT_NAME: &str = "IBM-ShortName";
    /// Manifest format level
    pub const FEATURE_VERSION: &str = "IBM-Feature-Version";
    /// Auto-feature trigger
    pub const PROVISION_CAPABILITY: &str = "IBM-Provision-Capability";
    /// Supported process types
    pub const PROCESS_TYPES: &str = "IBM-Process-Types";
    /// Bundle activation policy
    pub const ACTIVATION_TYPE: &str = "WLP-Activation-Type";
    /// Ordered platform list
    pub const PLATFORM: &str = "WLP-Platform";
    /// Explicit feature kind
    pub const FEATURE_KIND: &str = "WLP-Feature-Kind";
}

const VERSIONLESS_PREFIX: &str = "io.openliberty.versionless.";
const COMPATIBILITY_FAMILIES: [&str; 2] = ["eeCompatible", "mpVersion"];

/// Split manifest text into headers, joining continuation lines.
///
/// # Errors
///
/// Returns `ProvisionError::Manifest` for a continuation line with no
/// header before it, or a line without a `:` separator.
pub fn parse_manifest(text: &str) -> Result<IndexMap<String, String>> {
    let mut headers: IndexMap<String, String> = IndexMap::new();
    let mut current: Option<String> = None;

    for (number, line) in text.lines().enumerate() {
        let line = line.strip_suffix('\r').unwrap_or(line);

        if let Some(continued) = line.strip_prefix(' ') {
            let Some(value) = current.as_ref().and_then(|name| headers.get_mut(name)) else {
                bail!(Manifest, "Line {}: continuation without a header", number + 1);
            };
            value.push_str(continued);
            continue;
        }

        if line.trim().is_empty() {
            if headers.is_empty() {
                continue;
            }
            break;
        }

        let Some((name, value)) = line.split_once(':') else {
            bail!(Manifest, "Line {}: expected 'Name: value', found '{}'", number + 1, line);
        };
        let name = name.trim().to_string();
        let value = value.strip_prefix(' ').unwrap_or(value).to_string();
        if headers.insert(name.clone(), value).is_some() {
            warn!("Duplicate manifest header '{}'; keeping the last value", name);
        }
        current = Some(name);
    }

    Ok(headers)
}

/// Build a definition from parsed headers.
///
/// # Errors
///
/// Fails when the symbolic name is missing, or when the version,
/// feature version, or content headers are malformed. Malformed
/// optional parameters fall back to defaults instead.
pub fn definition_from_headers(
    fields: IndexMap<String, String>,
    repository: BundleRepositoryType,
    source: Option<&Path>,
) -> Result<FeatureDefinition> {
    let get = |name: &str| {
        fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
    };

    let symbolic = get(headers::SYMBOLIC_NAME)
        .ok_or_else(|| ProvisionError::Manifest(format!("Missing {} header", headers::SYMBOLIC_NAME)))?;
    let identity = parse_header(symbolic)?
        .into_iter()
        .next()
        .ok_or_else(|| ProvisionError::Manifest(format!("Empty {} header", headers::SYMBOLIC_NAME)))?;
    let name = identity.name.clone();
    let flag = |directive: &str| {
        identity
            .directive(directive)
            .map_or(false, |v| v.trim().eq_ignore_ascii_case("true"))
    };

    let mut builder = FeatureDefinition::builder(name.clone())
        .visibility(Visibility::parse(identity.directive("visibility")))
        .singleton(flag("singleton"))
        .superseded(
            flag("superseded"),
            superseded_by(identity.directive("superseded-by"))?,
        )
        .activation_type(ActivationType::parse(get(headers::ACTIVATION_TYPE)))
        .process_types(ProcessType::parse_list(get(headers::PROCESS_TYPES)))
        .kind(feature_kind(&name, get(headers::FEATURE_KIND)))
        .repository(repository);

    if let Some(short_name) = get(headers::SHORT_NAME) {
        builder = builder.short_name(short_name);
    }

    if let Some(version) = get(headers::VERSION) {
        builder = builder.version(Version::parse(version)?);
    }

    if let Some(level) = get(headers::FEATURE_VERSION) {
        let level = level.parse::<u32>().map_err(|_| {
            ProvisionError::Manifest(format!("{}: invalid {} '{}'", name, headers::FEATURE_VERSION, level))
        })?;
        builder = builder.feature_version(level);
    }

    if let Some(platforms) = get(headers::PLATFORM) {
        builder = builder.platforms(parse_list(platforms)?);
    }

    if let Some(content) = get(headers::CONTENT) {
        for clause in parse_header(content)? {
            builder = builder.constituent(FeatureResource::from_clause(&clause));
        }
    }

    if let Some(capability) = get(headers::PROVISION_CAPABILITY) {
        let capability = ProvisionCapability::parse(capability);
        if let ProvisionCapability::Invalid { reason, .. } = &capability {
            warn!("Auto-feature '{}' has an invalid capability and will never activate: {}", name, reason);
        }
        builder = builder.capability(capability);
    }

    if let Some(path) = source {
        builder = builder.source(path);
    }

    debug!("Parsed feature manifest for '{}'", name);
    Ok(builder.headers(fields).build())
}

/// Load one `.mf` file.
pub fn load_manifest_file(path: &Path, repository: BundleRepositoryType) -> Result<FeatureDefinition> {
    let text = slurp(path)?;
    let fields = parse_manifest(&text).map_err(|e| in_file(path, e))?;
    definition_from_headers(fields, repository, Some(path)).map_err(|e| in_file(path, e))
}

/// Prefix manifest errors with the file they came from.
pub(crate) fn in_file(path: &Path, error: ProvisionError) -> ProvisionError {
    match error {
        ProvisionError::Manifest(msg) => ProvisionError::Manifest(format!("{}: {}", path.display(), msg)),
        other => other,
    }
}

fn superseded_by(value: Option<&str>) -> Result<Vec<String>> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    // Bracketed entries are replacements that are not drop-in.
    Ok(parse_list(value)?
        .into_iter()
        .map(|s| s.trim_matches(|c| c == '[' || c == ']').to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

/// Feature kind from the explicit header, falling back to naming rules.
pub(crate) fn feature_kind(symbolic_name: &str, explicit: Option<&str>) -> FeatureKind {
    match explicit.map(|k| k.trim().to_ascii_lowercase()).as_deref() {
        Some("versionless") => return FeatureKind::Versionless,
        Some("convenience") => return FeatureKind::Convenience,
        Some("compatibility") => return FeatureKind::Compatibility,
        Some("standard") => return FeatureKind::Standard,
        Some(other) => warn!("Unknown feature kind '{}' for '{}'", other, symbolic_name),
        None => {}
    }

    if symbolic_name.starts_with(VERSIONLESS_PREFIX) {
        return FeatureKind::Versionless;
    }
    let (base, _) = parse_name_and_version(symbolic_name);
    if COMPATIBILITY_FAMILIES.iter().any(|f| base.ends_with(f)) {
        return FeatureKind::Compatibility;
    }
    FeatureKind::Standard
}

#[cfg(test)]
mod tests {
    use super::*;
    use provision_types::SubsystemContentType;
    use std::fs;
    use tempfile::TempDir;

    const SERVLET: &str = "Manifest-Version: 1.0\r
Subsystem-SymbolicName: com.acme.servlet-4.0; visibility:=public; singleton:=true\r
Subsystem-Version: 4.0.0\r
IBM-ShortName: servlet-4.0\r
IBM-Feature-Version: 2\r
WLP-Activation-Type: parallel\r
WLP-Platform: javaee-8.0\r
Subsystem-Content: com.acme.servlet.api; start-level=10, com.acme.servlet.impl; \r
 start-level=20, com.acme.jndi-1.0; type=\"osgi.subsystem.feature\"\r
\r
Name: ignored/section\r
Subsystem-Content: nope\r
";

    #[test]
    fn test_parse_manifest_joins_continuations() {
        let headers = parse_manifest(SERVLET).unwrap();
        assert_eq!(
            headers["Subsystem-Content"],
            "com.acme.servlet.api; start-level=10, com.acme.servlet.impl; start-level=20, com.acme.jndi-1.0; type=\"osgi.subsystem.feature\""
        );
        assert!(!headers.contains_key("Name"));
    }

    #[test]
    fn test_definition_from_manifest() {
        let headers = parse_manifest(SERVLET).unwrap();
        let def = definition_from_headers(headers, BundleRepositoryType::Core, None).unwrap();
        assert_eq!(def.symbolic_name(), "com.acme.servlet-4.0");
        assert_eq!(def.short_name(), Some("servlet-4.0"));
        assert_eq!(def.version(), &Version::new(4, 0, 0));
        assert_eq!(def.visibility(), Visibility::Public);
        assert!(def.is_singleton());
        assert_eq!(def.activation_type(), ActivationType::Parallel);
        assert_eq!(def.platforms(), &["javaee-8.0".to_string()]);
        assert_eq!(def.constituents(Some(SubsystemContentType::BundleType)).count(), 2);
        assert_eq!(def.constituents(Some(SubsystemContentType::FeatureType)).count(), 1);
        assert_eq!(def.header("ibm-shortname"), Some("servlet-4.0"));
    }

    #[test]
    fn test_invalid_capability_is_not_fatal() {
        let text = "Subsystem-SymbolicName: com.acme.auto\nIBM-Provision-Capability: osgi.identity; filter:=\"(osgi.identity=x\"\n";
        let def = definition_from_headers(parse_manifest(text).unwrap(), BundleRepositoryType::Core, None).unwrap();
        assert!(def.is_auto_feature());
        assert!(!def.capability().unwrap().is_valid());
    }

    #[test]
    fn test_superseded_by_strips_brackets() {
        let text = "Subsystem-SymbolicName: old-1.0; superseded:=true; superseded-by:=\"new-2.0,[other-1.0]\"\n";
        let def = definition_from_headers(parse_manifest(text).unwrap(), BundleRepositoryType::Core, None).unwrap();
        assert!(def.is_superseded());
        assert_eq!(def.superseded_by(), &["new-2.0".to_string(), "other-1.0".to_string()]);
    }

    #[test]
    fn test_manifest_errors() {
        assert!(parse_manifest(" leading continuation").is_err());
        assert!(parse_manifest("no separator here").is_err());

        let missing = parse_manifest("IBM-ShortName: x\n").unwrap();
        assert!(definition_from_headers(missing, BundleRepositoryType::Core, None).is_err());

        let bad_level = parse_manifest("Subsystem-SymbolicName: a\nIBM-Feature-Version: two\n").unwrap();
        assert!(definition_from_headers(bad_level, BundleRepositoryType::Core, None).is_err());
    }

    #[test]
    fn test_feature_kind_rules() {
        assert_eq!(feature_kind("io.openliberty.versionless.servlet", None), FeatureKind::Versionless);
        assert_eq!(feature_kind("io.openliberty.internal.eeCompatible-10.0", None), FeatureKind::Compatibility);
        assert_eq!(feature_kind("io.openliberty.internal.mpVersion-6.1", None), FeatureKind::Compatibility);
        assert_eq!(feature_kind("com.acme.jakartaee-10.0", Some("Convenience")), FeatureKind::Convenience);
        assert_eq!(feature_kind("com.acme.servlet-4.0", Some("bogus")), FeatureKind::Standard);
    }

    #[test]
    fn test_load_manifest_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("servlet.mf");
        fs::write(&path, SERVLET).unwrap();

        let def = load_manifest_file(&path, BundleRepositoryType::User).unwrap();
        assert_eq!(def.feature_name(), "usr:servlet-4.0");
        assert_eq!(def.source(), Some(path.as_path()));
    }
}
