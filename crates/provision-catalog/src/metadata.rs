//! YAML feature definitions.
//!
//! A `.yml` file holds one definition, or a list of them:
//!
//! ```yaml
//! symbolic_name: com.acme.servlet-4.0
//! short_name: servlet-4.0
//! version: "4.0.0"
//! visibility: public
//! singleton: true
//! activation_type: parallel
//! platforms: [javaee-8.0]
//! content:
//!   - name: com.acme.servlet.api
//!     start_level: 10
//!   - name: com.acme.jndi-1.0
//!     type: osgi.subsystem.feature
//!     tolerates: ["2.0"]
//! ```
//!
//! `content` may also be a `Subsystem-Content` header string. Versions
//! must be quoted strings or integers; YAML reads `1.10` as the float 1.1.
//! Without an explicit `kind`, the kind is derived from the name.

use crate::capability::ProvisionCapability;
use crate::definition::{FeatureDefinition, FeatureKind};
use crate::header::parse_header;
use crate::manifest::{feature_kind, in_file};
use crate::resource::FeatureResource;
use provision_core::util::slurp;
use provision_types::{
    bail, ActivationType, BundleRepositoryType, ProcessType, ProvisionError, Result, SubsystemContentType,
    Version, VersionRange, Visibility,
};
use serde::Deserialize;
use serde_yaml::Value;
use std::path::Path;
use tracing::warn;

/// One feature as written in YAML.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureMetadata {
    /// Symbolic name
    pub symbolic_name: String,
    /// Short name
    #[serde(default)]
    pub short_name: Option<String>,
    /// Feature version, a string or an integer
    #[serde(default)]
    pub version: Option<Value>,
    /// `IBM-Feature-Version` level
    #[serde(default)]
    pub feature_version: u32,
    /// Visibility token
    #[serde(default)]
    pub visibility: Option<String>,
    /// Singleton flag
    #[serde(default)]
    pub singleton: bool,
    /// Superseded flag
    #[serde(default)]
    pub superseded: bool,
    /// Replacement features
    #[serde(default)]
    pub superseded_by: Vec<String>,
    /// Platform-selection kind, derived from the name when absent
    #[serde(default)]
    pub kind: Option<FeatureKind>,
    /// Ordered platform list
    #[serde(default)]
    pub platforms: Vec<String>,
    /// Activation policy token
    #[serde(default)]
    pub activation_type: Option<String>,
    /// Process type tokens
    #[serde(default)]
    pub process_types: Vec<String>,
    /// `IBM-Provision-Capability` header value
    #[serde(default)]
    pub provision_capability: Option<String>,
    /// Constituents
    #[serde(default)]
    pub content: ContentSpec,
}

/// Constituents as a header string or structured entries.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ContentSpec {
    /// `Subsystem-Content` syntax
    Header(String),
    /// One entry per constituent
    Entries(Vec<ContentEntry>),
}

impl Default for ContentSpec {
    fn default() -> Self {
        ContentSpec::Entries(Vec::new())
    }
}

/// One structured constituent.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContentEntry {
    /// Symbolic name
    pub name: String,
    /// Content type token
    #[serde(default, rename = "type")]
    pub content_type: Option<String>,
    /// Version range
    #[serde(default)]
    pub version: Option<Value>,
    /// Install location
    #[serde(default)]
    pub location: Option<String>,
    /// Eligible operating systems
    #[serde(default)]
    pub os: Option<Vec<String>>,
    /// Bundle start level
    #[serde(default)]
    pub start_level: Option<u32>,
    /// Tolerated alternate versions
    #[serde(default)]
    pub tolerates: Vec<Value>,
    /// Minimum Java level
    #[serde(default)]
    pub require_java: Option<u32>,
    /// Whether a missing target is tolerated
    #[serde(default)]
    pub optional: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MetadataFile {
    Many(Vec<FeatureMetadata>),
    One(Box<FeatureMetadata>),
}

impl FeatureMetadata {
    /// Convert to a definition.
    ///
    /// # Errors
    ///
    /// Fails on an invalid or float-typed version, or an invalid content
    /// header.
    pub fn into_definition(self, repository: BundleRepositoryType) -> Result<FeatureDefinition> {
        let process_types: Vec<ProcessType> = self
            .process_types
            .iter()
            .filter_map(|t| match t.parse() {
                Ok(t) => Some(t),
                Err(e) => {
                    warn!("{}: {}", self.symbolic_name, e);
                    None
                }
            })
            .collect();

        let mut builder = FeatureDefinition::builder(self.symbolic_name.clone())
            .feature_version(self.feature_version)
            .visibility(Visibility::parse(self.visibility.as_deref()))
            .singleton(self.singleton)
            .superseded(self.superseded, self.superseded_by)
            .kind(self.kind.unwrap_or_else(|| feature_kind(&self.symbolic_name, None)))
            .platforms(self.platforms)
            .activation_type(ActivationType::parse(self.activation_type.as_deref()))
            .process_types(process_types)
            .repository(repository);

        if let Some(short_name) = self.short_name {
            builder = builder.short_name(short_name);
        }

        if let Some(version) = self.version.as_ref().map(|v| scalar(v, "version")).transpose()?.flatten() {
            builder = builder.version(Version::parse(&version)?);
        }

        if let Some(capability) = self.provision_capability {
            let capability = ProvisionCapability::parse(&capability);
            if let ProvisionCapability::Invalid { reason, .. } = &capability {
                warn!(
                    "Auto-feature '{}' has an invalid capability and will never activate: {}",
                    self.symbolic_name, reason
                );
            }
            builder = builder.capability(capability);
        }

        let constituents = match self.content {
            ContentSpec::Header(header) => parse_header(&header)?
                .iter()
                .map(FeatureResource::from_clause)
                .collect(),
            ContentSpec::Entries(entries) => entries
                .into_iter()
                .map(ContentEntry::into_resource)
                .collect::<Result<Vec<_>>>()?,
        };

        Ok(builder.constituents(constituents).build())
    }
}

impl ContentEntry {
    fn into_resource(self) -> Result<FeatureResource> {
        let content_type = SubsystemContentType::parse(self.content_type.as_deref());
        let mut resource = FeatureResource::new(self.name.clone(), content_type);
        if content_type == SubsystemContentType::Unknown {
            if let Some(raw) = &self.content_type {
                resource = resource.with_raw_type(raw.clone());
            }
        }

        if let Some(version) = self.version.as_ref().map(|v| scalar(v, "version")).transpose()?.flatten() {
            match VersionRange::parse(&version) {
                Ok(range) => resource = resource.with_version_range(range),
                Err(e) => warn!("Ignoring version '{}' of '{}': {}", version, self.name, e),
            }
        }
        if let Some(location) = self.location {
            resource = resource.with_location(location);
        }
        if let Some(os) = self.os {
            resource = resource.with_os_list(os);
        }
        match self.start_level {
            Some(0) => warn!("Ignoring start level 0 of '{}'", self.name),
            Some(level) => resource = resource.with_start_level(level),
            None => {}
        }
        if !self.tolerates.is_empty() {
            let tolerates = self
                .tolerates
                .iter()
                .map(|v| scalar(v, "tolerates"))
                .collect::<Result<Vec<_>>>()?;
            resource = resource.with_tolerates(tolerates.into_iter().flatten());
        }
        if let Some(java) = self.require_java {
            resource = resource.with_require_java(java);
        }
        if self.optional {
            resource = resource.optional();
        }
        Ok(resource)
    }
}

/// A version-like scalar as text. Floats are refused because YAML has
/// already dropped their trailing zeros.
fn scalar(value: &Value, field: &str) -> Result<Option<String>> {
    match value {
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) if n.is_f64() => bail!(
            Manifest,
            "'{}' value {} was read as a YAML float; quote it to keep every digit",
            field,
            n
        ),
        Value::Number(n) => Ok(Some(n.to_string())),
        _ => Ok(None),
    }
}

/// Load every definition in one YAML file.
pub fn load_metadata_file(path: &Path, repository: BundleRepositoryType) -> Result<Vec<FeatureDefinition>> {
    let content = slurp(path)?;
    let file: MetadataFile = serde_yaml::from_str(&content)
        .map_err(|e| ProvisionError::Manifest(format!("{}: {}", path.display(), e)))?;
    let metadata = match file {
        MetadataFile::Many(list) => list,
        MetadataFile::One(one) => vec![*one],
    };

    metadata
        .into_iter()
        .map(|m| {
            m.into_definition(repository.clone())
                .map(|d| d.with_source(path))
                .map_err(|e| in_file(path, e))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_structured_content() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "servlet.yml",
            r#"
symbolic_name: com.acme.servlet-4.0
short_name: servlet-4.0
version: "4.0"
visibility: public
singleton: true
activation_type: Parallel
process_types: [server, client, bogus]
content:
  - name: com.acme.servlet.api
    start_level: 10
    os: [Linux]
  - name: com.acme.jndi-1.0
    type: osgi.subsystem.feature
    tolerates: ["2.0", 3]
  - name: com.acme.native
    type: osgi.fragment
"#,
        );

        let defs = load_metadata_file(&path, BundleRepositoryType::Core).unwrap();
        assert_eq!(defs.len(), 1);
        let def = &defs[0];
        assert_eq!(def.version(), &Version::new(4, 0, 0));
        assert_eq!(def.visibility(), Visibility::Public);
        assert_eq!(def.activation_type(), ActivationType::Parallel);
        assert_eq!(def.process_types(), &[ProcessType::Server, ProcessType::Client]);
        assert_eq!(def.source(), Some(path.as_path()));

        let all: Vec<_> = def.constituents(None).collect();
        assert_eq!(all[0].start_level(), Some(10));
        assert!(all[0].applies_to_os("linux"));
        assert_eq!(all[1].tolerates(), &["2.0".to_string(), "3".to_string()]);
        assert!(all[2].is_type(SubsystemContentType::Unknown));
        assert_eq!(all[2].raw_type(), Some("osgi.fragment"));
    }

    #[test]
    fn test_header_content_and_list_file() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "features.yaml",
            r#"
- symbolic_name: a-1.0
  content: "b1; start-level=10, b2"
- symbolic_name: auto
  provision_capability: 'osgi.identity; filter:="(osgi.identity=a-1.0)"'
"#,
        );

        let defs = load_metadata_file(&path, BundleRepositoryType::Core).unwrap();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].constituents(None).count(), 2);
        assert!(defs[1].is_auto_feature());
        assert!(defs[1].is_capability_satisfied(&[&defs[0]]));
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "bad.yml", "symbolic_name: a\nsingletn: true\n");
        assert!(matches!(
            load_metadata_file(&path, BundleRepositoryType::Core),
            Err(ProvisionError::Manifest(_))
        ));
    }

    #[test]
    fn test_kind_derived_from_name_when_absent() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "kinds.yml",
            r#"
- symbolic_name: io.openliberty.versionless.servlet
- symbolic_name: com.acme.x.eeCompatible-10.0
- symbolic_name: com.acme.jakartaee-10.0
  kind: convenience
- symbolic_name: io.openliberty.versionless.jsp
  kind: standard
"#,
        );

        let kinds: Vec<_> = load_metadata_file(&path, BundleRepositoryType::Core)
            .unwrap()
            .iter()
            .map(FeatureDefinition::kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                FeatureKind::Versionless,
                FeatureKind::Compatibility,
                FeatureKind::Convenience,
                FeatureKind::Standard,
            ]
        );
    }

    #[test]
    fn test_float_versions_rejected() {
        let dir = TempDir::new().unwrap();
        let version = write(&dir, "version.yml", "symbolic_name: b-1.10\nversion: 1.10\n");
        let err = load_metadata_file(&version, BundleRepositoryType::Core).unwrap_err();
        assert!(err.to_string().contains("quote it"), "{}", err);

        let tolerates = write(
            &dir,
            "tolerates.yml",
            r#"
symbolic_name: a
content:
  - name: b-1.10
    type: osgi.subsystem.feature
    tolerates: [1.20]
"#,
        );
        let err = load_metadata_file(&tolerates, BundleRepositoryType::Core).unwrap_err();
        assert!(err.to_string().contains("tolerates"), "{}", err);

        let quoted = write(
            &dir,
            "quoted.yml",
            r#"
symbolic_name: a
version: "1.10"
content:
  - name: b-1.10
    type: osgi.subsystem.feature
    tolerates: ["1.20"]
"#,
        );
        let defs = load_metadata_file(&quoted, BundleRepositoryType::Core).unwrap();
        assert_eq!(defs[0].version(), &Version::new(1, 10, 0));
        let b = defs[0].constituents(None).next().unwrap();
        assert_eq!(b.acceptable_names(), vec!["b-1.10".to_string(), "b-1.20".to_string()]);
    }
}
