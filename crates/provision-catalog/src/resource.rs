//! Feature constituents.

use crate::header::{parse_list, HeaderClause};
use provision_types::{parse_name_and_version, SubsystemContentType, VersionRange};
use serde::Serialize;
use tracing::warn;

/// One entry of a feature's `Subsystem-Content` header.
///
/// Read-only once built. An `os_list` of `None` means every operating
/// system; `Some(vec![])` means none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureResource {
    symbolic_name: String,
    content_type: SubsystemContentType,
    #[serde(skip_serializing_if = "Option::is_none")]
    raw_type: Option<String>,
    version_range: VersionRange,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    os_list: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_level: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tolerates: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    require_java: Option<u32>,
    optional: bool,
}

impl FeatureResource {
    /// A constituent with default attributes.
    pub fn new(symbolic_name: impl Into<String>, content_type: SubsystemContentType) -> Self {
        Self {
            symbolic_name: symbolic_name.into(),
            content_type,
            raw_type: None,
            version_range: VersionRange::any(),
            location: None,
            os_list: None,
            start_level: None,
            tolerates: Vec::new(),
            require_java: None,
            optional: false,
        }
    }

    /// Shorthand for a bundle constituent.
    pub fn bundle(symbolic_name: impl Into<String>) -> Self {
        Self::new(symbolic_name, SubsystemContentType::BundleType)
    }

    /// Shorthand for a nested feature constituent.
    pub fn feature(symbolic_name: impl Into<String>) -> Self {
        Self::new(symbolic_name, SubsystemContentType::FeatureType)
    }

    /// Build from a parsed `Subsystem-Content` clause.
    ///
    /// Malformed optional attributes fall back to their defaults with a
    /// warning; nothing here fails.
    pub fn from_clause(clause: &HeaderClause) -> Self {
        let raw_type = clause.attribute("type");
        let mut resource = Self::new(clause.name.clone(), SubsystemContentType::parse(raw_type));
        if resource.content_type == SubsystemContentType::Unknown {
            resource.raw_type = raw_type.map(str::to_string);
        }

        if let Some(version) = clause.attribute("version") {
            match VersionRange::parse(version) {
                Ok(range) => resource.version_range = range,
                Err(e) => warn!("Ignoring version '{}' of '{}': {}", version, clause.name, e),
            }
        }

        resource.location = clause.parameter("location").map(str::to_string);

        if let Some(os) = clause.attribute("os") {
            resource.os_list = Some(
                os.split(',')
                    .map(|o| o.trim().to_ascii_lowercase())
                    .filter(|o| !o.is_empty())
                    .collect(),
            );
        }

        if let Some(level) = clause.parameter("start-level").or_else(|| clause.parameter("start-phase")) {
            match level.trim().parse::<u32>() {
                Ok(level) if level > 0 => resource.start_level = Some(level),
                _ => warn!("Ignoring start level '{}' of '{}'", level, clause.name),
            }
        }

        if let Some(tolerates) = clause.directive("ibm.tolerates").or_else(|| clause.directive("tolerates")) {
            match parse_list(tolerates) {
                Ok(list) => resource.tolerates = list,
                Err(e) => warn!("Ignoring tolerates of '{}': {}", clause.name, e),
            }
        }

        if let Some(java) = clause.directive("require-java") {
            match java.trim().parse::<u32>() {
                Ok(level) => resource.require_java = Some(level),
                Err(_) => warn!("Ignoring require-java '{}' of '{}'", java, clause.name),
            }
        }

        resource.optional = clause
            .directive("resolution")
            .map_or(false, |r| r.trim().eq_ignore_ascii_case("optional"));

        resource
    }

    /// Set the accepted version range.
    pub fn with_version_range(mut self, range: VersionRange) -> Self {
        self.version_range = range;
        self
    }

    /// Set the install location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Restrict to the given operating systems.
    pub fn with_os_list<I, S>(mut self, os: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.os_list = Some(os.into_iter().map(|o| o.into().to_ascii_lowercase()).collect());
        self
    }

    /// Set the bundle start level.
    pub fn with_start_level(mut self, level: u32) -> Self {
        self.start_level = Some(level);
        self
    }

    /// Set the tolerated alternate versions.
    pub fn with_tolerates<I, S>(mut self, tolerates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tolerates = tolerates.into_iter().map(Into::into).collect();
        self
    }

    /// Set the minimum Java level.
    pub fn with_require_java(mut self, level: u32) -> Self {
        self.require_java = Some(level);
        self
    }

    /// Mark as optional.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Record the unrecognised type token of an unknown constituent.
    pub fn with_raw_type(mut self, raw: impl Into<String>) -> Self {
        self.raw_type = Some(raw.into());
        self
    }

    /// Symbolic name of the bundle, artifact, or feature.
    pub fn symbolic_name(&self) -> &str {
        &self.symbolic_name
    }

    /// Parsed content type.
    pub fn content_type(&self) -> SubsystemContentType {
        self.content_type
    }

    /// Type token as written, kept only for unknown types.
    pub fn raw_type(&self) -> Option<&str> {
        self.raw_type.as_deref()
    }

    /// Whether this constituent is of type `content_type`.
    pub fn is_type(&self, content_type: SubsystemContentType) -> bool {
        self.content_type == content_type
    }

    /// Accepted version range.
    pub fn version_range(&self) -> &VersionRange {
        &self.version_range
    }

    /// Install location, defaulting to the symbolic name.
    pub fn location(&self) -> &str {
        self.location.as_deref().unwrap_or(&self.symbolic_name)
    }

    /// Eligible operating systems; `None` means all.
    pub fn os_list(&self) -> Option<&[String]> {
        self.os_list.as_deref()
    }

    /// Whether this constituent may be provisioned on `os`.
    pub fn applies_to_os(&self, os: &str) -> bool {
        match &self.os_list {
            None => true,
            Some(list) => list.iter().any(|o| o.eq_ignore_ascii_case(os)),
        }
    }

    /// Declared start level, if any.
    pub fn start_level(&self) -> Option<u32> {
        self.start_level
    }

    /// Tolerated alternate versions.
    pub fn tolerates(&self) -> &[String] {
        &self.tolerates
    }

    /// Minimum Java level, if any.
    pub fn require_java(&self) -> Option<u32> {
        self.require_java
    }

    /// Whether a missing target is tolerated.
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Candidate feature names this constituent accepts, primary first.
    ///
    /// A tolerated version `t` of `base-v` names `base-t`.
    pub fn acceptable_names(&self) -> Vec<String> {
        let mut names = vec![self.symbolic_name.clone()];
        let (base, _) = parse_name_and_version(&self.symbolic_name);
        for tolerated in &self.tolerates {
            let candidate = format!("{}-{}", base, tolerated);
            if !names.iter().any(|n| n.eq_ignore_ascii_case(&candidate)) {
                names.push(candidate);
            }
        }
        names
    }

    /// Stable identity used to activate a shared bundle once.
    pub fn match_string(&self) -> String {
        format!("{};{}", self.location(), self.version_range)
    }
}
