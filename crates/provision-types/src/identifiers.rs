//! Versions, version ranges, and feature name helpers.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use crate::errors::{ProvisionError, Result};

static NAME_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+)-(\d[0-9A-Za-z._]*)$").expect("static regex"));

/// Split a feature symbolic name into its family base and version suffix.
///
/// The suffix is everything after the last `-`, provided it starts with a
/// digit; otherwise the whole name is the base.
///
/// ```
/// use provision_types::parse_name_and_version;
///
/// assert_eq!(parse_name_and_version("com.acme.servlet-4.0"), ("com.acme.servlet", Some("4.0")));
/// assert_eq!(parse_name_and_version("com.acme.json-b"), ("com.acme.json-b", None));
/// ```
pub fn parse_name_and_version(symbolic_name: &str) -> (&str, Option<&str>) {
    match NAME_VERSION.captures(symbolic_name) {
        Some(caps) => {
            let base = caps.get(1).map_or(symbolic_name, |m| m.as_str());
            (base, caps.get(2).map(|m| m.as_str()))
        }
        None => (symbolic_name, None),
    }
}

/// An OSGi version: `major.minor.micro.qualifier`.
///
/// Missing numeric parts are zero; the qualifier compares lexically.
///
/// # Example
///
/// ```
/// use provision_types::Version;
///
/// let v = Version::parse("1.2").unwrap();
/// assert_eq!(v.to_string(), "1.2.0");
/// assert!(Version::parse("1.2.0.beta").unwrap() > v);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Version {
    /// Major component
    pub major: u32,
    /// Minor component
    pub minor: u32,
    /// Micro component
    pub micro: u32,
    /// Free-form qualifier
    pub qualifier: Option<String>,
}

impl Version {
    /// Create a version without a qualifier.
    pub fn new(major: u32, minor: u32, micro: u32) -> Self {
        Self { major, minor, micro, qualifier: None }
    }

    /// Parse an OSGi version string.
    ///
    /// # Errors
    ///
    /// Returns a validation error for empty input, non-numeric components,
    /// or more than four components.
    pub fn parse(version: &str) -> Result<Self> {
        let version = version.trim();
        if version.is_empty() {
            return Err(ProvisionError::Validation("Empty version".to_string()));
        }

        let mut parts = version.splitn(4, '.');
        let mut numbers = [0u32; 3];
        for (i, slot) in numbers.iter_mut().enumerate() {
            match parts.next() {
                Some(part) => {
                    *slot = part.parse().map_err(|_| {
                        ProvisionError::Validation(format!(
                            "Invalid version '{}': component {} is not a number",
                            version,
                            i + 1
                        ))
                    })?;
                }
                None => break,
            }
        }
        let qualifier = parts.next().map(str::to_string);
        if qualifier.as_deref() == Some("") {
            return Err(ProvisionError::Validation(format!(
                "Invalid version '{}': empty qualifier",
                version
            )));
        }

        Ok(Self {
            major: numbers[0],
            minor: numbers[1],
            micro: numbers[2],
            qualifier,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)?;
        if let Some(q) = &self.qualifier {
            write!(f, ".{}", q)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.micro.cmp(&other.micro))
            .then_with(|| {
                self.qualifier
                    .as_deref()
                    .unwrap_or("")
                    .cmp(other.qualifier.as_deref().unwrap_or(""))
            })
    }
}

impl Serialize for Version {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Version::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// An OSGi version range such as `[1.0,2.0)`.
///
/// A bare version `1.0` means "at least 1.0".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionRange {
    /// Lower bound
    pub floor: Version,
    /// Whether the lower bound is included
    pub floor_inclusive: bool,
    /// Upper bound, if any
    pub ceiling: Option<Version>,
    /// Whether the upper bound is included
    pub ceiling_inclusive: bool,
}

impl VersionRange {
    /// The range accepting every version.
    pub fn any() -> Self {
        Self {
            floor: Version::default(),
            floor_inclusive: true,
            ceiling: None,
            ceiling_inclusive: false,
        }
    }

    /// Parse a range in interval or bare-version notation.
    ///
    /// # Errors
    ///
    /// Returns a validation error for unbalanced brackets, missing commas,
    /// invalid versions, or an empty interval.
    pub fn parse(range: &str) -> Result<Self> {
        let range = range.trim().trim_matches('"');
        let first = range.chars().next();
        if !matches!(first, Some('[') | Some('(')) {
            return Ok(Self {
                floor: Version::parse(range)?,
                ..Self::any()
            });
        }

        let last = range.chars().last();
        if !matches!(last, Some(']') | Some(')')) || range.len() < 2 {
            return Err(ProvisionError::Validation(format!(
                "Invalid version range '{}': missing closing bracket",
                range
            )));
        }

        let inner = &range[1..range.len() - 1];
        let (low, high) = inner.split_once(',').ok_or_else(|| {
            ProvisionError::Validation(format!("Invalid version range '{}': expected a comma", range))
        })?;

        let parsed = Self {
            floor: Version::parse(low)?,
            floor_inclusive: first == Some('['),
            ceiling: Some(Version::parse(high)?),
            ceiling_inclusive: last == Some(']'),
        };

        if let Some(ceiling) = &parsed.ceiling {
            let empty = match parsed.floor.cmp(ceiling) {
                Ordering::Greater => true,
                Ordering::Equal => !(parsed.floor_inclusive && parsed.ceiling_inclusive),
                Ordering::Less => false,
            };
            if empty {
                return Err(ProvisionError::Validation(format!(
                    "Invalid version range '{}': range is empty",
                    range
                )));
            }
        }

        Ok(parsed)
    }

    /// Whether `version` falls inside this range.
    pub fn includes(&self, version: &Version) -> bool {
        let above_floor = if self.floor_inclusive {
            version >= &self.floor
        } else {
            version > &self.floor
        };
        let below_ceiling = match &self.ceiling {
            None => true,
            Some(c) if self.ceiling_inclusive => version <= c,
            Some(c) => version < c,
        };
        above_floor && below_ceiling
    }
}

impl Default for VersionRange {
    fn default() -> Self {
        Self::any()
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ceiling {
            None => write!(f, "{}", self.floor),
            Some(c) => write!(
                f,
                "{}{},{}{}",
                if self.floor_inclusive { '[' } else { '(' },
                self.floor,
                c,
                if self.ceiling_inclusive { ']' } else { ')' }
            ),
        }
    }
}

impl Serialize for VersionRange {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// One entry of a provisioning request: `[prefix:]name[@platform]`.
///
/// # Example
///
/// ```
/// use provision_types::FeatureRequest;
///
/// let req = FeatureRequest::parse("usr:servlet@jakartaee-10.0").unwrap();
/// assert_eq!(req.repository.as_deref(), Some("usr"));
/// assert_eq!(req.name, "servlet");
/// assert_eq!(req.platform.as_deref(), Some("jakartaee-10.0"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureRequest {
    /// Repository prefix, if any
    pub repository: Option<String>,
    /// Symbolic or short name
    pub name: String,
    /// Platform qualifier for versionless features
    pub platform: Option<String>,
}

impl FeatureRequest {
    /// Parse a request string.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the name, prefix, or platform is empty.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let (rest, platform) = match raw.split_once('@') {
            Some((name, platform)) => (name, Some(platform.trim())),
            None => (raw, None),
        };
        let (repository, name) = match rest.split_once(':') {
            Some((prefix, name)) => (Some(prefix.trim()), name.trim()),
            None => (None, rest.trim()),
        };

        if name.is_empty()
            || repository.map_or(false, str::is_empty)
            || platform.map_or(false, str::is_empty)
        {
            return Err(ProvisionError::Validation(format!(
                "Invalid feature request '{}': expected [prefix:]name[@platform]",
                raw
            )));
        }

        Ok(Self {
            repository: repository.map(str::to_string),
            name: name.to_string(),
            platform: platform.map(str::to_string),
        })
    }
}

impl fmt::Display for FeatureRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.repository {
            write!(f, "{}:", prefix)?;
        }
        write!(f, "{}", self.name)?;
        if let Some(platform) = &self.platform {
            write!(f, "@{}", platform)?;
        }
        Ok(())
    }
}

impl FromStr for FeatureRequest {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_and_version_split() {
        assert_eq!(
            parse_name_and_version("com.ibm.websphere.appserver.servlet-4.0"),
            ("com.ibm.websphere.appserver.servlet", Some("4.0"))
        );
        assert_eq!(parse_name_and_version("eeCompatible-9.0"), ("eeCompatible", Some("9.0")));
        assert_eq!(parse_name_and_version("plain"), ("plain", None));
        assert_eq!(parse_name_and_version("-1.0"), ("-1.0", None));
    }

    #[test]
    fn test_version_parsing() {
        let v = Version::parse("1.2.3.qualifier").unwrap();
        assert_eq!((v.major, v.minor, v.micro), (1, 2, 3));
        assert_eq!(v.qualifier.as_deref(), Some("qualifier"));
        assert_eq!(Version::parse("7").unwrap(), Version::new(7, 0, 0));
        assert!(Version::parse("").is_err());
        assert!(Version::parse("1.x").is_err());
        assert!(Version::parse("1.0.0.").is_err());
    }

    #[test]
    fn test_version_comparison() {
        let v1 = Version::parse("1.0").unwrap();
        let v2 = Version::parse("1.0.1").unwrap();
        let v3 = Version::parse("2").unwrap();
        assert!(v1 < v2);
        assert!(v2 < v3);
        assert!(Version::parse("1.0.0").unwrap() < Version::parse("1.0.0.a").unwrap());
    }

    #[test]
    fn test_version_range() {
        let range = VersionRange::parse("[1.0,2.0)").unwrap();
        assert!(range.includes(&Version::parse("1.0").unwrap()));
        assert!(range.includes(&Version::parse("1.9.9").unwrap()));
        assert!(!range.includes(&Version::parse("2.0").unwrap()));
        assert_eq!(range.to_string(), "[1.0.0,2.0.0)");

        let open = VersionRange::parse("1.5").unwrap();
        assert!(open.includes(&Version::parse("99").unwrap()));
        assert!(!open.includes(&Version::parse("1.4").unwrap()));

        assert!(VersionRange::parse("[2.0,1.0]").is_err());
        assert!(VersionRange::parse("(1.0,1.0]").is_err());
        assert!(VersionRange::parse("[1.0").is_err());
        assert!(VersionRange::any().includes(&Version::default()));
    }

    #[test]
    fn test_feature_request() {
        let plain = FeatureRequest::parse(" servlet-4.0 ").unwrap();
        assert_eq!(plain.name, "servlet-4.0");
        assert!(plain.repository.is_none());
        assert!(plain.platform.is_none());
        assert_eq!(plain.to_string(), "servlet-4.0");

        let qualified = FeatureRequest::parse("servlet@javaee-8.0").unwrap();
        assert_eq!(qualified.platform.as_deref(), Some("javaee-8.0"));

        assert!(FeatureRequest::parse("").is_err());
        assert!(FeatureRequest::parse(":name").is_err());
        assert!(FeatureRequest::parse("name@").is_err());
    }
}
