//! Manifest header tokens and other common enumerations.
//!
//! Every token parser here is total: unrecognised input maps to an
//! explicit fallback variant instead of an error, so a raw header string
//! never travels further than the parse site.

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use crate::errors::{ProvisionError, Result};

/// Kind of constituent listed in a feature's `Subsystem-Content` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum SubsystemContentType {
    /// Nested feature (`osgi.subsystem.feature`)
    #[serde(rename = "osgi.subsystem.feature")]
    FeatureType,
    /// OSGi bundle (`osgi.bundle`)
    #[serde(rename = "osgi.bundle")]
    BundleType,
    /// Plain jar (`jar`)
    #[serde(rename = "jar")]
    JarType,
    /// Plain file (`file`)
    #[serde(rename = "file")]
    FileType,
    /// Jar placed on the boot class path (`boot.jar`)
    #[serde(rename = "boot.jar")]
    BootJarType,
    /// Checksum file (`checksum`)
    #[serde(rename = "checksum")]
    Checksum,
    /// Anything else; never provisioned
    #[serde(rename = "unknown")]
    Unknown,
}

impl SubsystemContentType {
    /// All variants that name a real content kind.
    pub const KNOWN: [SubsystemContentType; 6] = [
        SubsystemContentType::FeatureType,
        SubsystemContentType::BundleType,
        SubsystemContentType::JarType,
        SubsystemContentType::FileType,
        SubsystemContentType::BootJarType,
        SubsystemContentType::Checksum,
    ];

    /// Parse a `type=` token.
    ///
    /// Absent or blank tokens default to [`SubsystemContentType::BundleType`]
    /// since most content entries pre-date explicit typing. Unrecognised
    /// tokens yield [`SubsystemContentType::Unknown`].
    ///
    /// ```
    /// use provision_types::SubsystemContentType;
    ///
    /// assert_eq!(SubsystemContentType::parse(None), SubsystemContentType::BundleType);
    /// assert_eq!(SubsystemContentType::parse(Some(" JAR ")), SubsystemContentType::JarType);
    /// assert_eq!(SubsystemContentType::parse(Some("bogus")), SubsystemContentType::Unknown);
    /// ```
    pub fn parse(token: Option<&str>) -> Self {
        let token = match token.map(str::trim) {
            None | Some("") => return SubsystemContentType::BundleType,
            Some(t) => t.to_ascii_lowercase(),
        };
        Self::KNOWN
            .into_iter()
            .find(|t| t.token() == token)
            .unwrap_or(SubsystemContentType::Unknown)
    }

    /// The manifest token for this type.
    pub fn token(&self) -> &'static str {
        match self {
            SubsystemContentType::FeatureType => "osgi.subsystem.feature",
            SubsystemContentType::BundleType => "osgi.bundle",
            SubsystemContentType::JarType => "jar",
            SubsystemContentType::FileType => "file",
            SubsystemContentType::BootJarType => "boot.jar",
            SubsystemContentType::Checksum => "checksum",
            SubsystemContentType::Unknown => "unknown",
        }
    }

    /// Whether constituents of this type are installed as artifacts
    /// (jar, file, boot jar, checksum) rather than started or resolved.
    pub fn is_artifact(&self) -> bool {
        matches!(
            self,
            SubsystemContentType::JarType
                | SubsystemContentType::FileType
                | SubsystemContentType::BootJarType
                | SubsystemContentType::Checksum
        )
    }
}

impl FromStr for SubsystemContentType {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Infallible> {
        Ok(Self::parse(Some(s)))
    }
}

impl<'de> Deserialize<'de> for SubsystemContentType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(Self::parse(raw.as_deref()))
    }
}

impl fmt::Display for SubsystemContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// How a feature's direct bundles are started within one start level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationType {
    /// Bundles of equal start level may start concurrently
    Parallel,
    /// Bundles start one at a time in declaration order
    #[default]
    Sequential,
}

impl ActivationType {
    /// Parse an activation-type header value.
    ///
    /// Anything other than a case-insensitive `parallel` or `sequential`,
    /// including no value at all, yields [`ActivationType::Sequential`].
    pub fn parse(token: Option<&str>) -> Self {
        match token.map(|t| t.trim().to_ascii_lowercase()).as_deref() {
            Some("parallel") => ActivationType::Parallel,
            _ => ActivationType::Sequential,
        }
    }
}

impl FromStr for ActivationType {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Infallible> {
        Ok(Self::parse(Some(s)))
    }
}

impl fmt::Display for ActivationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivationType::Parallel => write!(f, "parallel"),
            ActivationType::Sequential => write!(f, "sequential"),
        }
    }
}

/// Feature visibility from the `visibility:=` directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// May be named in server configuration
    Public,
    /// Usable by product extensions
    Protected,
    /// Internal building block
    #[default]
    Private,
    /// Only used by installation tooling
    Install,
}

impl Visibility {
    /// Parse a visibility directive, defaulting to private.
    pub fn parse(token: Option<&str>) -> Self {
        match token.map(|t| t.trim().to_ascii_lowercase()).as_deref() {
            Some("public") => Visibility::Public,
            Some("protected") => Visibility::Protected,
            Some("install") => Visibility::Install,
            _ => Visibility::Private,
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Public => write!(f, "public"),
            Visibility::Protected => write!(f, "protected"),
            Visibility::Private => write!(f, "private"),
            Visibility::Install => write!(f, "install"),
        }
    }
}

/// Kind of runtime process a feature may be provisioned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessType {
    /// Application server process
    #[default]
    Server,
    /// Client container process
    Client,
}

impl ProcessType {
    /// Parse a comma-separated process type list.
    ///
    /// Unknown entries are dropped; an empty result means server only.
    pub fn parse_list(value: Option<&str>) -> Vec<ProcessType> {
        let mut types: Vec<ProcessType> = value
            .unwrap_or_default()
            .split(',')
            .filter_map(|t| t.parse().ok())
            .collect();
        types.dedup();
        if types.is_empty() {
            types.push(ProcessType::Server);
        }
        types
    }
}

impl FromStr for ProcessType {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "server" => Ok(ProcessType::Server),
            "client" => Ok(ProcessType::Client),
            _ => Err(ProvisionError::Validation(format!("Invalid process type: {}", s))),
        }
    }
}

impl fmt::Display for ProcessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessType::Server => write!(f, "server"),
            ProcessType::Client => write!(f, "client"),
        }
    }
}

/// Which bundle repository a feature definition was loaded from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum BundleRepositoryType {
    /// The core runtime
    #[default]
    Core,
    /// User extension (`usr`)
    User,
    /// Named product extension
    Product(String),
}

impl BundleRepositoryType {
    /// Parse a repository type; empty or `core` means the core runtime.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "core" => BundleRepositoryType::Core,
            "usr" | "user" => BundleRepositoryType::User,
            other => BundleRepositoryType::Product(other.to_string()),
        }
    }

    /// Name prefix used to qualify feature names from this repository,
    /// or `None` for the core runtime.
    pub fn prefix(&self) -> Option<&str> {
        match self {
            BundleRepositoryType::Core => None,
            BundleRepositoryType::User => Some("usr"),
            BundleRepositoryType::Product(name) => Some(name),
        }
    }
}

impl fmt::Display for BundleRepositoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix().unwrap_or("core"))
    }
}

impl Serialize for BundleRepositoryType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for BundleRepositoryType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// Log level enumeration for the logging system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// No logging
    None,
    /// Error messages only
    Error,
    /// Warnings and errors
    Warn,
    /// Informational messages
    Info,
    /// Debug messages
    Debug,
    /// Detailed trace messages
    Trace,
}

impl FromStr for LogLevel {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "NONE" | "OFF" => Ok(LogLevel::None),
            "ERROR" => Ok(LogLevel::Error),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "INFO" => Ok(LogLevel::Info),
            "DEBUG" => Ok(LogLevel::Debug),
            "TRACE" => Ok(LogLevel::Trace),
            _ => Err(ProvisionError::Validation(format!("Invalid log level: {}", s))),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::None => write!(f, "NONE"),
            LogLevel::Error => write!(f, "ERROR"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Trace => write!(f, "TRACE"),
        }
    }
}
