//! Error types for provisioning operations.

use thiserror::Error;

/// The main error type for provisioning operations.
///
/// Parse-time anomalies never surface here; they are resolved to safe
/// defaults where they occur. The three resolution failures
/// (`UnresolvedReference`, `SingletonConflict`, `CyclicDependency`) abort
/// a whole planning operation.
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// Configuration-related error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catalog loading or consistency error
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Malformed manifest header or capability filter
    #[error("Manifest error: {0}")]
    Manifest(String),

    /// A requested feature, or a feature it requires, has no usable definition
    #[error("Unresolved feature reference '{name}'{}: {reason}", requirer_suffix(.required_by))]
    UnresolvedReference {
        /// The name that could not be resolved
        name: String,
        /// The feature whose constituent referenced `name`, if any
        required_by: Option<String>,
        /// Human-readable explanation
        reason: String,
    },

    /// More than one member of a singleton family ended up in the resolved set
    #[error("Singleton conflict in feature family '{family}': {}", .candidates.join(", "))]
    SingletonConflict {
        /// Base symbolic name shared by the conflicting features
        family: String,
        /// The conflicting symbolic names
        candidates: Vec<String>,
    },

    /// Features transitively include themselves
    #[error("Cyclic feature dependency: {}", .cycle.join(" -> "))]
    CyclicDependency {
        /// The cycle, starting and ending with the same feature
        cycle: Vec<String>,
    },

    /// A bundle or artifact failed to activate
    #[error("Activation of feature '{feature}' failed{}: {reason}", bundle_suffix(.bundle))]
    Activation {
        /// Feature being activated
        feature: String,
        /// Bundle or artifact that failed, if the failure was not feature-wide
        bundle: Option<String>,
        /// Installer-supplied reason
        reason: String,
    },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal bug - should never happen in production
    #[error("Bug detected: {0}\n\nThis is an internal error in the provisioning resolver.")]
    Bug(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl ProvisionError {
    /// Whether this error is one of the fatal resolution failures.
    pub fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            ProvisionError::UnresolvedReference { .. }
                | ProvisionError::SingletonConflict { .. }
                | ProvisionError::CyclicDependency { .. }
        )
    }

    /// Shorthand for an unresolved reference.
    pub fn unresolved(
        name: impl Into<String>,
        required_by: Option<&str>,
        reason: impl Into<String>,
    ) -> Self {
        ProvisionError::UnresolvedReference {
            name: name.into(),
            required_by: required_by.map(str::to_string),
            reason: reason.into(),
        }
    }
}

fn requirer_suffix(required_by: &Option<String>) -> String {
    required_by
        .as_ref()
        .map(|r| format!(" (required by {})", r))
        .unwrap_or_default()
}

fn bundle_suffix(bundle: &Option<String>) -> String {
    bundle
        .as_ref()
        .map(|b| format!(" at '{}'", b))
        .unwrap_or_default()
}

/// A specialized Result type for provisioning operations.
pub type Result<T> = std::result::Result<T, ProvisionError>;

/// Helper macro to create and return a ProvisionError::Bug
///
/// This should be used for conditions that should never occur
/// in normal operation.
///
/// # Example
///
/// ```ignore
/// if some_impossible_condition {
///     bug!("This should never happen: {:?}", condition);
/// }
/// ```
#[macro_export]
macro_rules! bug {
    ($msg:expr) => {
        return Err($crate::ProvisionError::Bug($msg.to_string()))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::ProvisionError::Bug(format!($fmt, $($arg)*)))
    };
}

/// Helper macro to bail out with a ProvisionError
///
/// This is used for expected error conditions.
///
/// # Example
///
/// ```ignore
/// if clause.name.is_empty() {
///     bail!(Manifest, "Empty clause in header: {}", header);
/// }
/// ```
#[macro_export]
macro_rules! bail {
    ($variant:ident, $msg:expr) => {
        return Err($crate::ProvisionError::$variant($msg.to_string()))
    };
    ($variant:ident, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::ProvisionError::$variant(format!($fmt, $($arg)*)))
    };
    ($msg:expr) => {
        return Err($crate::ProvisionError::Other($msg.to_string()))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::ProvisionError::Other(format!($fmt, $($arg)*)))
    };
}
