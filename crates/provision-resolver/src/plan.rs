//! Activation plans: the immutable output of a resolve.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use provision_types::{
    ActivationType, BundleRepositoryType, ProcessType, SubsystemContentType, Version, VersionRange,
};

/// One bundle to start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleActivation {
    /// Bundle symbolic name
    pub symbolic_name: String,
    /// Install location
    pub location: String,
    /// Accepted versions
    pub version_range: VersionRange,
    /// Effective start level
    pub start_level: u32,
}

/// One non-bundle artifact (jar, file, boot jar, checksum) to install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactInstall {
    /// Artifact symbolic name
    pub symbolic_name: String,
    /// Artifact kind
    pub content_type: SubsystemContentType,
    /// Install location
    pub location: String,
    /// Accepted versions
    pub version_range: VersionRange,
}

/// Bundles of one feature that share a start level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartLevelGroup {
    /// Start level
    pub start_level: u32,
    /// Bundles in declaration order
    pub bundles: Vec<BundleActivation>,
}

/// Why a feature is part of the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ActivationReason {
    /// Named by a request.
    Requested {
        /// The request as written
        request: String,
    },
    /// Included by another feature.
    Included {
        /// First feature that included it
        by: String,
    },
    /// Auto-feature whose capability became satisfied.
    Auto {
        /// Features that satisfied the capability
        triggered_by: Vec<String>,
    },
}

/// Everything needed to activate one feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureActivation {
    /// Symbolic name
    pub symbolic_name: String,
    /// User-facing name
    pub feature_name: String,
    /// Feature version
    pub version: Version,
    /// Originating repository
    pub repository: BundleRepositoryType,
    /// Bundle activation policy
    pub activation_type: ActivationType,
    /// Why it is activated
    pub reason: ActivationReason,
    /// Artifacts installed before any bundle starts
    pub artifacts: Vec<ArtifactInstall>,
    /// Bundle groups in ascending start level
    pub groups: Vec<StartLevelGroup>,
}

impl FeatureActivation {
    /// All bundles in activation order.
    pub fn bundles(&self) -> impl Iterator<Item = &BundleActivation> + '_ {
        self.groups.iter().flat_map(|g| g.bundles.iter())
    }
}

/// A request and the definition it resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedRequest {
    /// Request as written
    pub request: String,
    /// Selected symbolic name
    pub feature: String,
}

/// A non-fatal condition noticed while resolving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolutionWarning {
    /// Catalog entry with a manifest format level this runtime does not
    /// understand; never a candidate.
    UnsupportedVersion {
        /// Feature
        feature: String,
        /// Declared `IBM-Feature-Version`
        feature_version: u32,
    },
    /// Constituent with an unrecognised type; not provisioned.
    UnknownContentType {
        /// Declaring feature
        feature: String,
        /// Constituent
        entry: String,
        /// Token as written
        raw_type: Option<String>,
    },
    /// A non-public feature was requested by name.
    NonPublicRoot {
        /// Feature
        feature: String,
        /// Its visibility
        visibility: String,
    },
    /// A superseded feature was requested by name.
    Superseded {
        /// Feature
        feature: String,
        /// Replacements
        superseded_by: Vec<String>,
    },
    /// A request named a feature hidden from this process type.
    RestrictedAccess {
        /// Request
        feature: String,
        /// Running process type
        process_type: ProcessType,
    },
    /// Constituent requiring a newer Java level; skipped.
    RequiresNewerJava {
        /// Declaring feature
        feature: String,
        /// Constituent
        entry: String,
        /// Minimum Java level
        required: u32,
        /// Runtime Java level
        runtime: u32,
    },
    /// Optional nested feature with no usable definition; skipped.
    OptionalMissing {
        /// Declaring feature
        feature: String,
        /// Constituent
        entry: String,
    },
}

impl fmt::Display for ResolutionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionWarning::UnsupportedVersion { feature, feature_version } => write!(
                f,
                "{} declares unsupported IBM-Feature-Version {} and was ignored",
                feature, feature_version
            ),
            ResolutionWarning::UnknownContentType { feature, entry, raw_type } => write!(
                f,
                "{}: constituent '{}' has unknown type '{}' and was not provisioned",
                feature,
                entry,
                raw_type.as_deref().unwrap_or("?")
            ),
            ResolutionWarning::NonPublicRoot { feature, visibility } => {
                write!(f, "{} is {} and should not be requested directly", feature, visibility)
            }
            ResolutionWarning::Superseded { feature, superseded_by } if superseded_by.is_empty() => {
                write!(f, "{} is superseded", feature)
            }
            ResolutionWarning::Superseded { feature, superseded_by } => {
                write!(f, "{} is superseded by {}", feature, superseded_by.join(", "))
            }
            ResolutionWarning::RestrictedAccess { feature, process_type } => {
                write!(f, "{} is not available to {} processes", feature, process_type)
            }
            ResolutionWarning::RequiresNewerJava { feature, entry, required, runtime } => write!(
                f,
                "{}: constituent '{}' requires Java {} (runtime is {}) and was skipped",
                feature, entry, required, runtime
            ),
            ResolutionWarning::OptionalMissing { feature, entry } => {
                write!(f, "{}: optional feature '{}' is not available", feature, entry)
            }
        }
    }
}

/// One unit of work for the activator, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum ActivationStep {
    /// Start one bundle of a feature.
    Bundle {
        /// Owning feature
        feature: String,
        /// Bundle symbolic name
        bundle: String,
        /// Start level
        start_level: u32,
    },
    /// Mark a feature active once its bundles are started.
    Feature {
        /// Feature symbolic name
        feature: String,
    },
}

impl fmt::Display for ActivationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivationStep::Bundle { feature, bundle, start_level } => {
                write!(f, "bundle {} @{} ({})", bundle, start_level, feature)
            }
            ActivationStep::Feature { feature } => write!(f, "feature {}", feature),
        }
    }
}

/// The ordered result of a successful resolve.
///
/// Features appear with dependencies before dependents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivationPlan {
    /// How each request was resolved
    pub requests: Vec<ResolvedRequest>,
    /// Features in activation order
    pub features: Vec<FeatureActivation>,
    /// Non-fatal findings
    pub warnings: Vec<ResolutionWarning>,
}

impl ActivationPlan {
    /// Symbolic names in activation order.
    pub fn resolved_features(&self) -> Vec<&str> {
        self.features.iter().map(|f| f.symbolic_name.as_str()).collect()
    }

    /// Look up a planned feature.
    pub fn feature(&self, symbolic_name: &str) -> Option<&FeatureActivation> {
        self.features
            .iter()
            .find(|f| f.symbolic_name.eq_ignore_ascii_case(symbolic_name))
    }

    /// Whether nothing is activated.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Total number of bundles to start.
    pub fn bundle_count(&self) -> usize {
        self.features.iter().map(|f| f.bundles().count()).sum()
    }

    /// Flatten to steps: each feature's bundles by start level, then the
    /// feature itself.
    pub fn steps(&self) -> Vec<ActivationStep> {
        let mut steps = Vec::with_capacity(self.features.len() + self.bundle_count());
        for feature in &self.features {
            for bundle in feature.bundles() {
                steps.push(ActivationStep::Bundle {
                    feature: feature.symbolic_name.clone(),
                    bundle: bundle.symbolic_name.clone(),
                    start_level: bundle.start_level,
                });
            }
            steps.push(ActivationStep::Feature {
                feature: feature.symbolic_name.clone(),
            });
        }
        steps
    }

    /// SHA-256 over the ordered work, hex encoded.
    ///
    /// Covers every artifact and bundle with its location and version
    /// range, plus each feature's activation policy, so two plans share a
    /// fingerprint exactly when activating them does the same work in the
    /// same order.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        let mut line = |text: String| {
            hasher.update(text.as_bytes());
            hasher.update(b"\n");
        };
        for feature in &self.features {
            for artifact in &feature.artifacts {
                line(format!(
                    "artifact {} {} {};{}",
                    artifact.symbolic_name, artifact.content_type, artifact.location, artifact.version_range
                ));
            }
            for bundle in feature.bundles() {
                line(format!(
                    "bundle {} @{} {};{}",
                    bundle.symbolic_name, bundle.start_level, bundle.location, bundle.version_range
                ));
            }
            line(format!("feature {} {}", feature.symbolic_name, feature.activation_type));
        }
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(name: &str, level: u32) -> BundleActivation {
        BundleActivation {
            symbolic_name: name.to_string(),
            location: name.to_string(),
            version_range: VersionRange::any(),
            start_level: level,
        }
    }

    fn feature(name: &str, groups: Vec<StartLevelGroup>) -> FeatureActivation {
        FeatureActivation {
            symbolic_name: name.to_string(),
            feature_name: name.to_string(),
            version: Version::new(1, 0, 0),
            repository: BundleRepositoryType::Core,
            activation_type: ActivationType::Sequential,
            reason: ActivationReason::Requested { request: name.to_string() },
            artifacts: Vec::new(),
            groups,
        }
    }

    fn plan() -> ActivationPlan {
        ActivationPlan {
            requests: Vec::new(),
            features: vec![
                feature("dep", Vec::new()),
                feature(
                    "top",
                    vec![
                        StartLevelGroup { start_level: 10, bundles: vec![bundle("b1", 10)] },
                        StartLevelGroup { start_level: 20, bundles: vec![bundle("b2", 20), bundle("b3", 20)] },
                    ],
                ),
            ],
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_steps_order() {
        let steps: Vec<String> = plan().steps().iter().map(ToString::to_string).collect();
        assert_eq!(
            steps,
            vec![
                "feature dep",
                "bundle b1 @10 (top)",
                "bundle b2 @20 (top)",
                "bundle b3 @20 (top)",
                "feature top",
            ]
        );
    }

    #[test]
    fn test_fingerprint_tracks_order() {
        let a = plan();
        assert_eq!(a.fingerprint(), plan().fingerprint());
        assert_eq!(a.fingerprint().len(), 64);

        let mut b = plan();
        b.features.reverse();
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_covers_locations_ranges_and_artifacts() {
        let base = plan().fingerprint();

        let mut moved = plan();
        moved.features[1].groups[0].bundles[0].location = "lib/elsewhere.jar".to_string();
        assert_ne!(moved.fingerprint(), base);

        let mut narrowed = plan();
        narrowed.features[1].groups[0].bundles[0].version_range = VersionRange::parse("[2.0,3.0)").unwrap();
        assert_ne!(narrowed.fingerprint(), base);

        let mut with_jar = plan();
        with_jar.features[1].artifacts.push(ArtifactInstall {
            symbolic_name: "api.jar".to_string(),
            content_type: SubsystemContentType::JarType,
            location: "dev/api/api.jar".to_string(),
            version_range: VersionRange::any(),
        });
        assert_ne!(with_jar.fingerprint(), base);
        assert_eq!(with_jar.fingerprint(), with_jar.clone().fingerprint());
    }

    #[test]
    fn test_queries() {
        let p = plan();
        assert_eq!(p.resolved_features(), vec!["dep", "top"]);
        assert_eq!(p.bundle_count(), 3);
        assert!(p.feature("TOP").is_some());
        assert!(!p.is_empty());
        assert!(ActivationPlan::default().is_empty());
    }

    #[test]
    fn test_plan_serializes_to_json() {
        let json = serde_json::to_value(plan()).unwrap();
        assert_eq!(json["features"][1]["groups"][0]["start_level"], 10);
        assert_eq!(json["features"][0]["reason"]["reason"], "requested");
        assert_eq!(json["features"][0]["activation_type"], "sequential");

        let warning = serde_json::to_value(ResolutionWarning::OptionalMissing {
            feature: "a".into(),
            entry: "b".into(),
        })
        .unwrap();
        assert_eq!(warning["kind"], "optional_missing");
    }
}
