//! Plan execution against an external bundle installer.

use crate::plan::{ActivationPlan, ArtifactInstall, BundleActivation, FeatureActivation, StartLevelGroup};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use provision_core::ProvisionConfig;
use provision_types::{ActivationType, ProvisionError, Result};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// The component that actually installs and starts things.
///
/// Implementations must be safe to call concurrently; bundles of a
/// parallel feature are started from several futures at once.
#[async_trait]
pub trait BundleInstaller: Send + Sync {
    /// Install one non-bundle artifact of `feature`.
    async fn install_artifact(&self, feature: &FeatureActivation, artifact: &ArtifactInstall) -> Result<()>;

    /// Start one bundle of `feature`.
    async fn start_bundle(&self, feature: &FeatureActivation, bundle: &BundleActivation) -> Result<()>;

    /// Called once every bundle of `feature` has started.
    async fn feature_activated(&self, _feature: &FeatureActivation) -> Result<()> {
        Ok(())
    }
}

/// Outcome of a successful [`Activator::execute`].
#[derive(Debug, Clone, Serialize)]
pub struct ActivationReport {
    /// When execution began
    pub started_at: DateTime<Utc>,
    /// Wall time spent
    pub elapsed: Duration,
    /// Bundles started, in plan order
    pub started_bundles: Vec<String>,
    /// Artifacts installed, in plan order
    pub installed_artifacts: Vec<String>,
    /// Features activated, in plan order
    pub activated_features: Vec<String>,
}

/// Drives a [`BundleInstaller`] through an [`ActivationPlan`].
pub struct Activator<I> {
    installer: I,
    max_parallel: usize,
}

impl<I: BundleInstaller> Activator<I> {
    /// Create an activator with a parallel width of 4.
    pub fn new(installer: I) -> Self {
        Self {
            installer,
            max_parallel: 4,
        }
    }

    /// Create an activator using `activation.max_parallel`.
    pub fn from_config(installer: I, config: &ProvisionConfig) -> Self {
        Self::new(installer).with_max_parallel(config.activation.max_parallel)
    }

    /// Set how many bundles of a parallel group may start at once.
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    /// The wrapped installer.
    pub fn installer(&self) -> &I {
        &self.installer
    }

    /// Execute `plan` in order.
    ///
    /// Stops at the first failing feature with
    /// [`ProvisionError::Activation`]. Bundles already started stay
    /// started.
    pub async fn execute(&self, plan: &ActivationPlan) -> Result<ActivationReport> {
        let started_at = Utc::now();
        let clock = Instant::now();
        let mut report = ActivationReport {
            started_at,
            elapsed: Duration::ZERO,
            started_bundles: Vec::with_capacity(plan.bundle_count()),
            installed_artifacts: Vec::new(),
            activated_features: Vec::with_capacity(plan.features.len()),
        };

        for feature in &plan.features {
            debug!(
                "Activating {} ({}, {} bundles)",
                feature.symbolic_name,
                feature.activation_type,
                feature.bundles().count()
            );

            for artifact in &feature.artifacts {
                self.installer
                    .install_artifact(feature, artifact)
                    .await
                    .map_err(|e| activation_error(feature, Some(&artifact.symbolic_name), e))?;
                report.installed_artifacts.push(artifact.symbolic_name.clone());
            }

            for group in &feature.groups {
                match feature.activation_type {
                    ActivationType::Sequential => self.start_sequential(feature, group, &mut report).await?,
                    ActivationType::Parallel => self.start_parallel(feature, group, &mut report).await?,
                }
            }

            self.installer
                .feature_activated(feature)
                .await
                .map_err(|e| activation_error(feature, None, e))?;
            report.activated_features.push(feature.symbolic_name.clone());
        }

        report.elapsed = clock.elapsed();
        info!(
            "Activated {} features and {} bundles in {:?}",
            report.activated_features.len(),
            report.started_bundles.len(),
            report.elapsed
        );
        Ok(report)
    }

    async fn start_sequential(
        &self,
        feature: &FeatureActivation,
        group: &StartLevelGroup,
        report: &mut ActivationReport,
    ) -> Result<()> {
        for bundle in &group.bundles {
            self.installer
                .start_bundle(feature, bundle)
                .await
                .map_err(|e| activation_error(feature, Some(&bundle.symbolic_name), e))?;
            report.started_bundles.push(bundle.symbolic_name.clone());
        }
        Ok(())
    }

    /// Start a whole group concurrently and join it. The reported failure
    /// is the first failing bundle in declaration order.
    async fn start_parallel(
        &self,
        feature: &FeatureActivation,
        group: &StartLevelGroup,
        report: &mut ActivationReport,
    ) -> Result<()> {
        let installer = &self.installer;
        let mut results: Vec<(usize, Result<()>)> = stream::iter(group.bundles.iter().enumerate())
            .map(|(index, bundle)| async move { (index, installer.start_bundle(feature, bundle).await) })
            .buffer_unordered(self.max_parallel)
            .collect()
            .await;
        results.sort_by_key(|(index, _)| *index);

        for (index, result) in results {
            let bundle = &group.bundles[index];
            result.map_err(|e| activation_error(feature, Some(&bundle.symbolic_name), e))?;
            report.started_bundles.push(bundle.symbolic_name.clone());
        }
        Ok(())
    }
}

fn activation_error(feature: &FeatureActivation, bundle: Option<&str>, error: ProvisionError) -> ProvisionError {
    let reason = match error {
        ProvisionError::Activation { reason, .. } => reason,
        other => other.to_string(),
    };
    ProvisionError::Activation {
        feature: feature.symbolic_name.clone(),
        bundle: bundle.map(str::to_string),
        reason,
    }
}
