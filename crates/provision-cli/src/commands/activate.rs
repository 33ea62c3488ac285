//! Resolve and execute a plan with a dry-run installer.

use crate::ui::progress;
use anyhow::{Context, Result};
use async_trait::async_trait;
use colored::Colorize;
use indicatif::ProgressBar;
use provision_core::ProvisionConfig;
use provision_resolver::{Activator, ArtifactInstall, BundleActivation, BundleInstaller, FeatureActivation, Provisioner};
use tracing::info;

/// Logs every step instead of touching a runtime.
struct DryRunInstaller {
    bar: ProgressBar,
}

#[async_trait]
impl BundleInstaller for DryRunInstaller {
    async fn install_artifact(&self, feature: &FeatureActivation, artifact: &ArtifactInstall) -> provision_types::Result<()> {
        info!(
            "[dry-run] install {} ({}) for {}",
            artifact.location,
            artifact.content_type.token(),
            feature.symbolic_name
        );
        Ok(())
    }

    async fn start_bundle(&self, feature: &FeatureActivation, bundle: &BundleActivation) -> provision_types::Result<()> {
        info!(
            "[dry-run] start {} {} at level {} for {}",
            bundle.symbolic_name, bundle.version_range, bundle.start_level, feature.symbolic_name
        );
        self.bar.set_message(bundle.symbolic_name.clone());
        self.bar.inc(1);
        Ok(())
    }

    async fn feature_activated(&self, feature: &FeatureActivation) -> provision_types::Result<()> {
        self.bar.println(format!("  {} {}", "✓".green(), feature.feature_name));
        Ok(())
    }
}

pub async fn execute(config: &ProvisionConfig, features: &[String], platforms: &[String]) -> Result<()> {
    let catalog = super::load_catalog(config)?;
    let requests = super::parse_requests(features)?;
    let provisioner = Provisioner::from_config(catalog, config).with_platform(super::platform(config, platforms));

    let plan = provisioner.plan(&requests).context("Resolution failed")?;
    for warning in &plan.warnings {
        println!("  {} {}", "!".yellow(), warning);
    }

    println!("{} {} features (dry run)", "Activating".green().bold(), plan.features.len());
    let bar = progress::bar(plan.bundle_count() as u64, "starting bundles");
    let activator = Activator::from_config(DryRunInstaller { bar: bar.clone() }, config);
    let report = activator.execute(&plan).await;
    bar.finish_and_clear();
    let report = report.context("Activation failed")?;

    println!(
        "{} {} features, {} bundles, {} artifacts in {:.2?}",
        "Activated".green().bold(),
        report.activated_features.len(),
        report.started_bundles.len(),
        report.installed_artifacts.len(),
        report.elapsed
    );
    Ok(())
}
