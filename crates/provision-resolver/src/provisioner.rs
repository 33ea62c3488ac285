//! One-at-a-time provisioning cycles.

use crate::activator::{ActivationReport, Activator, BundleInstaller};
use crate::plan::ActivationPlan;
use crate::resolver::{Resolver, ResolverOptions};
use provision_catalog::Catalog;
use provision_core::{ConfiguredPlatform, ProvisionConfig};
use provision_types::{FeatureRequest, PlatformDetector, Result};
use tokio::sync::Mutex;
use tracing::info;

/// Result of one provisioning cycle.
#[derive(Debug, Clone)]
pub struct ProvisionOutcome {
    /// The resolved plan
    pub plan: ActivationPlan,
    /// Activation report, `None` when the plan matched the last applied one
    pub report: Option<ActivationReport>,
}

/// Serialises resolve and activate cycles over one catalog snapshot.
///
/// Concurrent callers queue on an async mutex, so at most one cycle is in
/// flight.
pub struct Provisioner {
    catalog: Catalog,
    platform: ConfiguredPlatform,
    options: ResolverOptions,
    max_parallel: usize,
    applied: Mutex<Option<String>>,
}

impl Provisioner {
    /// Create a provisioner with default options.
    pub fn new(catalog: Catalog, platform: ConfiguredPlatform) -> Self {
        Self {
            catalog,
            platform,
            options: ResolverOptions::default(),
            max_parallel: 4,
            applied: Mutex::new(None),
        }
    }

    /// Create a provisioner from configuration.
    pub fn from_config(catalog: Catalog, config: &ProvisionConfig) -> Self {
        Self {
            options: ResolverOptions::from_config(config),
            max_parallel: config.activation.max_parallel,
            ..Self::new(catalog, ConfiguredPlatform::from_config(config))
        }
    }

    /// Replace the platform facts.
    pub fn with_platform(mut self, platform: ConfiguredPlatform) -> Self {
        self.platform = platform;
        self
    }

    /// The catalog snapshot.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Resolve `requests` for the configured process type without
    /// activating anything.
    pub fn plan(&self, requests: &[FeatureRequest]) -> Result<ActivationPlan> {
        let visible = self.catalog.restricted_to(self.platform.process_type());
        Resolver::new(&visible, &self.platform)
            .with_options(self.options.clone())
            .resolve(requests)
    }

    /// Resolve and, unless nothing changed since the last successful
    /// cycle, activate through `installer`.
    pub async fn provision<I: BundleInstaller>(
        &self,
        requests: &[FeatureRequest],
        installer: I,
    ) -> Result<ProvisionOutcome> {
        let mut applied = self.applied.lock().await;
        let plan = self.plan(requests)?;
        let fingerprint = plan.fingerprint();

        if applied.as_deref() == Some(fingerprint.as_str()) {
            info!("Plan {} already applied; nothing to activate", &fingerprint[..12]);
            return Ok(ProvisionOutcome { plan, report: None });
        }

        let report = Activator::new(installer)
            .with_max_parallel(self.max_parallel)
            .execute(&plan)
            .await?;
        *applied = Some(fingerprint);
        Ok(ProvisionOutcome {
            plan,
            report: Some(report),
        })
    }

    /// Fingerprint of the last activated plan.
    pub async fn applied_fingerprint(&self) -> Option<String> {
        self.applied.lock().await.clone()
    }
}
