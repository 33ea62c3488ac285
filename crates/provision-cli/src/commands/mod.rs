//! CLI command implementations.

pub mod activate;
pub mod check;
pub mod info;
pub mod list;
pub mod resolve;

use anyhow::{bail, Context, Result};
use provision_catalog::Catalog;
use provision_core::{ConfiguredPlatform, ProvisionConfig};
use provision_types::FeatureRequest;

/// Load every configured repository into one catalog.
pub(crate) fn load_catalog(config: &ProvisionConfig) -> Result<Catalog> {
    if config.repositories.is_empty() {
        bail!("No feature repositories configured; add `repositories` to the config file or pass --repository DIR");
    }
    Catalog::load(&config.repositories).context("Failed to load feature catalog")
}

pub(crate) fn parse_requests(names: &[String]) -> Result<Vec<FeatureRequest>> {
    names
        .iter()
        .map(|name| FeatureRequest::parse(name).with_context(|| format!("Invalid feature request '{}'", name)))
        .collect()
}

/// Configured platform plus `--platform` flags.
pub(crate) fn platform(config: &ProvisionConfig, extra: &[String]) -> ConfiguredPlatform {
    ConfiguredPlatform::from_config(config).with_platforms(extra.iter().cloned())
}
