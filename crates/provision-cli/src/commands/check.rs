//! Catalog consistency check.

use anyhow::{bail, Result};
use colored::Colorize;
use provision_core::ProvisionConfig;

pub async fn execute(config: &ProvisionConfig) -> Result<()> {
    let catalog = super::load_catalog(config)?;
    let issues = catalog.validate();

    if issues.is_empty() {
        println!("{} {} feature definitions, no issues", "Checked".green().bold(), catalog.len());
        return Ok(());
    }

    println!("{} {} feature definitions", "Checked".green().bold(), catalog.len());
    for issue in &issues {
        println!("  {} {}", "✗".red(), issue);
    }
    bail!("{} catalog issue(s) found", issues.len())
}
