//! List catalog features.

use anyhow::Result;
use colored::Colorize;
use provision_catalog::FeatureRepository;
use provision_core::ProvisionConfig;
use provision_types::Visibility;

pub async fn execute(config: &ProvisionConfig, all: bool) -> Result<()> {
    let catalog = super::load_catalog(config)?;
    println!("{} feature definitions", "Listing".green().bold());

    let mut shown = 0;
    for def in catalog.features() {
        if !all && def.visibility() != Visibility::Public {
            continue;
        }
        shown += 1;

        let mut line = format!("  {} {}", def.feature_name().cyan(), def.version());
        if all {
            line.push_str(&format!(" [{}]", def.visibility()));
        }
        if def.is_versionless() {
            line.push_str(" (versionless)");
        }
        if def.is_auto_feature() {
            line.push_str(" (auto)");
        }
        if def.is_superseded() {
            line.push_str(&format!(" {}", "(superseded)".yellow()));
        }
        if !def.is_supported_feature_version() {
            line.push_str(&format!(" {}", "(unsupported)".red()));
        }
        println!("{}", line);
    }

    if shown == 0 {
        println!("  {} No features found", "!".yellow());
    }
    Ok(())
}
