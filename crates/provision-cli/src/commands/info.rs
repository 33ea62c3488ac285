//! Show one feature definition.

use anyhow::{anyhow, Result};
use colored::Colorize;
use provision_catalog::{FeatureRepository, ProvisionCapability};
use provision_core::ProvisionConfig;
use provision_types::FeatureRequest;

pub async fn execute(config: &ProvisionConfig, name: &str) -> Result<()> {
    let catalog = super::load_catalog(config)?;
    let request = FeatureRequest::parse(name)?;
    let def = catalog
        .lookup(&request)
        .ok_or_else(|| anyhow!("No feature named '{}'", name))?;

    println!("\n{}", "Feature Information".cyan().bold());
    println!("{}", "=".repeat(50));

    println!("\n{}:", "General".green().bold());
    println!("  Symbolic Name: {}", def.symbolic_name().cyan());
    if let Some(short) = def.short_name() {
        println!("  Short Name: {}", short);
    }
    println!("  Version: {}", def.version());
    println!("  Feature Version: {}", def.ibm_feature_version());
    println!("  Visibility: {}", def.visibility());
    println!("  Kind: {:?}", def.kind());
    println!("  Singleton: {}", def.is_singleton());
    println!("  Activation: {}", def.activation_type());
    let process_types: Vec<String> = def.process_types().iter().map(ToString::to_string).collect();
    println!("  Process Types: {}", process_types.join(", "));
    println!("  Repository: {}", def.bundle_repository_type());
    if let Some(source) = def.source() {
        println!("  Source: {:?}", source);
    }

    if !def.platforms().is_empty() {
        println!("  Platforms: {}", def.platforms().join(", "));
    }
    if def.is_superseded() {
        println!("  Superseded By: {}", def.superseded_by().join(", ").yellow());
    }

    match def.capability() {
        Some(ProvisionCapability::Filters(filters)) => {
            println!("\n{}:", "Auto-feature Capability".green().bold());
            for filter in filters {
                println!("  {}", filter);
            }
        }
        Some(ProvisionCapability::Invalid { reason, .. }) => {
            println!("\n{}:", "Auto-feature Capability".green().bold());
            println!("  {} invalid: {}", "!".red(), reason);
        }
        None => {}
    }

    let constituents: Vec<_> = def.constituents(None).collect();
    if !constituents.is_empty() {
        println!("\n{}:", "Constituents".green().bold());
    }
    for resource in constituents {
        let mut line = format!("  • {} {} ({})", resource.symbolic_name(), resource.version_range(), resource.content_type());
        if let Some(level) = resource.start_level() {
            line.push_str(&format!(" start-level={}", level));
        }
        if let Some(os) = resource.os_list() {
            line.push_str(&format!(" os={}", os.join(",")));
        }
        if !resource.tolerates().is_empty() {
            line.push_str(&format!(" tolerates={}", resource.tolerates().join(",")));
        }
        if let Some(java) = resource.require_java() {
            line.push_str(&format!(" require-java={}", java));
        }
        if resource.is_optional() {
            line.push_str(" optional");
        }
        println!("{}", line);
    }

    Ok(())
}
