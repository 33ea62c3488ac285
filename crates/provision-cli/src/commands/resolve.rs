//! Resolve features and print the plan.

use anyhow::{Context, Result};
use colored::Colorize;
use provision_resolver::{ActivationPlan, ActivationReason, Provisioner};
use provision_core::ProvisionConfig;

pub async fn execute(config: &ProvisionConfig, features: &[String], platforms: &[String], json: bool) -> Result<()> {
    let catalog = super::load_catalog(config)?;
    let requests = super::parse_requests(features)?;
    let provisioner = Provisioner::from_config(catalog, config).with_platform(super::platform(config, platforms));

    let plan = provisioner.plan(&requests).context("Resolution failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print_plan(&plan);
    }
    Ok(())
}

/// Human-readable plan.
pub(crate) fn print_plan(plan: &ActivationPlan) {
    println!(
        "{} {} features ({} bundles)",
        "Resolved".green().bold(),
        plan.features.len(),
        plan.bundle_count()
    );

    for request in &plan.requests {
        if !request.request.eq_ignore_ascii_case(&request.feature) {
            println!("  {} -> {}", request.request, request.feature.cyan());
        }
    }

    if !plan.is_empty() {
        println!("\n{}:", "Activation order".green().bold());
    }
    for (index, feature) in plan.features.iter().enumerate() {
        let why = match &feature.reason {
            ActivationReason::Requested { .. } => "requested".to_string(),
            ActivationReason::Included { by } => format!("included by {}", by),
            ActivationReason::Auto { triggered_by } => format!("auto, triggered by {}", triggered_by.join(", ")),
        };
        println!(
            "  {:>3}. {} {} [{}] ({})",
            index + 1,
            feature.feature_name.cyan().bold(),
            feature.version,
            feature.activation_type,
            why
        );
        for artifact in &feature.artifacts {
            println!("         install {} ({})", artifact.location, artifact.content_type.token());
        }
        for group in &feature.groups {
            let names: Vec<&str> = group.bundles.iter().map(|b| b.symbolic_name.as_str()).collect();
            println!("         @{:<4} {}", group.start_level, names.join(", "));
        }
    }

    if !plan.warnings.is_empty() {
        println!("\n{}:", "Warnings".yellow().bold());
        for warning in &plan.warnings {
            println!("  {} {}", "!".yellow(), warning);
        }
    }

    println!("\nFingerprint: {}", plan.fingerprint().dimmed());
}
