//! Provision CLI entry point.

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use provision_core::log::{self, LogGuard};
use provision_core::ProvisionConfig;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod ui;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match run(&cli).await {
        Ok(_) => Ok(()),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let config = cli.load_config()?;
    let _guard = init_logging(cli, &config)?;
    cli.execute(&config).await
}

/// Verbosity flags win over configured log outputs.
fn init_logging(cli: &Cli, config: &ProvisionConfig) -> Result<Option<LogGuard>> {
    let directive = if cli.quiet {
        Some("error")
    } else if cli.debug {
        Some("provision=trace")
    } else if cli.verbose {
        Some("provision=debug")
    } else {
        None
    };

    match directive {
        Some(directive) => {
            log::init_with_filter(EnvFilter::new(directive))?;
            Ok(None)
        }
        None => Ok(Some(log::init_from_config(&config.logs)?)),
    }
}
