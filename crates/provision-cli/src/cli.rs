//! CLI structure and command definitions.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use provision_core::ProvisionConfig;
use provision_types::config::RepositoryConfig;
use provision_types::BundleRepositoryType;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "provision")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Feature resolver and activation planner", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (default: ~/.provision/config)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Additional core feature directory, may be repeated
    #[arg(short = 'r', long = "repository", global = true)]
    pub repositories: Vec<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve features into an activation plan
    Resolve {
        /// Feature names, optionally `prefix:name` or `name@platform`
        #[arg(required = true)]
        features: Vec<String>,

        /// Active platform, may be repeated
        #[arg(short, long = "platform")]
        platforms: Vec<String>,

        /// Print the plan as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Resolve and run the plan against a dry-run installer
    Activate {
        /// Feature names
        #[arg(required = true)]
        features: Vec<String>,

        /// Active platform, may be repeated
        #[arg(short, long = "platform")]
        platforms: Vec<String>,
    },

    /// List catalog features
    List {
        /// Include non-public features
        #[arg(short, long)]
        all: bool,
    },

    /// Show one feature definition
    Info {
        /// Feature name
        feature: String,
    },

    /// Check the catalog for inconsistencies
    Check,
}

impl Cli {
    /// Load the configuration file and add `--repository` directories.
    pub fn load_config(&self) -> Result<ProvisionConfig> {
        let path = match &self.config {
            Some(path) => path.clone(),
            None => ProvisionConfig::default_path()?,
        };
        let mut config = ProvisionConfig::load(&path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?;

        config
            .repositories
            .extend(self.repositories.iter().map(|path| RepositoryConfig {
                repository: BundleRepositoryType::Core,
                path: path.clone(),
            }));
        Ok(config)
    }

    pub async fn execute(&self, config: &ProvisionConfig) -> Result<()> {
        use crate::commands::*;

        match &self.command {
            Commands::Resolve { features, platforms, json } => {
                resolve::execute(config, features, platforms, *json).await
            }
            Commands::Activate { features, platforms } => {
                activate::execute(config, features, platforms).await
            }
            Commands::List { all } => {
                list::execute(config, *all).await
            }
            Commands::Info { feature } => {
                info::execute(config, feature).await
            }
            Commands::Check => {
                check::execute(config).await
            }
        }
    }
}
