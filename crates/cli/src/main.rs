//! RevenueCast CLI
//!
//! A command-line tool for querying the revenue prediction service and
//! computing offline closed-form estimates.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{estimate, history, model, predict, CompanyArgs};
use std::path::PathBuf;

/// RevenueCast CLI
#[derive(Parser)]
#[command(name = "revcast")]
#[command(author, version, about = "CLI for the RevenueCast revenue predictor", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via REVCAST_API_URL env var)
    #[arg(long, env = "REVCAST_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, global = true)]
    pub format: Option<output::OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show service health
    Health,

    /// Show metadata of the active model
    ModelInfo,

    /// Predict revenue for one company
    Predict {
        #[command(flatten)]
        company: CompanyArgs,
    },

    /// Predict revenue for every company in a JSON file
    Batch {
        /// File holding {"companies": [...]} or a bare array
        file: PathBuf,

        /// Report an outcome per company instead of aborting at the first failure
        #[arg(long)]
        partial: bool,
    },

    /// Manage saved predictions
    History {
        #[command(subcommand)]
        command: history::HistoryCommands,
    },

    /// Compute the closed-form estimate locally, without the service
    Estimate {
        #[command(flatten)]
        company: CompanyArgs,

        /// Seed for reproducible noise
        #[arg(long)]
        seed: Option<u64>,

        /// Disable the noise term
        #[arg(long)]
        no_noise: bool,

        /// Standard deviation of the noise term
        #[arg(long, default_value_t = predictor_lib::estimator::DEFAULT_NOISE_STD_DEV)]
        noise_std_dev: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::Config::load()?;
    let format = config.resolve_format(cli.format)?;

    // Offline command needs no client
    if let Commands::Estimate {
        company,
        seed,
        no_noise,
        noise_std_dev,
    } = &cli.command
    {
        let noise = estimate::NoiseOptions {
            std_dev: *noise_std_dev,
            seed: *seed,
            disabled: *no_noise,
        };
        return estimate::estimate(company, noise, format);
    }

    // Initialize client
    let client = client::ApiClient::new(&config.resolve_api_url(cli.api_url))?;

    // Execute command
    match cli.command {
        Commands::Health => model::show_health(&client, format).await?,
        Commands::ModelInfo => model::show_model_info(&client, format).await?,
        Commands::Predict { company } => predict::predict(&client, &company, format).await?,
        Commands::Batch { file, partial } => {
            predict::batch(&client, &file, partial, format).await?
        }
        Commands::History { command } => history::run(&client, command, format).await?,
        Commands::Estimate { .. } => {}
    }

    Ok(())
}
