mod config;
mod fetch;
mod init;
mod predict;
mod project;
mod status;
mod train;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "vinsure")]
#[command(about = "Train and serve the vehicle-insurance interest model", long_about = None)]
pub struct Cli {
    /// Enable verbose output (info logs)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new project
    Init(init::InitArgs),

    /// Run the training pipeline and promote the model if it improves
    Train(train::TrainArgs),

    /// Predict interest for one customer
    Predict(predict::PredictArgs),

    /// Show storage backend, production models and document store state
    Status(status::StatusArgs),

    /// Export the training dataset as JSON
    Fetch(fetch::FetchArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

/// Execute the CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init(args) => init::execute(args).await,
        Commands::Train(args) => train::execute(args).await,
        Commands::Predict(args) => predict::execute(args).await,
        Commands::Status(args) => status::execute(args).await,
        Commands::Fetch(args) => fetch::execute(args).await,
        Commands::Config(args) => config::execute(args).await,
    }
}
