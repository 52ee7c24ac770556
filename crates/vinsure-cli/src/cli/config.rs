use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::PathBuf;
use vinsure::services::ConfigService;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Get a configuration value
    Get {
        /// Configuration key (e.g. remote.bucket)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// Configuration value
        value: String,
    },

    /// Print the effective configuration
    Show,
}

pub async fn execute(args: ConfigArgs) -> Result<()> {
    let project_root = PathBuf::from(".");
    let config_service = ConfigService::new(&project_root);

    if !config_service.exists() {
        return Err(anyhow::anyhow!(
            "vinsure not initialized. Run 'vinsure init' first."
        ));
    }

    match args.command {
        ConfigCommands::Get { key } => {
            let value = config_service.get(&key)?;
            println!("{}", value);
        },

        ConfigCommands::Set { key, value } => {
            config_service.set(&key, value.clone())?;
            println!("Set {} = {}", key, value);
        },

        ConfigCommands::Show => {
            let config = config_service.load()?;
            println!("{}", toml::to_string_pretty(&config)?);
        },
    }

    Ok(())
}
