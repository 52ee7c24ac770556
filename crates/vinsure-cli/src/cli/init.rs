use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use vinsure::services::{resolve_artifact_root, ConfigService};

#[derive(Args)]
pub struct InitArgs {
    /// Remote bucket for model artifacts (local storage only when omitted)
    #[arg(long)]
    bucket: Option<String>,

    /// MongoDB connection string for the training data
    #[arg(long)]
    mongodb_uri: Option<String>,

    /// Project root directory
    #[arg(default_value = ".")]
    path: PathBuf,
}

pub async fn execute(args: InitArgs) -> Result<()> {
    let project_root = args.path;
    let config_service = ConfigService::new(&project_root);

    let mut config = config_service.init()?;
    if args.bucket.is_some() || args.mongodb_uri.is_some() {
        config.remote.bucket = args.bucket;
        config.source.uri = args.mongodb_uri;
        config_service.save(&config)?;
    }

    let artifact_root = resolve_artifact_root(&config, &project_root);
    tokio::fs::create_dir_all(&artifact_root).await?;

    println!("Initialized vinsure project at {}", project_root.display());
    println!("  Artifacts: {}", artifact_root.display());
    println!(
        "  Remote: {}",
        config.remote.bucket.as_deref().unwrap_or("(local only)")
    );
    println!(
        "  Source: {}",
        if config.source.uri.is_some() {
            "mongodb"
        } else {
            "(synthetic data)"
        }
    );

    Ok(())
}
