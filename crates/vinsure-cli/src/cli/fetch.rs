use super::project::Project;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct FetchArgs {
    /// Collection name (defaults to source.collection)
    #[arg(long)]
    collection: Option<String>,

    /// Database name (defaults to source.database)
    #[arg(long)]
    database: Option<String>,

    /// Write records to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub async fn execute(args: FetchArgs) -> Result<()> {
    let project = Project::load()?;
    let source = project.source().await;
    let collection = args
        .collection
        .as_deref()
        .unwrap_or(&project.config.source.collection);

    let dataset = source.fetch(collection, args.database.as_deref()).await;
    let json = serde_json::to_string_pretty(&dataset.records)?;

    match args.output {
        Some(path) => {
            tokio::fs::write(&path, json)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!(
                "Wrote {} {} records to {}",
                dataset.len(),
                dataset.origin,
                path.display()
            );
        },
        None => println!("{}", json),
    }

    Ok(())
}
