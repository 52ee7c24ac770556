use super::project::Project;
use anyhow::Result;
use clap::Args;
use vinsure::services::TrainingPipeline;

#[derive(Args)]
pub struct TrainArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

pub async fn execute(args: TrainArgs) -> Result<()> {
    let project = Project::load()?;
    let pipeline = TrainingPipeline::new(
        project.config.clone(),
        &project.artifact_root,
        project.source().await,
        project.session(),
    );

    let outcome = pipeline.run().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    let evaluation = &outcome.evaluation;
    println!("Run {}", outcome.run_id);
    println!(
        "  Data: {} ({} train / {} test rows)",
        outcome.ingestion.origin, outcome.ingestion.train_rows, outcome.ingestion.test_rows
    );
    println!("  F1: {:.4}", evaluation.trained_score);
    match evaluation.best_prior_score {
        Some(prior) => println!("  Prior F1: {:.4}", prior),
        None => println!("  Prior F1: (none)"),
    }
    println!("  Delta: {:+.4}", evaluation.score_delta);
    match &outcome.promotion {
        Some(record) => println!("Promoted to {}", record.location),
        None => println!("Not promoted"),
    }

    Ok(())
}
