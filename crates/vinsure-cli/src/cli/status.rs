use super::project::Project;
use anyhow::Result;
use clap::Args;
use vinsure::services::HealthService;

#[derive(Args)]
pub struct StatusArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

pub async fn execute(args: StatusArgs) -> Result<()> {
    let project = Project::load()?;
    let health = HealthService::new(
        project.session(),
        project.source().await,
        project.model_file(),
    );

    let report = health.check().await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Backend: {}", report.backend);
    println!("Production models:");
    for slot in &report.production_models {
        let state = match (&slot.error, slot.present) {
            (Some(error), _) => format!("error: {}", error),
            (None, true) => "present".to_string(),
            (None, false) => "absent".to_string(),
        };
        println!("  {:<8} {:<50} {}", slot.store, slot.location, state);
    }

    let store = &report.document_store;
    let source = match (store.configured, store.reachable) {
        (false, _) => "not configured (synthetic data)".to_string(),
        (true, true) => format!("reachable ({})", store.description.as_deref().unwrap_or("")),
        (true, false) => format!(
            "unreachable: {}",
            store.error.as_deref().unwrap_or("unknown error")
        ),
    };
    println!("Document store: {}", source);

    Ok(())
}
