use super::evaluation::{CandidateModel, ModelEvaluation};
use super::ingestion::{read_records, IngestionService};
use super::pusher::ModelPusher;
use super::trainer::TrainerService;
use super::types::{AppConfig, PipelineOutcome, SyntheticDataPolicy};
use super::validation::ValidationService;
use crate::source::{DataOrigin, DocumentSource};
use crate::storage::StoreSession;
use anyhow::{bail, Result};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Timestamped run identifier with a short random suffix, e.g. `20250101_120000-k3x9qa`
pub fn new_run_id() -> String {
    const ALPHABET: &[char] = &[
        '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'j',
        'k', 'm', 'n', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
    ];
    format!(
        "{}-{}",
        Utc::now().format("%Y%m%d_%H%M%S"),
        nanoid::nanoid!(6, ALPHABET)
    )
}

/// Runs ingestion, validation, training, evaluation and promotion in order
pub struct TrainingPipeline {
    config: AppConfig,
    artifact_root: PathBuf,
    source: Arc<DocumentSource>,
    session: Arc<StoreSession>,
}

impl TrainingPipeline {
    pub fn new(
        config: AppConfig,
        artifact_root: impl Into<PathBuf>,
        source: Arc<DocumentSource>,
        session: Arc<StoreSession>,
    ) -> Self {
        Self {
            config,
            artifact_root: artifact_root.into(),
            source,
            session,
        }
    }

    /// Run every stage. Stage outputs land under `<artifact_root>/runs/<run_id>`.
    pub async fn run(&self) -> Result<PipelineOutcome> {
        let run_id = new_run_id();
        let run_dir = self.artifact_root.join("runs").join(&run_id);
        let model_file = self.config.artifacts.model_file.as_str();
        info!(%run_id, run_dir = %run_dir.display(), "Starting training pipeline");

        let ingestion = IngestionService::new(
            self.source.clone(),
            &self.config.source,
            &self.config.training,
        )
        .ingest(&run_dir)
        .await?;
        self.check_origin(ingestion.origin)?;

        let validation = ValidationService::new().validate(&ingestion, &run_dir).await?;
        if !validation.valid {
            bail!("Data validation failed: {}", validation.message);
        }

        let training = TrainerService::new(&self.config.training, model_file)
            .train(&ingestion, &run_dir)
            .await?;

        let test_records = read_records(&ingestion.test_path).await?;
        let candidate = CandidateModel {
            model: training.model,
            reported_score: training.artifact.metrics.f1,
        };
        let evaluation = ModelEvaluation::new(self.session.clone(), model_file)
            .evaluate(&test_records, &candidate)
            .await;

        let promotion = ModelPusher::new(self.session.clone(), model_file)
            .promote(&evaluation, &training.artifact.trained_model_path)
            .await;

        info!(
            %run_id,
            accepted = evaluation.accepted,
            promoted = promotion.is_some(),
            "Training pipeline finished"
        );

        Ok(PipelineOutcome {
            run_id,
            ingestion,
            validation,
            trainer: training.artifact,
            evaluation,
            promotion,
        })
    }

    fn check_origin(&self, origin: DataOrigin) -> Result<()> {
        if origin != DataOrigin::Collection
            && self.config.training.synthetic_data == SyntheticDataPolicy::Reject
        {
            bail!(
                "Refusing to train on {} data (training.synthetic_data = reject)",
                origin
            );
        }
        Ok(())
    }
}
