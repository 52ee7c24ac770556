use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use vinsure::services::{
    resolve_artifact_root, AppConfig, ConfigService, HealthService, PredictionService,
    TrainingPipeline,
};
use vinsure::source::DocumentSource;
use vinsure::storage::StoreSession;

#[derive(Clone)]
pub struct AppState {
    pub prediction: Arc<PredictionService>,
    pub health: Arc<HealthService>,
    pub pipeline: Arc<TrainingPipeline>,
    /// Held for the duration of a training run
    pub training: Arc<Mutex<()>>,
}

impl AppState {
    /// Load configuration from `<project>/.vinsure/config.toml` and `VINSURE_*`
    /// variables. The project root is `VINSURE_PROJECT_ROOT` or the working directory.
    pub async fn from_env() -> Result<Self> {
        let project_root = match std::env::var("VINSURE_PROJECT_ROOT") {
            Ok(root) => PathBuf::from(root),
            Err(_) => std::env::current_dir().context("Failed to resolve working directory")?,
        };
        let config = ConfigService::new(&project_root).load()?;
        let artifact_root = resolve_artifact_root(&config, &project_root);

        let session = Arc::new(StoreSession::from_config(&config.remote, &artifact_root));
        let source =
            Arc::new(DocumentSource::from_config(&config.source, &config.training).await);

        tracing::info!(
            artifact_root = %artifact_root.display(),
            backend = %session.backend().await,
            "Prediction service ready"
        );

        Ok(Self::new(config, artifact_root, source, session))
    }

    pub fn new(
        config: AppConfig,
        artifact_root: impl Into<PathBuf>,
        source: Arc<DocumentSource>,
        session: Arc<StoreSession>,
    ) -> Self {
        let model_file = config.artifacts.model_file.clone();
        let prediction = Arc::new(PredictionService::new(session.clone(), &model_file));
        let health = Arc::new(HealthService::new(
            session.clone(),
            source.clone(),
            &model_file,
        ));
        let pipeline = Arc::new(TrainingPipeline::new(
            config,
            artifact_root,
            source,
            session,
        ));

        Self {
            prediction,
            health,
            pipeline,
            training: Arc::new(Mutex::new(())),
        }
    }
}
