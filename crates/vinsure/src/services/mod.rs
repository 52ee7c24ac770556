pub mod config;
pub mod evaluation;
pub mod health;
pub mod ingestion;
pub mod pipeline;
pub mod prediction;
pub mod pusher;
pub mod trainer;
pub mod types;
pub mod validation;

pub use config::{resolve_artifact_root, ConfigService};
pub use evaluation::{CandidateModel, ModelEvaluation};
pub use health::{HealthReport, HealthService};
pub use ingestion::IngestionService;
pub use pipeline::TrainingPipeline;
pub use prediction::{Prediction, PredictionService, VehicleData};
pub use pusher::ModelPusher;
pub use trainer::{TrainerService, TrainingOutput};
pub use types::{
    AppConfig, ArtifactsConfig, EvaluationResult, IngestionArtifact, PipelineOutcome,
    PromotionRecord, RemoteConfig, SourceConfig, SyntheticDataPolicy, TrainerArtifact,
    TrainingConfig, ValidationArtifact,
};
pub use validation::{ValidationReport, ValidationService};

use crate::storage::StoreError;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("artifact store unreachable: {0}")]
    StoreUnreachable(String),

    #[error("artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("failed to deserialize model artifact: {0}")]
    Deserialization(String),

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("evaluation failed: {0}")]
    EvaluationFailure(String),

    #[error("no model available: no production model could be loaded from any store")]
    NoModelAvailable,

    #[error("i/o failure at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for ServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Unreachable(msg) => ServiceError::StoreUnreachable(msg),
            StoreError::NotFound(location) => ServiceError::ArtifactNotFound(location),
            StoreError::Io { path, source } => ServiceError::Io { path, source },
        }
    }
}
