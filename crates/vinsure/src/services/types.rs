use crate::model::ClassificationMetrics;
use crate::source::DataOrigin;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Project configuration stored in `.vinsure/config.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub training: TrainingConfig,
}

/// Local artifact layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    /// Artifact directory, relative to the project root unless absolute
    pub root: String,
    pub model_file: String,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            root: "artifact".to_string(),
            model_file: "model.pkl".to_string(),
        }
    }
}

/// Remote object storage. No bucket means local storage only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible stores (MinIO, LocalStack)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    pub allow_http: bool,
}

/// Document collection holding the training data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    pub database: String,
    pub collection: String,
    pub fetch_limit: i64,
    pub max_time_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            uri: None,
            database: "Proj1".to_string(),
            collection: "Proj1-Data".to_string(),
            fetch_limit: 1000,
            max_time_secs: 10,
        }
    }
}

/// Whether a pipeline may train on generated data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyntheticDataPolicy {
    #[default]
    Allow,
    Reject,
}

impl std::str::FromStr for SyntheticDataPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "allow" => Ok(SyntheticDataPolicy::Allow),
            "reject" => Ok(SyntheticDataPolicy::Reject),
            _ => Err(anyhow::anyhow!(
                "Invalid synthetic data policy: {} (expected allow or reject)",
                s
            )),
        }
    }
}

impl std::fmt::Display for SyntheticDataPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyntheticDataPolicy::Allow => write!(f, "allow"),
            SyntheticDataPolicy::Reject => write!(f, "reject"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub test_ratio: f64,
    pub seed: u64,
    pub synthetic_rows: usize,
    pub epochs: usize,
    pub learning_rate: f64,
    /// Trained models scoring below this F1 are discarded
    pub min_f1: f64,
    pub synthetic_data: SyntheticDataPolicy,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_ratio: 0.25,
            seed: 42,
            synthetic_rows: 100,
            epochs: 300,
            learning_rate: 0.05,
            min_f1: 0.0,
            synthetic_data: SyntheticDataPolicy::Allow,
        }
    }
}

/// Output of the ingestion stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionArtifact {
    pub train_path: PathBuf,
    pub test_path: PathBuf,
    pub origin: DataOrigin,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Output of the validation stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationArtifact {
    pub valid: bool,
    pub message: String,
    pub report_path: PathBuf,
}

/// Output of the trainer stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerArtifact {
    pub trained_model_path: PathBuf,
    pub metrics: ClassificationMetrics,
}

/// Comparison of a freshly trained model against the best prior one
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub trained_score: f64,
    pub best_prior_score: Option<f64>,
    pub accepted: bool,
    pub score_delta: f64,
}

impl EvaluationResult {
    /// Accept iff the trained score strictly beats the prior score (baseline 0.0)
    pub fn decide(trained_score: f64, best_prior_score: Option<f64>) -> Self {
        let baseline = best_prior_score.unwrap_or(0.0).max(0.0);
        Self {
            trained_score,
            best_prior_score,
            accepted: trained_score > baseline,
            score_delta: trained_score - baseline,
        }
    }

    /// Result used when evaluation itself fails: accept with zero delta
    pub fn accept_on_failure(trained_score: f64) -> Self {
        Self {
            trained_score,
            best_prior_score: None,
            accepted: true,
            score_delta: 0.0,
        }
    }
}

/// Where an accepted model was promoted to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionRecord {
    pub store: String,
    pub location: String,
}

/// Summary of one training pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub run_id: String,
    pub ingestion: IngestionArtifact,
    pub validation: ValidationArtifact,
    pub trainer: TrainerArtifact,
    pub evaluation: EvaluationResult,
    pub promotion: Option<PromotionRecord>,
}
