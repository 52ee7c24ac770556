use super::ingestion::read_records;
use super::types::{IngestionArtifact, TrainerArtifact, TrainingConfig};
use crate::model::{
    codec, fit, split_features_target, ClassificationMetrics, FitOptions, InsuranceModel,
};
use anyhow::{bail, Context, Result};
use std::path::Path;
use tracing::info;

/// Trainer output: the persisted artifact plus the in-memory model
#[derive(Debug, Clone)]
pub struct TrainingOutput {
    pub artifact: TrainerArtifact,
    pub model: InsuranceModel,
}

/// Fits a model on the train partition and scores it on the test partition
pub struct TrainerService {
    options: FitOptions,
    min_f1: f64,
    model_file: String,
}

impl TrainerService {
    pub fn new(training: &TrainingConfig, model_file: impl Into<String>) -> Self {
        Self {
            options: FitOptions {
                epochs: training.epochs,
                learning_rate: training.learning_rate,
            },
            min_f1: training.min_f1,
            model_file: model_file.into(),
        }
    }

    /// Train, score, and write the artifact to
    /// `<run_dir>/model_trainer/trained_model/<model_file>`
    pub async fn train(
        &self,
        ingestion: &IngestionArtifact,
        run_dir: &Path,
    ) -> Result<TrainingOutput> {
        let train = read_records(&ingestion.train_path).await?;
        let test = read_records(&ingestion.test_path).await?;

        let features = split_features_target(&train);
        if features.rows.is_empty() {
            bail!("No usable training rows after transformation");
        }

        let options = self.options;
        let rows = features.rows;
        let target = features.target;
        info!(rows = rows.len(), epochs = options.epochs, "Fitting model");
        let model = tokio::task::spawn_blocking(move || fit(&rows, &target, &options))
            .await
            .context("Model fitting task failed")??;

        let held_out = split_features_target(&test);
        let predicted = model.predict(&held_out.rows)?;
        let metrics = ClassificationMetrics::compute(&held_out.target, &predicted)?;
        info!(
            f1 = metrics.f1,
            precision = metrics.precision,
            recall = metrics.recall,
            accuracy = metrics.accuracy,
            "Scored trained model"
        );

        if metrics.f1 < self.min_f1 {
            bail!(
                "Trained model F1 {:.4} is below the required minimum {:.4}",
                metrics.f1,
                self.min_f1
            );
        }

        let trained_model_path = run_dir
            .join("model_trainer")
            .join("trained_model")
            .join(&self.model_file);
        if let Some(parent) = trained_model_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create trained model directory")?;
        }
        tokio::fs::write(&trained_model_path, codec::encode(&model)?)
            .await
            .with_context(|| format!("Failed to write {}", trained_model_path.display()))?;

        Ok(TrainingOutput {
            artifact: TrainerArtifact {
                trained_model_path,
                metrics,
            },
            model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ingestion::write_records;
    use crate::source::{synthetic, DataOrigin};
    use tempfile::TempDir;

    async fn ingested(dir: &Path, rows: usize) -> IngestionArtifact {
        let records = synthetic::generate(rows, 42).unwrap();
        let split = rows * 3 / 4;
        let train_path = dir.join("train.json");
        let test_path = dir.join("test.json");
        write_records(&train_path, &records[..split]).await.unwrap();
        write_records(&test_path, &records[split..]).await.unwrap();
        IngestionArtifact {
            train_path,
            test_path,
            origin: DataOrigin::Synthetic,
            train_rows: split,
            test_rows: rows - split,
        }
    }

    #[tokio::test]
    async fn train_writes_decodable_artifact() {
        let temp_dir = TempDir::new().unwrap();
        let ingestion = ingested(temp_dir.path(), 100).await;
        let trainer = TrainerService::new(&TrainingConfig::default(), "model.pkl");

        let output = trainer.train(&ingestion, temp_dir.path()).await.unwrap();

        let path = &output.artifact.trained_model_path;
        assert!(path.ends_with("model_trainer/trained_model/model.pkl"));
        let decoded = codec::decode(&std::fs::read(path).unwrap()).unwrap();
        for (a, b) in decoded
            .classifier
            .weights
            .iter()
            .zip(&output.model.classifier.weights)
        {
            assert!((a - b).abs() < 1e-9);
        }
        assert!((0.0..=1.0).contains(&output.artifact.metrics.f1));
    }

    #[tokio::test]
    async fn train_enforces_minimum_f1() {
        let temp_dir = TempDir::new().unwrap();
        let ingestion = ingested(temp_dir.path(), 40).await;
        let training = TrainingConfig {
            min_f1: 1.1,
            ..TrainingConfig::default()
        };

        let err = TrainerService::new(&training, "model.pkl")
            .train(&ingestion, temp_dir.path())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("below the required minimum"));
    }
}
