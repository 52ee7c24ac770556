use super::types::{IngestionArtifact, SourceConfig, TrainingConfig};
use crate::source::{DocumentSource, InsuranceRecord};
use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Fetches the dataset and persists seeded train/test partitions
pub struct IngestionService {
    source: Arc<DocumentSource>,
    collection: String,
    test_ratio: f64,
    seed: u64,
}

impl IngestionService {
    pub fn new(
        source: Arc<DocumentSource>,
        source_config: &SourceConfig,
        training: &TrainingConfig,
    ) -> Self {
        Self {
            source,
            collection: source_config.collection.clone(),
            test_ratio: training.test_ratio,
            seed: training.seed,
        }
    }

    /// Write `feature_store/data.json`, `ingested/train.json` and
    /// `ingested/test.json` under `<run_dir>/data_ingestion`
    pub async fn ingest(&self, run_dir: &Path) -> Result<IngestionArtifact> {
        let dataset = self.source.fetch(&self.collection, None).await;
        let origin = dataset.origin;
        let stage_dir = run_dir.join("data_ingestion");

        write_records(
            &stage_dir.join("feature_store").join("data.json"),
            &dataset.records,
        )
        .await?;

        let (train, test) = split_train_test(dataset.records, self.test_ratio, self.seed);
        let train_path = stage_dir.join("ingested").join("train.json");
        let test_path = stage_dir.join("ingested").join("test.json");
        write_records(&train_path, &train).await?;
        write_records(&test_path, &test).await?;

        info!(
            %origin,
            train_rows = train.len(),
            test_rows = test.len(),
            "Ingested dataset"
        );

        Ok(IngestionArtifact {
            train_path,
            test_path,
            origin,
            train_rows: train.len(),
            test_rows: test.len(),
        })
    }
}

/// Shuffle with a seeded generator and hold out `test_ratio` of the rows.
///
/// With two or more rows both partitions are non-empty.
pub fn split_train_test(
    mut records: Vec<InsuranceRecord>,
    test_ratio: f64,
    seed: u64,
) -> (Vec<InsuranceRecord>, Vec<InsuranceRecord>) {
    let mut rng = StdRng::seed_from_u64(seed);
    records.shuffle(&mut rng);

    let total = records.len();
    let test_len = if total < 2 {
        0
    } else {
        ((total as f64 * test_ratio).ceil() as usize).clamp(1, total - 1)
    };

    let test = records.split_off(total - test_len);
    (records, test)
}

pub async fn write_records(path: &Path, records: &[InsuranceRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let content = serde_json::to_vec_pretty(records).context("Failed to serialize records")?;
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

pub async fn read_records(path: &Path) -> Result<Vec<InsuranceRecord>> {
    let content = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_slice(&content)
        .with_context(|| format!("Invalid records in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{synthetic, DataOrigin};
    use tempfile::TempDir;

    #[test]
    fn split_holds_out_a_quarter() {
        let records = synthetic::generate(100, 1).unwrap();
        let (train, test) = split_train_test(records, 0.25, 42);
        assert_eq!(train.len(), 75);
        assert_eq!(test.len(), 25);
    }

    #[test]
    fn split_is_deterministic_and_disjoint() {
        let records = synthetic::generate(40, 1).unwrap();
        let (train_a, test_a) = split_train_test(records.clone(), 0.25, 42);
        let (train_b, test_b) = split_train_test(records, 0.25, 42);

        assert_eq!(train_a, train_b);
        assert_eq!(test_a, test_b);
        assert!(test_a.iter().all(|r| !train_a.iter().any(|t| t.id == r.id)));
    }

    #[test]
    fn small_datasets_keep_both_partitions() {
        let records = synthetic::generate(2, 1).unwrap();
        let (train, test) = split_train_test(records, 0.01, 42);
        assert_eq!((train.len(), test.len()), (1, 1));

        let single = synthetic::generate(1, 1).unwrap();
        let (train, test) = split_train_test(single, 0.25, 42);
        assert_eq!((train.len(), test.len()), (1, 0));
    }

    #[tokio::test]
    async fn ingest_writes_partitions() {
        let temp_dir = TempDir::new().unwrap();
        let source = Arc::new(DocumentSource::new(
            None,
            &SourceConfig::default(),
            &TrainingConfig::default(),
        ));
        let service =
            IngestionService::new(source, &SourceConfig::default(), &TrainingConfig::default());

        let artifact = service.ingest(temp_dir.path()).await.unwrap();

        assert_eq!(artifact.origin, DataOrigin::Synthetic);
        assert_eq!(artifact.train_rows + artifact.test_rows, 100);
        assert_eq!(read_records(&artifact.test_path).await.unwrap().len(), artifact.test_rows);
        assert!(temp_dir
            .path()
            .join("data_ingestion/feature_store/data.json")
            .exists());
    }
}
