use super::ingestion::read_records;
use super::types::{IngestionArtifact, ValidationArtifact};
use crate::source::{DataOrigin, InsuranceRecord, RECORD_COLUMNS};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

/// Per-partition data quality summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionReport {
    pub rows: usize,
    /// Missing-value count per column
    pub missing: BTreeMap<String, usize>,
}

impl PartitionReport {
    pub fn inspect(records: &[InsuranceRecord]) -> Self {
        let mut missing: BTreeMap<String, usize> =
            RECORD_COLUMNS.iter().map(|c| (c.to_string(), 0)).collect();
        for record in records {
            for column in record.missing_columns() {
                if let Some(count) = missing.get_mut(column) {
                    *count += 1;
                }
            }
        }
        Self {
            rows: records.len(),
            missing,
        }
    }

    /// Problems that make this partition unusable
    pub fn problems(&self, partition: &str) -> Vec<String> {
        if self.rows == 0 {
            return vec![format!("{} partition has no rows", partition)];
        }
        self.missing
            .iter()
            .filter(|(_, count)| **count == self.rows)
            .map(|(column, _)| {
                format!("{} partition has no values for column {}", partition, column)
            })
            .collect()
    }
}

/// Validation report written to `<run_dir>/data_validation/report.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub origin: DataOrigin,
    pub columns: Vec<String>,
    pub train: PartitionReport,
    pub test: PartitionReport,
    pub valid: bool,
    pub message: String,
}

impl ValidationReport {
    pub fn build(origin: DataOrigin, train: &[InsuranceRecord], test: &[InsuranceRecord]) -> Self {
        let train = PartitionReport::inspect(train);
        let test = PartitionReport::inspect(test);

        let mut problems = train.problems("train");
        problems.extend(test.problems("test"));
        let valid = problems.is_empty();
        let message = if valid {
            "dataset matches the declared schema".to_string()
        } else {
            problems.join("; ")
        };

        Self {
            origin,
            columns: RECORD_COLUMNS.iter().map(|c| c.to_string()).collect(),
            train,
            test,
            valid,
            message,
        }
    }
}

/// Checks ingested partitions against the record schema
#[derive(Debug, Default)]
pub struct ValidationService;

impl ValidationService {
    pub fn new() -> Self {
        Self
    }

    pub async fn validate(
        &self,
        ingestion: &IngestionArtifact,
        run_dir: &Path,
    ) -> Result<ValidationArtifact> {
        let train = read_records(&ingestion.train_path).await?;
        let test = read_records(&ingestion.test_path).await?;
        let report = ValidationReport::build(ingestion.origin, &train, &test);

        let report_path = run_dir.join("data_validation").join("report.json");
        if let Some(parent) = report_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create validation directory")?;
        }
        let content =
            serde_json::to_vec_pretty(&report).context("Failed to serialize validation report")?;
        tokio::fs::write(&report_path, content)
            .await
            .context("Failed to write validation report")?;

        if report.valid {
            info!(
                train_rows = report.train.rows,
                test_rows = report.test.rows,
                "Data validation passed"
            );
        } else {
            warn!(message = %report.message, "Data validation failed");
        }

        Ok(ValidationArtifact {
            valid: report.valid,
            message: report.message,
            report_path,
        })
    }
}
