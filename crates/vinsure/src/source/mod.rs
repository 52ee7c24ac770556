pub mod mongo;
pub mod record;
pub mod synthetic;

pub use mongo::{redact_uri, MongoDocumentStore};
pub use record::{
    decode_documents, normalize_document, DataOrigin, Dataset, Gender, InsuranceRecord,
    VehicleAge, VehicleDamage, RECORD_COLUMNS,
};

use crate::services::{SourceConfig, TrainingConfig};
use anyhow::{bail, Result};
use mongodb::bson::Document;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Raw access to a document collection
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Connection description safe for logs (credentials masked)
    fn describe(&self) -> String;

    async fn ping(&self) -> Result<()>;

    /// Fetch a single document; used to check the collection has data
    async fn find_one(&self, database: &str, collection: &str) -> Result<Option<Document>>;

    /// Fetch up to `limit` documents within a server-side time budget
    async fn find(
        &self,
        database: &str,
        collection: &str,
        limit: i64,
        max_time: Duration,
    ) -> Result<Vec<Document>>;
}

/// Produces a training dataset, falling back to generated data.
///
/// `fetch` never fails: collection errors and empty collections yield a
/// synthetic dataset, and a failed generation yields the constant one.
pub struct DocumentSource {
    store: Option<Arc<dyn DocumentStore>>,
    database: String,
    fetch_limit: i64,
    max_time: Duration,
    synthetic_rows: usize,
    seed: u64,
}

impl DocumentSource {
    pub fn new(
        store: Option<Arc<dyn DocumentStore>>,
        source: &SourceConfig,
        training: &TrainingConfig,
    ) -> Self {
        Self {
            store,
            database: source.database.clone(),
            fetch_limit: source.fetch_limit,
            max_time: Duration::from_secs(source.max_time_secs),
            synthetic_rows: training.synthetic_rows,
            seed: training.seed,
        }
    }

    /// Connect to MongoDB when a URI is configured. Connection failures are
    /// logged and leave the source without a store.
    pub async fn from_config(source: &SourceConfig, training: &TrainingConfig) -> Self {
        let store = match source.uri.as_deref() {
            Some(uri) => match MongoDocumentStore::connect(uri).await {
                Ok(store) => Some(Arc::new(store) as Arc<dyn DocumentStore>),
                Err(e) => {
                    warn!(
                        uri = %redact_uri(uri),
                        error = %e,
                        "MongoDB connection failed, will use synthetic data"
                    );
                    None
                }
            },
            None => {
                info!("No MongoDB URI configured, will use synthetic data");
                None
            }
        };
        Self::new(store, source, training)
    }

    pub fn store(&self) -> Option<&Arc<dyn DocumentStore>> {
        self.store.as_ref()
    }

    /// Export `collection` as a dataset
    pub async fn fetch(&self, collection: &str, database: Option<&str>) -> Dataset {
        let database = database.unwrap_or(&self.database);

        match self.fetch_collection(database, collection).await {
            Ok(records) if !records.is_empty() => {
                info!(collection, rows = records.len(), "Fetched records from collection");
                return Dataset::new(records, DataOrigin::Collection);
            }
            Ok(_) => warn!(collection, "No usable data in collection, using synthetic data"),
            Err(e) => warn!(
                collection,
                error = %e,
                "Failed to fetch collection, using synthetic data"
            ),
        }

        self.synthetic_dataset()
    }

    async fn fetch_collection(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<Vec<InsuranceRecord>> {
        let Some(store) = &self.store else {
            bail!("no document store available");
        };

        if store.find_one(database, collection).await?.is_none() {
            return Ok(Vec::new());
        }

        let documents = store
            .find(database, collection, self.fetch_limit, self.max_time)
            .await?;
        Ok(decode_documents(documents))
    }

    fn synthetic_dataset(&self) -> Dataset {
        match synthetic::generate(self.synthetic_rows, self.seed) {
            Ok(records) => {
                info!(rows = records.len(), seed = self.seed, "Generated synthetic dataset");
                Dataset::new(records, DataOrigin::Synthetic)
            }
            Err(e) => {
                warn!(error = %e, "Synthetic data generation failed, using constant dataset");
                Dataset::new(synthetic::constant(), DataOrigin::Constant)
            }
        }
    }
}
