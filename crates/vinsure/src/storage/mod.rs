pub mod local;
pub mod remote;
pub mod session;

pub use local::{LocalStore, StagedWrite};
pub use remote::RemoteStore;
pub use session::{Backend, StoreSession};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

/// Errors raised by artifact store backends
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unreachable: {0}")]
    Unreachable(String),

    #[error("artifact not found: {0}")]
    NotFound(String),

    #[error("i/o failure at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Named model slots inside an artifact store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSlot {
    /// The model currently served
    Production,
    /// Snapshot of the production model taken before the last promotion
    Previous,
}

impl ModelSlot {
    pub fn dir(&self) -> &'static str {
        match self {
            ModelSlot::Production => "production_model",
            ModelSlot::Previous => "previous_model",
        }
    }

    /// Store key for a model file in this slot, e.g. `production_model/model.pkl`
    pub fn key(&self, file_name: &str) -> String {
        format!("{}/{}", self.dir(), file_name)
    }
}

impl fmt::Display for ModelSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dir())
    }
}

/// Byte-blob storage for model artifacts.
///
/// Keys are relative, slash-separated paths. Implementations must make
/// `write` atomic: a reader sees either the old blob or the new one.
#[async_trait::async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Short identifier of the backend, e.g. `local` or `s3://bucket`
    fn identifier(&self) -> String;

    /// Fully qualified location of `key`, used in logs and promotion records
    fn location(&self, key: &str) -> String;

    /// One cheap call proving the backend answers
    async fn probe(&self) -> StoreResult<()>;

    async fn exists(&self, key: &str) -> StoreResult<bool>;

    async fn read(&self, key: &str) -> StoreResult<Vec<u8>>;

    async fn write(&self, key: &str, bytes: &[u8]) -> StoreResult<()>;
}

/// A key inside a specific store
#[derive(Clone)]
pub struct SlotRef {
    pub store: Arc<dyn ArtifactStore>,
    pub key: String,
}

impl SlotRef {
    pub fn new(store: Arc<dyn ArtifactStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn location(&self) -> String {
        self.store.location(&self.key)
    }
}

impl fmt::Display for SlotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.location())
    }
}

impl fmt::Debug for SlotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotRef")
            .field("store", &self.store.identifier())
            .field("key", &self.key)
            .finish()
    }
}

/// Run `attempt` against each candidate in order and return the first success.
///
/// Every failure is logged with the candidate's location before moving on.
/// Returns `None` when all candidates fail.
pub async fn first_ok<T, E, F, Fut>(
    candidates: Vec<SlotRef>,
    mut attempt: F,
) -> Option<(SlotRef, T)>
where
    F: FnMut(SlotRef) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    for candidate in candidates {
        match attempt(candidate.clone()).await {
            Ok(value) => return Some((candidate, value)),
            Err(e) => {
                tracing::warn!(
                    location = %candidate,
                    error = %e,
                    "Artifact store attempt failed, trying next"
                );
            }
        }
    }
    None
}
