use crate::source::DocumentSource;
use crate::storage::{ArtifactStore, Backend, ModelSlot, StoreSession};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Production-slot state in one store
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotStatus {
    pub store: String,
    pub location: String,
    pub present: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Document store reachability
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentStoreStatus {
    pub configured: bool,
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub backend: Backend,
    pub production_models: Vec<SlotStatus>,
    pub document_store: DocumentStoreStatus,
}

impl HealthReport {
    /// True when at least one tier can serve predictions
    pub fn model_available(&self) -> bool {
        self.production_models.iter().any(|slot| slot.present)
    }
}

/// Reports backend selection, production models per tier and document store state
pub struct HealthService {
    session: Arc<StoreSession>,
    source: Arc<DocumentSource>,
    model_file: String,
}

impl HealthService {
    pub fn new(
        session: Arc<StoreSession>,
        source: Arc<DocumentSource>,
        model_file: impl Into<String>,
    ) -> Self {
        Self {
            session,
            source,
            model_file: model_file.into(),
        }
    }

    pub async fn check(&self) -> HealthReport {
        let key = ModelSlot::Production.key(&self.model_file);
        let mut production_models = Vec::new();
        for store in self.session.tiers().await {
            production_models.push(slot_status(store.as_ref(), &key).await);
        }

        HealthReport {
            status: "healthy",
            timestamp: Utc::now(),
            backend: self.session.backend().await,
            production_models,
            document_store: self.document_store_status().await,
        }
    }

    async fn document_store_status(&self) -> DocumentStoreStatus {
        let Some(store) = self.source.store() else {
            return DocumentStoreStatus {
                configured: false,
                reachable: false,
                description: None,
                error: None,
            };
        };

        let ping = store.ping().await;
        DocumentStoreStatus {
            configured: true,
            reachable: ping.is_ok(),
            description: Some(store.describe()),
            error: ping.err().map(|e| e.to_string()),
        }
    }
}

async fn slot_status(store: &dyn ArtifactStore, key: &str) -> SlotStatus {
    let (present, error) = match store.exists(key).await {
        Ok(present) => (present, None),
        Err(e) => (false, Some(e.to_string())),
    };
    SlotStatus {
        store: store.identifier(),
        location: store.location(key),
        present,
        error,
    }
}
