use super::types::{EvaluationResult, PromotionRecord};
use super::ServiceError;
use crate::storage::{ArtifactStore, ModelSlot, StoreError, StoreSession};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Copies accepted models into the production slot of the active store
pub struct ModelPusher {
    session: Arc<StoreSession>,
    model_file: String,
}

impl ModelPusher {
    pub fn new(session: Arc<StoreSession>, model_file: impl Into<String>) -> Self {
        Self {
            session,
            model_file: model_file.into(),
        }
    }

    /// Promote the artifact at `artifact_location` if `evaluation` accepted it.
    ///
    /// Returns `None` for a rejected model. A failed copy is logged and the
    /// record still names the intended production location.
    pub async fn promote(
        &self,
        evaluation: &EvaluationResult,
        artifact_location: &Path,
    ) -> Option<PromotionRecord> {
        if !evaluation.accepted {
            info!(
                score_delta = evaluation.score_delta,
                "Trained model not accepted, production model unchanged"
            );
            return None;
        }

        let store = self.session.active().await;
        let production_key = ModelSlot::Production.key(&self.model_file);
        let record = PromotionRecord {
            store: store.identifier(),
            location: store.location(&production_key),
        };

        match self.copy_to_production(store.as_ref(), artifact_location).await {
            Ok(()) => info!(location = %record.location, "Promoted model to production"),
            Err(e) => error!(
                location = %record.location,
                error = %e,
                "Model promotion failed"
            ),
        }
        Some(record)
    }

    async fn copy_to_production(
        &self,
        store: &dyn ArtifactStore,
        artifact_location: &Path,
    ) -> Result<(), ServiceError> {
        let bytes = tokio::fs::read(artifact_location)
            .await
            .map_err(|source| ServiceError::Io {
                path: artifact_location.to_path_buf(),
                source,
            })?;

        let production_key = ModelSlot::Production.key(&self.model_file);
        let previous_key = ModelSlot::Previous.key(&self.model_file);

        match store.read(&production_key).await {
            Ok(current) => {
                store.write(&previous_key, &current).await?;
                info!(
                    location = %store.location(&previous_key),
                    "Snapshotted current production model"
                );
            },
            Err(StoreError::NotFound(_)) => debug!("No production model to snapshot"),
            Err(e) => return Err(e.into()),
        }

        store.write(&production_key, &bytes).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalStore;
    use crate::testing::in_memory_remote;
    use tempfile::TempDir;

    fn local_session(temp_dir: &TempDir) -> Arc<StoreSession> {
        let local = LocalStore::new(temp_dir.path().join("artifact"));
        Arc::new(StoreSession::local_only(local))
    }

    fn artifact(dir: &Path, content: &[u8]) -> std::path::PathBuf {
        let path = dir.join("trained").join("model.pkl");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn rejected_model_is_not_promoted() {
        let temp_dir = TempDir::new().unwrap();
        let session = local_session(&temp_dir);
        session.local().write("production_model/model.pkl", b"old").await.unwrap();
        let pusher = ModelPusher::new(session.clone(), "model.pkl");

        let record = pusher
            .promote(
                &EvaluationResult::decide(0.79, Some(0.82)),
                &artifact(temp_dir.path(), b"new"),
            )
            .await;

        assert!(record.is_none());
        let production = session.local().read("production_model/model.pkl").await.unwrap();
        assert_eq!(production, b"old");
    }

    #[tokio::test]
    async fn first_promotion_leaves_previous_empty() {
        let temp_dir = TempDir::new().unwrap();
        let session = local_session(&temp_dir);
        let pusher = ModelPusher::new(session.clone(), "model.pkl");

        let record = pusher
            .promote(&EvaluationResult::decide(0.75, None), &artifact(temp_dir.path(), b"new"))
            .await
            .unwrap();

        assert_eq!(record.store, "local");
        assert!(record.location.ends_with("production_model/model.pkl"));
        let local = session.local();
        assert_eq!(local.read("production_model/model.pkl").await.unwrap(), b"new");
        assert!(!local.exists("previous_model/model.pkl").await.unwrap());
    }

    #[tokio::test]
    async fn promotion_snapshots_previous_production() {
        let temp_dir = TempDir::new().unwrap();
        let session = local_session(&temp_dir);
        session.local().write("production_model/model.pkl", b"old").await.unwrap();
        let pusher = ModelPusher::new(session.clone(), "model.pkl");

        pusher
            .promote(
                &EvaluationResult::decide(0.9, Some(0.8)),
                &artifact(temp_dir.path(), b"new"),
            )
            .await
            .unwrap();

        let local = session.local();
        assert_eq!(local.read("production_model/model.pkl").await.unwrap(), b"new");
        assert_eq!(local.read("previous_model/model.pkl").await.unwrap(), b"old");
    }

    #[tokio::test]
    async fn failed_copy_still_returns_intended_location() {
        let temp_dir = TempDir::new().unwrap();
        let session = local_session(&temp_dir);
        let pusher = ModelPusher::new(session.clone(), "model.pkl");

        let record = pusher
            .promote(
                &EvaluationResult::accept_on_failure(0.5),
                &temp_dir.path().join("missing.pkl"),
            )
            .await
            .unwrap();

        assert!(record.location.ends_with("production_model/model.pkl"));
        assert!(!session.local().exists("production_model/model.pkl").await.unwrap());
    }

    #[tokio::test]
    async fn reachable_remote_receives_promotion_and_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let remote = Arc::new(in_memory_remote("models"));
        remote.write("production_model/model.pkl", b"old").await.unwrap();
        let session = Arc::new(StoreSession::new(
            Some(remote.clone() as Arc<dyn ArtifactStore>),
            LocalStore::new(temp_dir.path().join("artifact")),
        ));
        let pusher = ModelPusher::new(session.clone(), "model.pkl");

        let record = pusher
            .promote(
                &EvaluationResult::decide(0.9, Some(0.8)),
                &artifact(temp_dir.path(), b"new"),
            )
            .await
            .unwrap();

        assert_eq!(record.store, "s3://models");
        assert_eq!(record.location, "s3://models/production_model/model.pkl");
        assert_eq!(remote.read("production_model/model.pkl").await.unwrap(), b"new");
        assert_eq!(remote.read("previous_model/model.pkl").await.unwrap(), b"old");
        let local = session.local();
        assert!(!local.exists("production_model/model.pkl").await.unwrap());
        assert!(!local.exists("previous_model/model.pkl").await.unwrap());
    }
}
