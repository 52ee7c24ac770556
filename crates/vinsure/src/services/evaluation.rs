use super::types::EvaluationResult;
use super::ServiceError;
use crate::model::{codec, f1_score, split_features_target, FeatureRow, InsuranceModel};
use crate::source::InsuranceRecord;
use crate::storage::{first_ok, ModelSlot, SlotRef, StoreError, StoreSession};
use std::sync::Arc;
use tracing::{info, warn};

/// A freshly trained model and the F1 the trainer reported for it
#[derive(Debug, Clone)]
pub struct CandidateModel {
    pub model: InsuranceModel,
    pub reported_score: f64,
}

/// Decides whether a trained model should replace the production model.
///
/// Never fails: when the candidate cannot be scored the result is
/// "accept with zero delta", and a prior model that cannot be loaded or
/// scored counts as absent.
pub struct ModelEvaluation {
    session: Arc<StoreSession>,
    model_file: String,
}

impl ModelEvaluation {
    pub fn new(session: Arc<StoreSession>, model_file: impl Into<String>) -> Self {
        Self {
            session,
            model_file: model_file.into(),
        }
    }

    pub async fn evaluate(
        &self,
        test_records: &[InsuranceRecord],
        candidate: &CandidateModel,
    ) -> EvaluationResult {
        match self.try_evaluate(test_records, candidate).await {
            Ok(result) => {
                info!(
                    trained_score = result.trained_score,
                    best_prior_score = ?result.best_prior_score,
                    accepted = result.accepted,
                    score_delta = result.score_delta,
                    "Model evaluation complete"
                );
                result
            }
            Err(e) => {
                warn!(error = %e, "Model evaluation failed, accepting the trained model");
                EvaluationResult::accept_on_failure(candidate.reported_score)
            }
        }
    }

    async fn try_evaluate(
        &self,
        test_records: &[InsuranceRecord],
        candidate: &CandidateModel,
    ) -> Result<EvaluationResult, ServiceError> {
        let features = split_features_target(test_records);
        let predicted = candidate.model.predict(&features.rows)?;
        let trained_score = f1_score(&features.target, &predicted)?;

        let best_prior_score = self.best_prior_score(&features.rows, &features.target).await;
        Ok(EvaluationResult::decide(trained_score, best_prior_score))
    }

    /// Where a prior model is looked for, in order: the production slot of the
    /// active store (remote when reachable, local otherwise), then local previous
    pub async fn prior_candidates(&self) -> Vec<SlotRef> {
        vec![
            SlotRef::new(
                self.session.active().await,
                ModelSlot::Production.key(&self.model_file),
            ),
            SlotRef::new(
                self.session.local(),
                ModelSlot::Previous.key(&self.model_file),
            ),
        ]
    }

    async fn best_prior_score(&self, rows: &[FeatureRow], target: &[u8]) -> Option<f64> {
        let located = first_ok(self.prior_candidates().await, |slot| async move {
            match slot.store.exists(&slot.key).await {
                Ok(true) => Ok(()),
                Ok(false) => Err(StoreError::NotFound(slot.location())),
                Err(e) => Err(e),
            }
        })
        .await;

        let Some((slot, ())) = located else {
            info!("No prior model found");
            return None;
        };

        match score_prior(&slot, rows, target).await {
            Ok(score) => {
                info!(location = %slot, score, "Scored prior model");
                Some(score)
            }
            Err(e) => {
                warn!(
                    location = %slot,
                    error = %e,
                    "Prior model could not be scored, treating as absent"
                );
                None
            }
        }
    }
}

async fn score_prior(
    slot: &SlotRef,
    rows: &[FeatureRow],
    target: &[u8],
) -> Result<f64, ServiceError> {
    let bytes = slot.store.read(&slot.key).await?;
    let model = codec::decode(&bytes)?;
    let predicted = model.predict(rows)?;
    f1_score(target, &predicted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ArtifactStore, LocalStore};
    use crate::testing::{constant_model, labelled_records, rule_model, UnreachableStore};
    use tempfile::TempDir;

    fn candidate(model: InsuranceModel, reported_score: f64) -> CandidateModel {
        CandidateModel {
            model,
            reported_score,
        }
    }

    fn encoded(model: &InsuranceModel) -> Vec<u8> {
        codec::encode(model).unwrap()
    }

    fn local_session(temp_dir: &TempDir) -> Arc<StoreSession> {
        Arc::new(StoreSession::local_only(LocalStore::new(temp_dir.path())))
    }

    #[tokio::test]
    async fn first_evaluation_accepts_with_full_delta() {
        let temp_dir = TempDir::new().unwrap();
        let evaluation = ModelEvaluation::new(local_session(&temp_dir), "model.pkl");

        let result = evaluation
            .evaluate(&labelled_records(20), &candidate(rule_model(), 0.4))
            .await;

        assert_eq!(result.best_prior_score, None);
        assert_eq!(result.trained_score, 1.0);
        assert!(result.accepted);
        assert_eq!(result.score_delta, 1.0);
    }

    #[tokio::test]
    async fn better_prior_rejects_candidate() {
        let temp_dir = TempDir::new().unwrap();
        let session = local_session(&temp_dir);
        session
            .local()
            .write("previous_model/model.pkl", &encoded(&rule_model()))
            .await
            .unwrap();
        let evaluation = ModelEvaluation::new(session, "model.pkl");

        // always-yes model on a half-positive set scores 2/3
        let result = evaluation
            .evaluate(&labelled_records(20), &candidate(constant_model(1), 0.6))
            .await;

        assert_eq!(result.best_prior_score, Some(1.0));
        assert!(!result.accepted);
        assert!((result.score_delta - (2.0 / 3.0 - 1.0)).abs() < 1e-12);
    }

    #[tokio::test]
    async fn corrupt_prior_counts_as_absent() {
        let temp_dir = TempDir::new().unwrap();
        let session = local_session(&temp_dir);
        session
            .local()
            .write("previous_model/model.pkl", b"not a model")
            .await
            .unwrap();
        let evaluation = ModelEvaluation::new(session, "model.pkl");

        let result = evaluation
            .evaluate(&labelled_records(20), &candidate(constant_model(1), 0.6))
            .await;

        assert_eq!(result.best_prior_score, None);
        assert!(result.accepted);
        assert!((result.score_delta - 2.0 / 3.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn unscorable_candidate_is_accepted_with_zero_delta() {
        let temp_dir = TempDir::new().unwrap();
        let evaluation = ModelEvaluation::new(local_session(&temp_dir), "model.pkl");

        let result = evaluation.evaluate(&[], &candidate(rule_model(), 0.55)).await;

        assert!(result.accepted);
        assert_eq!(result.score_delta, 0.0);
        assert_eq!(result.trained_score, 0.55);
    }

    #[tokio::test]
    async fn remote_production_is_searched_before_local_previous() {
        let temp_dir = TempDir::new().unwrap();
        let remote = Arc::new(crate::testing::in_memory_remote("models"));
        remote
            .write("production_model/model.pkl", &encoded(&constant_model(0)))
            .await
            .unwrap();
        let session = Arc::new(StoreSession::new(
            Some(remote as Arc<dyn ArtifactStore>),
            LocalStore::new(temp_dir.path()),
        ));
        session
            .local()
            .write("previous_model/model.pkl", &encoded(&rule_model()))
            .await
            .unwrap();
        let evaluation = ModelEvaluation::new(session, "model.pkl");

        let result = evaluation
            .evaluate(&labelled_records(20), &candidate(rule_model(), 1.0))
            .await;

        // the remote always-no model scores 0.0
        assert_eq!(result.best_prior_score, Some(0.0));
        assert!(result.accepted);
    }

    #[tokio::test]
    async fn unreachable_remote_falls_back_to_local_slots() {
        let temp_dir = TempDir::new().unwrap();
        let session = Arc::new(StoreSession::new(
            Some(Arc::new(UnreachableStore)),
            LocalStore::new(temp_dir.path()),
        ));
        let evaluation = ModelEvaluation::new(session, "model.pkl");

        let slots: Vec<String> = evaluation
            .prior_candidates()
            .await
            .iter()
            .map(|s| s.location())
            .collect();
        assert_eq!(
            slots,
            vec![
                temp_dir.path().join("production_model/model.pkl").display().to_string(),
                temp_dir.path().join("previous_model/model.pkl").display().to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn local_production_is_the_baseline_without_remote() {
        let temp_dir = TempDir::new().unwrap();
        let session = local_session(&temp_dir);
        let local = session.local();
        local
            .write("production_model/model.pkl", &encoded(&rule_model()))
            .await
            .unwrap();
        local
            .write("previous_model/model.pkl", &encoded(&constant_model(0)))
            .await
            .unwrap();
        let evaluation = ModelEvaluation::new(session, "model.pkl");

        let result = evaluation
            .evaluate(&labelled_records(20), &candidate(constant_model(1), 0.6))
            .await;

        assert_eq!(result.best_prior_score, Some(1.0));
        assert!(!result.accepted);
    }
}
