use crate::services::ServiceError;
use serde::{Deserialize, Serialize};

/// Binary classification scores for the positive class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub f1: f64,
    pub precision: f64,
    pub recall: f64,
    pub accuracy: f64,
}

impl ClassificationMetrics {
    /// Compare predictions against the target. Ratios with an empty
    /// denominator are 0.0.
    pub fn compute(target: &[u8], predicted: &[u8]) -> Result<Self, ServiceError> {
        if target.is_empty() {
            return Err(ServiceError::EvaluationFailure(
                "no rows to score".to_string(),
            ));
        }
        if target.len() != predicted.len() {
            return Err(ServiceError::EvaluationFailure(format!(
                "{} targets but {} predictions",
                target.len(),
                predicted.len()
            )));
        }

        let (mut tp, mut fp, mut fn_, mut tn) = (0usize, 0usize, 0usize, 0usize);
        for (&actual, &guess) in target.iter().zip(predicted) {
            match (actual == 1, guess == 1) {
                (true, true) => tp += 1,
                (false, true) => fp += 1,
                (true, false) => fn_ += 1,
                (false, false) => tn += 1,
            }
        }

        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = ratio(2 * tp, 2 * tp + fp + fn_);
        let accuracy = ratio(tp + tn, target.len());

        Ok(Self {
            f1,
            precision,
            recall,
            accuracy,
        })
    }
}

/// F1 score of the positive class
pub fn f1_score(target: &[u8], predicted: &[u8]) -> Result<f64, ServiceError> {
    ClassificationMetrics::compute(target, predicted).map(|m| m.f1)
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
