use super::features::{FeatureRow, FEATURE_COLUMNS, MODEL_INPUTS};
use crate::services::ServiceError;
use anyhow::{bail, Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::{AdamW, Init, Linear, Module, Optimizer, ParamsAdamW, VarBuilder, VarMap};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Probability above which a row is labelled interested
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Per-column standardisation fitted on the training partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub means: Vec<f64>,
    pub scales: Vec<f64>,
}

impl StandardScaler {
    /// Population mean and standard deviation per column; constant columns get scale 1
    pub fn fit(rows: &[[f64; MODEL_INPUTS]]) -> Self {
        let n = rows.len().max(1) as f64;
        let mut means = vec![0.0; MODEL_INPUTS];
        let mut scales = vec![0.0; MODEL_INPUTS];

        for row in rows {
            for (mean, value) in means.iter_mut().zip(row) {
                *mean += value / n;
            }
        }
        for row in rows {
            for ((scale, mean), value) in scales.iter_mut().zip(&means).zip(row) {
                *scale += (value - mean).powi(2) / n;
            }
        }
        for scale in scales.iter_mut() {
            *scale = scale.sqrt();
            if *scale < f64::EPSILON {
                *scale = 1.0;
            }
        }

        Self { means, scales }
    }

    pub fn transform(&self, values: &[f64]) -> Vec<f64> {
        values
            .iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(value, (mean, scale))| (value - mean) / scale)
            .collect()
    }
}

/// Logistic-regression classifier over standardised inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub weights: Vec<f64>,
    pub bias: f64,
}

impl LogisticRegression {
    pub fn probability(&self, inputs: &[f64]) -> f64 {
        let logit: f64 = self
            .weights
            .iter()
            .zip(inputs)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.bias;
        1.0 / (1.0 + (-logit).exp())
    }

    pub fn predict(&self, inputs: &[f64]) -> u8 {
        u8::from(self.probability(inputs) > DECISION_THRESHOLD)
    }
}

/// A trained model: preprocessing stage plus classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsuranceModel {
    /// Column layout the model was trained on
    pub input_columns: Vec<String>,
    pub scaler: StandardScaler,
    pub classifier: LogisticRegression,
    pub trained_at: DateTime<Utc>,
}

impl InsuranceModel {
    pub fn new(scaler: StandardScaler, classifier: LogisticRegression) -> Self {
        Self {
            input_columns: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            scaler,
            classifier,
            trained_at: Utc::now(),
        }
    }

    /// Label each row 0 or 1
    pub fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<u8>, ServiceError> {
        self.check_schema()?;
        Ok(rows
            .iter()
            .map(|row| {
                let inputs = self.scaler.transform(&row.values());
                self.classifier.predict(&inputs)
            })
            .collect())
    }

    fn check_schema(&self) -> Result<(), ServiceError> {
        if self.input_columns.len() != FEATURE_COLUMNS.len()
            || self
                .input_columns
                .iter()
                .zip(FEATURE_COLUMNS)
                .any(|(have, want)| have != want)
        {
            return Err(ServiceError::SchemaMismatch(format!(
                "model expects columns {:?}",
                self.input_columns
            )));
        }

        let widths = [
            self.scaler.means.len(),
            self.scaler.scales.len(),
            self.classifier.weights.len(),
        ];
        if widths.iter().any(|w| *w != MODEL_INPUTS) {
            return Err(ServiceError::SchemaMismatch(format!(
                "model parameters have widths {:?}, expected {}",
                widths, MODEL_INPUTS
            )));
        }
        Ok(())
    }
}

/// Optimiser settings for [`fit`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitOptions {
    pub epochs: usize,
    pub learning_rate: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            epochs: 300,
            learning_rate: 0.05,
        }
    }
}

/// Fit scaler and classifier on CPU with full-batch AdamW.
///
/// The positive class is weighted by the negative/positive ratio to offset
/// imbalance. Blocking; run it on a blocking thread from async code.
pub fn fit(rows: &[FeatureRow], target: &[u8], options: &FitOptions) -> Result<InsuranceModel> {
    if rows.is_empty() {
        bail!("cannot fit a model on zero rows");
    }
    if rows.len() != target.len() {
        bail!("{} feature rows but {} targets", rows.len(), target.len());
    }

    let raw: Vec<[f64; MODEL_INPUTS]> = rows.iter().map(FeatureRow::values).collect();
    let scaler = StandardScaler::fit(&raw);

    let device = Device::Cpu;
    let n = rows.len();
    let inputs: Vec<f32> = raw
        .iter()
        .flat_map(|row| scaler.transform(row))
        .map(|v| v as f32)
        .collect();
    let xs = Tensor::from_vec(inputs, (n, MODEL_INPUTS), &device)?;
    let labels: Vec<f32> = target.iter().map(|&y| f32::from(y)).collect();
    let ys = Tensor::from_vec(labels, (n, 1), &device)?;

    let positives = target.iter().filter(|&&y| y == 1).count();
    let positive_weight = if positives == 0 || positives == n {
        1.0
    } else {
        (n - positives) as f64 / positives as f64
    };

    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
    let weight = vb.get_with_hints((1, MODEL_INPUTS), "weight", Init::Const(0.0))?;
    let bias = vb.get_with_hints(1, "bias", Init::Const(0.0))?;
    let layer = Linear::new(weight, Some(bias));

    let params = ParamsAdamW {
        lr: options.learning_rate,
        weight_decay: 0.0,
        ..Default::default()
    };
    let mut optimizer = AdamW::new(varmap.all_vars(), params)?;

    for _ in 0..options.epochs {
        let logits = layer.forward(&xs)?;
        let loss = weighted_bce(&logits, &ys, positive_weight)?;
        optimizer.backward_step(&loss)?;
    }

    let weights = layer
        .weight()
        .to_vec2::<f32>()?
        .into_iter()
        .next()
        .context("fitted weight tensor is empty")?;
    let bias = match layer.bias() {
        Some(bias) => bias.to_vec1::<f32>()?.first().copied().unwrap_or(0.0),
        None => 0.0,
    };

    let classifier = LogisticRegression {
        weights: weights.into_iter().map(f64::from).collect(),
        bias: f64::from(bias),
    };
    tracing::debug!(epochs = options.epochs, positive_weight, "Fitted logistic regression");
    Ok(InsuranceModel::new(scaler, classifier))
}

fn weighted_bce(
    logits: &Tensor,
    targets: &Tensor,
    positive_weight: f64,
) -> candle_core::Result<Tensor> {
    let eps = 1e-7f32;
    let probs = candle_nn::ops::sigmoid(logits)?.clamp(eps, 1.0 - eps)?;
    let positive = (targets * probs.log()?)?.affine(positive_weight, 0.0)?;
    let negative = (targets.affine(-1.0, 1.0)? * probs.affine(-1.0, 1.0)?.log()?)?;
    (positive + negative)?.neg()?.mean_all()
}
