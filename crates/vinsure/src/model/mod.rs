pub mod codec;
pub mod estimator;
pub mod features;
pub mod metrics;

pub use estimator::{fit, FitOptions, InsuranceModel, LogisticRegression, StandardScaler};
pub use features::{
    encode, split_features_target, FeatureRow, LabelledFeatures, FEATURE_COLUMNS, MODEL_INPUTS,
    TARGET_COLUMN,
};
pub use metrics::{f1_score, ClassificationMetrics};
