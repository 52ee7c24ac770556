use crate::services::ServiceError;
use crate::source::{Gender, InsuranceRecord, VehicleAge, VehicleDamage};
use serde::{Deserialize, Serialize};

/// Transformed feature columns, in model input order
pub const FEATURE_COLUMNS: [&str; 12] = [
    "id",
    "Gender",
    "Age",
    "Driving_License",
    "Region_Code",
    "Previously_Insured",
    "Annual_Premium",
    "Policy_Sales_Channel",
    "Vintage",
    "Vehicle_Age_lt_1_Year",
    "Vehicle_Age_gt_2_Years",
    "Vehicle_Damage_Yes",
];

/// Number of values the estimator consumes (every column but the placeholder `id`)
pub const MODEL_INPUTS: usize = FEATURE_COLUMNS.len() - 1;

pub const TARGET_COLUMN: &str = "Response";

/// One row of the transformed feature schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    /// Placeholder kept for shape; identifiers never reach the estimator
    pub id: i64,
    pub gender: u8,
    pub age: i64,
    pub driving_license: u8,
    pub region_code: f64,
    pub previously_insured: u8,
    pub annual_premium: f64,
    pub policy_sales_channel: f64,
    pub vintage: i64,
    pub vehicle_age_lt_1_year: u8,
    pub vehicle_age_gt_2_years: u8,
    pub vehicle_damage_yes: u8,
}

impl FeatureRow {
    /// Estimator inputs in `FEATURE_COLUMNS` order, without `id`
    pub fn values(&self) -> [f64; MODEL_INPUTS] {
        [
            f64::from(self.gender),
            self.age as f64,
            f64::from(self.driving_license),
            self.region_code,
            f64::from(self.previously_insured),
            self.annual_premium,
            self.policy_sales_channel,
            self.vintage as f64,
            f64::from(self.vehicle_age_lt_1_year),
            f64::from(self.vehicle_age_gt_2_years),
            f64::from(self.vehicle_damage_yes),
        ]
    }
}

/// Encode a record: Gender to 0/1 (Female/Male), one-hot Vehicle_Age and
/// Vehicle_Damage with the first level dropped, identifier replaced by the
/// placeholder. Missing values are a schema mismatch.
pub fn encode(record: &InsuranceRecord) -> Result<FeatureRow, ServiceError> {
    let vehicle_age = require(record.vehicle_age, "Vehicle_Age")?;

    Ok(FeatureRow {
        id: 0,
        gender: match require(record.gender, "Gender")? {
            Gender::Female => 0,
            Gender::Male => 1,
        },
        age: require(record.age, "Age")?,
        driving_license: binary(
            require(record.driving_license, "Driving_License")?,
            "Driving_License",
        )?,
        region_code: require(record.region_code, "Region_Code")?,
        previously_insured: binary(
            require(record.previously_insured, "Previously_Insured")?,
            "Previously_Insured",
        )?,
        annual_premium: require(record.annual_premium, "Annual_Premium")?,
        policy_sales_channel: require(record.policy_sales_channel, "Policy_Sales_Channel")?,
        vintage: require(record.vintage, "Vintage")?,
        vehicle_age_lt_1_year: u8::from(vehicle_age == VehicleAge::BelowOneYear),
        vehicle_age_gt_2_years: u8::from(vehicle_age == VehicleAge::AboveTwoYears),
        vehicle_damage_yes: u8::from(
            require(record.vehicle_damage, "Vehicle_Damage")? == VehicleDamage::Yes,
        ),
    })
}

/// Features and target for a batch of labelled records.
///
/// This is the single transform used by both training and evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelledFeatures {
    pub rows: Vec<FeatureRow>,
    pub target: Vec<u8>,
    /// Records dropped for missing or out-of-range values
    pub skipped: usize,
}

pub fn split_features_target(records: &[InsuranceRecord]) -> LabelledFeatures {
    let mut features = LabelledFeatures::default();

    for record in records {
        let target = record.response.filter(|value| *value <= 1);
        match (encode(record), target) {
            (Ok(row), Some(target)) => {
                features.rows.push(row);
                features.target.push(target);
            }
            _ => features.skipped += 1,
        }
    }

    if features.skipped > 0 {
        tracing::warn!(
            skipped = features.skipped,
            kept = features.rows.len(),
            "Dropped records with missing or invalid values"
        );
    }
    features
}

fn require<T>(value: Option<T>, column: &str) -> Result<T, ServiceError> {
    value.ok_or_else(|| ServiceError::SchemaMismatch(format!("missing value for {}", column)))
}

fn binary(value: u8, column: &str) -> Result<u8, ServiceError> {
    if value <= 1 {
        Ok(value)
    } else {
        Err(ServiceError::SchemaMismatch(format!(
            "{} must be 0 or 1, got {}",
            column, value
        )))
    }
}
