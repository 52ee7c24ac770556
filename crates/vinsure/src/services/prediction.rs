use super::ServiceError;
use crate::model::{codec, FeatureRow};
use crate::storage::{first_ok, ModelSlot, SlotRef, StoreSession};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Serve-time input, already in the transformed feature schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleData {
    #[serde(rename = "Gender")]
    pub gender: u8,
    #[serde(rename = "Age")]
    pub age: i64,
    #[serde(rename = "Driving_License")]
    pub driving_license: u8,
    #[serde(rename = "Region_Code")]
    pub region_code: f64,
    #[serde(rename = "Previously_Insured")]
    pub previously_insured: u8,
    #[serde(rename = "Annual_Premium")]
    pub annual_premium: f64,
    #[serde(rename = "Policy_Sales_Channel")]
    pub policy_sales_channel: f64,
    #[serde(rename = "Vintage")]
    pub vintage: i64,
    #[serde(rename = "Vehicle_Age_lt_1_Year")]
    pub vehicle_age_lt_1_year: u8,
    #[serde(rename = "Vehicle_Age_gt_2_Years")]
    pub vehicle_age_gt_2_years: u8,
    #[serde(rename = "Vehicle_Damage_Yes")]
    pub vehicle_damage_yes: u8,
}

impl VehicleData {
    /// Form field names, in display order
    pub const FIELDS: [&'static str; 11] = [
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

    /// Parse submitted form fields
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self, ServiceError> {
        Ok(Self {
            gender: field(fields, "Gender")?,
            age: field(fields, "Age")?,
            driving_license: field(fields, "Driving_License")?,
            region_code: field(fields, "Region_Code")?,
            previously_insured: field(fields, "Previously_Insured")?,
            annual_premium: field(fields, "Annual_Premium")?,
            policy_sales_channel: field(fields, "Policy_Sales_Channel")?,
            vintage: field(fields, "Vintage")?,
            vehicle_age_lt_1_year: field(fields, "Vehicle_Age_lt_1_Year")?,
            vehicle_age_gt_2_years: field(fields, "Vehicle_Age_gt_2_Years")?,
            vehicle_damage_yes: field(fields, "Vehicle_Damage_Yes")?,
        })
    }

    /// Check value ranges. A negative `Vintage` is clamped to 0.
    pub fn validated(mut self) -> Result<Self, ServiceError> {
        let flags = [
            ("Gender", self.gender),
            ("Driving_License", self.driving_license),
            ("Previously_Insured", self.previously_insured),
            ("Vehicle_Age_lt_1_Year", self.vehicle_age_lt_1_year),
            ("Vehicle_Age_gt_2_Years", self.vehicle_age_gt_2_years),
            ("Vehicle_Damage_Yes", self.vehicle_damage_yes),
        ];
        if let Some((name, value)) = flags.iter().find(|(_, value)| *value > 1) {
            return Err(ServiceError::SchemaMismatch(format!(
                "{} must be 0 or 1, got {}",
                name, value
            )));
        }
        if self.vehicle_age_lt_1_year == 1 && self.vehicle_age_gt_2_years == 1 {
            return Err(ServiceError::SchemaMismatch(
                "Vehicle_Age_lt_1_Year and Vehicle_Age_gt_2_Years are mutually exclusive"
                    .to_string(),
            ));
        }

        let floats = [
            ("Region_Code", self.region_code),
            ("Annual_Premium", self.annual_premium),
            ("Policy_Sales_Channel", self.policy_sales_channel),
        ];
        if let Some((name, _)) = floats.iter().find(|(_, value)| !value.is_finite()) {
            return Err(ServiceError::SchemaMismatch(format!("{} must be a finite number", name)));
        }

        if self.vintage < 0 {
            warn!(vintage = self.vintage, "Negative Vintage received, using 0");
            self.vintage = 0;
        }
        Ok(self)
    }

    /// Feature row with the placeholder `id`
    pub fn to_feature_row(&self) -> FeatureRow {
        FeatureRow {
            id: 0,
            gender: self.gender,
            age: self.age,
            driving_license: self.driving_license,
            region_code: self.region_code,
            previously_insured: self.previously_insured,
            annual_premium: self.annual_premium,
            policy_sales_channel: self.policy_sales_channel,
            vintage: self.vintage,
            vehicle_age_lt_1_year: self.vehicle_age_lt_1_year,
            vehicle_age_gt_2_years: self.vehicle_age_gt_2_years,
            vehicle_damage_yes: self.vehicle_damage_yes,
        }
    }
}

fn field<T: FromStr>(fields: &HashMap<String, String>, name: &str) -> Result<T, ServiceError> {
    let raw = fields
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ServiceError::SchemaMismatch(format!("missing field {}", name)))?;
    raw.parse()
        .map_err(|_| ServiceError::SchemaMismatch(format!("invalid value for {}: {}", name, raw)))
}

/// Binary interest label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    pub value: u8,
}

impl Prediction {
    pub fn label(&self) -> &'static str {
        if self.value == 1 {
            "Response-Yes"
        } else {
            "Response-No"
        }
    }
}

/// Serves predictions from the production model, remote first then local
pub struct PredictionService {
    session: Arc<StoreSession>,
    model_file: String,
}

impl PredictionService {
    pub fn new(session: Arc<StoreSession>, model_file: impl Into<String>) -> Self {
        Self {
            session,
            model_file: model_file.into(),
        }
    }

    pub async fn predict(&self, data: &VehicleData) -> Result<Prediction, ServiceError> {
        let row = data.clone().validated()?.to_feature_row();
        let key = ModelSlot::Production.key(&self.model_file);
        let candidates = self
            .session
            .tiers()
            .await
            .into_iter()
            .map(|store| SlotRef::new(store, key.clone()))
            .collect();

        match first_ok(candidates, |slot| predict_with(slot, row.clone())).await {
            Some((slot, value)) => {
                info!(location = %slot, value, "Served prediction");
                Ok(Prediction { value })
            }
            None => {
                error!("No production model could be loaded from any artifact store");
                Err(ServiceError::NoModelAvailable)
            }
        }
    }
}

async fn predict_with(slot: SlotRef, row: FeatureRow) -> Result<u8, ServiceError> {
    let bytes = slot.store.read(&slot.key).await?;
    let model = codec::decode(&bytes)?;
    let labels = model.predict(std::slice::from_ref(&row))?;
    labels
        .first()
        .copied()
        .ok_or_else(|| ServiceError::SchemaMismatch("model returned no prediction".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ArtifactStore, LocalStore};
    use crate::testing::{rule_model, vehicle_data, FlakyStore, UnreachableStore};
    use tempfile::TempDir;

    async fn session_with_local_model(
        temp_dir: &TempDir,
        remote: Option<Arc<dyn ArtifactStore>>,
    ) -> Arc<StoreSession> {
        let local = LocalStore::new(temp_dir.path());
        local
            .write("production_model/model.pkl", &codec::encode(&rule_model()).unwrap())
            .await
            .unwrap();
        Arc::new(StoreSession::new(remote, local))
    }

    #[test]
    fn labels_map_to_display_text() {
        assert_eq!(Prediction { value: 1 }.label(), "Response-Yes");
        assert_eq!(Prediction { value: 0 }.label(), "Response-No");
    }

    #[test]
    fn negative_vintage_is_clamped() {
        let mut data = vehicle_data(true);
        data.vintage = -5;
        assert_eq!(data.validated().unwrap().vintage, 0);
    }

    #[test]
    fn non_binary_flag_is_rejected() {
        let mut data = vehicle_data(true);
        data.previously_insured = 2;
        let err = data.validated().unwrap_err();
        assert!(matches!(
            err,
            ServiceError::SchemaMismatch(msg) if msg.contains("Previously_Insured")
        ));
    }

    #[test]
    fn conflicting_vehicle_age_is_rejected() {
        let mut data = vehicle_data(true);
        data.vehicle_age_lt_1_year = 1;
        data.vehicle_age_gt_2_years = 1;
        assert!(data.validated().is_err());
    }

    #[test]
    fn from_fields_parses_form_values() {
        let fields: HashMap<String, String> = VehicleData::FIELDS
            .iter()
            .map(|name| (name.to_string(), "1".to_string()))
            .collect();
        let data = VehicleData::from_fields(&fields).unwrap();
        assert_eq!(data.age, 1);
        assert_eq!(data.annual_premium, 1.0);
    }

    #[test]
    fn from_fields_reports_bad_field() {
        let mut fields: HashMap<String, String> = VehicleData::FIELDS
            .iter()
            .map(|name| (name.to_string(), "0".to_string()))
            .collect();
        fields.insert("Age".to_string(), "forty".to_string());

        let err = VehicleData::from_fields(&fields).unwrap_err();
        assert!(matches!(err, ServiceError::SchemaMismatch(msg) if msg.contains("Age")));

        fields.remove("Vintage");
        fields.insert("Age".to_string(), "40".to_string());
        assert!(VehicleData::from_fields(&fields).is_err());
    }

    #[tokio::test]
    async fn predicts_from_local_model() {
        let temp_dir = TempDir::new().unwrap();
        let session = session_with_local_model(&temp_dir, None).await;
        let service = PredictionService::new(session, "model.pkl");

        assert_eq!(service.predict(&vehicle_data(true)).await.unwrap().value, 1);
        assert_eq!(service.predict(&vehicle_data(false)).await.unwrap().value, 0);
    }

    #[tokio::test]
    async fn unreachable_remote_falls_back_to_local() {
        let temp_dir = TempDir::new().unwrap();
        let session = session_with_local_model(&temp_dir, Some(Arc::new(UnreachableStore))).await;
        let service = PredictionService::new(session, "model.pkl");

        let prediction = service.predict(&vehicle_data(true)).await.unwrap();
        assert_eq!(prediction.label(), "Response-Yes");
    }

    #[tokio::test]
    async fn failing_remote_reads_fall_back_to_local() {
        let temp_dir = TempDir::new().unwrap();
        let session = session_with_local_model(&temp_dir, Some(Arc::new(FlakyStore))).await;
        let service = PredictionService::new(session, "model.pkl");

        assert_eq!(service.predict(&vehicle_data(true)).await.unwrap().value, 1);
    }

    #[tokio::test]
    async fn no_model_anywhere_is_terminal() {
        let temp_dir = TempDir::new().unwrap();
        let session = Arc::new(StoreSession::new(
            Some(Arc::new(FlakyStore)),
            LocalStore::new(temp_dir.path()),
        ));
        let service = PredictionService::new(session, "model.pkl");

        let err = service.predict(&vehicle_data(true)).await.unwrap_err();
        assert!(matches!(err, ServiceError::NoModelAvailable));
    }

    #[tokio::test]
    async fn corrupt_local_model_is_no_model() {
        let temp_dir = TempDir::new().unwrap();
        let local = LocalStore::new(temp_dir.path());
        local.write("production_model/model.pkl", b"garbage").await.unwrap();
        let session = Arc::new(StoreSession::local_only(local));
        let service = PredictionService::new(session, "model.pkl");

        assert!(matches!(
            service.predict(&vehicle_data(true)).await,
            Err(ServiceError::NoModelAvailable)
        ));
    }

    #[tokio::test]
    async fn invalid_input_is_schema_mismatch() {
        let temp_dir = TempDir::new().unwrap();
        let session = session_with_local_model(&temp_dir, None).await;
        let service = PredictionService::new(session, "model.pkl");
        let mut data = vehicle_data(true);
        data.gender = 7;

        assert!(matches!(
            service.predict(&data).await,
            Err(ServiceError::SchemaMismatch(_))
        ));
    }
}
