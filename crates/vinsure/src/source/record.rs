use mongodb::bson::{Bson, Document};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Columns every insurance record carries, in collection order
pub const RECORD_COLUMNS: [&str; 12] = [
    "id",
    "Gender",
    "Age",
    "Driving_License",
    "Region_Code",
    "Previously_Insured",
    "Vehicle_Age",
    "Vehicle_Damage",
    "Annual_Premium",
    "Policy_Sales_Channel",
    "Vintage",
    "Response",
];

/// Literal used by the collection for missing values
pub const MISSING_TOKEN: &str = "na";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleAge {
    #[serde(rename = "< 1 Year")]
    BelowOneYear,
    #[serde(rename = "1-2 Year")]
    OneToTwoYears,
    #[serde(rename = "> 2 Years")]
    AboveTwoYears,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleDamage {
    Yes,
    No,
}

/// One row of the insurance collection. Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsuranceRecord {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(rename = "Gender", default)]
    pub gender: Option<Gender>,
    #[serde(rename = "Age", default)]
    pub age: Option<i64>,
    #[serde(rename = "Driving_License", default)]
    pub driving_license: Option<u8>,
    #[serde(rename = "Region_Code", default)]
    pub region_code: Option<f64>,
    #[serde(rename = "Previously_Insured", default)]
    pub previously_insured: Option<u8>,
    #[serde(rename = "Vehicle_Age", default)]
    pub vehicle_age: Option<VehicleAge>,
    #[serde(rename = "Vehicle_Damage", default)]
    pub vehicle_damage: Option<VehicleDamage>,
    #[serde(rename = "Annual_Premium", default)]
    pub annual_premium: Option<f64>,
    #[serde(rename = "Policy_Sales_Channel", default)]
    pub policy_sales_channel: Option<f64>,
    #[serde(rename = "Vintage", default)]
    pub vintage: Option<i64>,
    #[serde(rename = "Response", default)]
    pub response: Option<u8>,
}

impl InsuranceRecord {
    /// Names of the columns this record has no value for
    pub fn missing_columns(&self) -> Vec<&'static str> {
        let present = [
            self.id.is_some(),
            self.gender.is_some(),
            self.age.is_some(),
            self.driving_license.is_some(),
            self.region_code.is_some(),
            self.previously_insured.is_some(),
            self.vehicle_age.is_some(),
            self.vehicle_damage.is_some(),
            self.annual_premium.is_some(),
            self.policy_sales_channel.is_some(),
            self.vintage.is_some(),
            self.response.is_some(),
        ];
        RECORD_COLUMNS
            .iter()
            .zip(present)
            .filter(|(_, present)| !present)
            .map(|(column, _)| *column)
            .collect()
    }
}

/// Where a dataset came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataOrigin {
    /// Fetched from the document collection
    Collection,
    /// Generated locally because the collection was unavailable or empty
    Synthetic,
    /// Fixed fallback used when generation itself failed
    Constant,
}

impl fmt::Display for DataOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataOrigin::Collection => "collection",
            DataOrigin::Synthetic => "synthetic",
            DataOrigin::Constant => "constant",
        };
        write!(f, "{}", s)
    }
}

/// Records plus their provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub records: Vec<InsuranceRecord>,
    pub origin: DataOrigin,
}

impl Dataset {
    pub fn new(records: Vec<InsuranceRecord>, origin: DataOrigin) -> Self {
        Self { records, origin }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Drop the store-internal `_id` and turn `"na"` strings into nulls
pub fn normalize_document(mut document: Document) -> Document {
    document.remove("_id");
    for (_, value) in document.iter_mut() {
        if matches!(value, Bson::String(s) if s == MISSING_TOKEN) {
            *value = Bson::Null;
        }
    }
    document
}

/// Decode raw documents into records, skipping ones that don't fit the schema
pub fn decode_documents(documents: Vec<Document>) -> Vec<InsuranceRecord> {
    let total = documents.len();
    let records: Vec<InsuranceRecord> = documents
        .into_iter()
        .map(normalize_document)
        .filter_map(|document| match mongodb::bson::from_document(document) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Skipping document that does not match the record schema"
                );
                None
            }
        })
        .collect();

    if records.len() < total {
        tracing::warn!(
            decoded = records.len(),
            skipped = total - records.len(),
            "Some documents could not be decoded"
        );
    }
    records
}
