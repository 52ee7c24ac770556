//! Byte encoding of model artifacts.
//!
//! Blobs are a JSON envelope tagged with a format name and version so that
//! foreign or future artifacts fail to load instead of mispredicting.

use super::estimator::InsuranceModel;
use crate::services::ServiceError;
use serde::{Deserialize, Serialize};

pub const FORMAT: &str = "vinsure-model";
pub const VERSION: u32 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    format: &'a str,
    version: u32,
    model: &'a InsuranceModel,
}

#[derive(Deserialize)]
struct Envelope {
    format: String,
    version: u32,
    model: InsuranceModel,
}

pub fn encode(model: &InsuranceModel) -> Result<Vec<u8>, ServiceError> {
    let envelope = EnvelopeRef {
        format: FORMAT,
        version: VERSION,
        model,
    };
    serde_json::to_vec_pretty(&envelope)
        .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Failed to encode model: {}", e)))
}

pub fn decode(bytes: &[u8]) -> Result<InsuranceModel, ServiceError> {
    let envelope: Envelope = serde_json::from_slice(bytes)
        .map_err(|e| ServiceError::Deserialization(e.to_string()))?;

    if envelope.format != FORMAT {
        return Err(ServiceError::Deserialization(format!(
            "unknown artifact format '{}'",
            envelope.format
        )));
    }
    if envelope.version != VERSION {
        return Err(ServiceError::Deserialization(format!(
            "unsupported artifact version {}",
            envelope.version
        )));
    }
    Ok(envelope.model)
}
