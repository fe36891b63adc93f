//! Bundle encodings: canonical JSON and deterministic CBOR, label 674
//!
//! Canonical means: fixed field order (declaration order), map keys
//! sorted (BTree containers), lowercase hex for byte strings, RFC3339
//! UTC timestamps. Both encodings wrap the bundle in a single-entry map
//! under the transaction-metadata label so the payload can be embedded
//! by the transaction builder unchanged.

use std::collections::BTreeMap;

use crate::metadata::bundle::{MetadataBundle, METADATA_LABEL};
use crate::metadata::MetadataError;

/// Canonical JSON rendering of the bare bundle
pub fn to_canonical_json(bundle: &MetadataBundle) -> Result<String, MetadataError> {
    serde_json::to_string(bundle).map_err(|e| MetadataError::Codec(e.to_string()))
}

/// JSON rendering wrapped under the metadata label
pub fn to_labeled_json(bundle: &MetadataBundle) -> Result<serde_json::Value, MetadataError> {
    let inner = serde_json::to_value(bundle).map_err(|e| MetadataError::Codec(e.to_string()))?;
    let mut labeled = serde_json::Map::new();
    labeled.insert(METADATA_LABEL.to_string(), inner);
    Ok(serde_json::Value::Object(labeled))
}

/// Parse a bare-bundle JSON rendering
pub fn from_json(json: &str) -> Result<MetadataBundle, MetadataError> {
    serde_json::from_str(json).map_err(|e| MetadataError::Codec(e.to_string()))
}

/// Deterministic CBOR rendering wrapped under the metadata label
pub fn to_labeled_cbor(bundle: &MetadataBundle) -> Result<Vec<u8>, MetadataError> {
    let labeled = BTreeMap::from([(METADATA_LABEL, bundle)]);
    let mut out = Vec::new();
    ciborium::ser::into_writer(&labeled, &mut out)
        .map_err(|e| MetadataError::Codec(e.to_string()))?;
    Ok(out)
}

/// Parse a labeled CBOR rendering
pub fn from_labeled_cbor(bytes: &[u8]) -> Result<MetadataBundle, MetadataError> {
    let mut labeled: BTreeMap<u64, MetadataBundle> = ciborium::de::from_reader(bytes)
        .map_err(|e| MetadataError::Codec(e.to_string()))?;
    labeled
        .remove(&METADATA_LABEL)
        .ok_or_else(|| MetadataError::Codec(format!("label {METADATA_LABEL} missing")))
}

/// Size of the labeled CBOR rendering, used for the inline budget check
pub fn labeled_cbor_size(bundle: &MetadataBundle) -> Result<usize, MetadataError> {
    Ok(to_labeled_cbor(bundle)?.len())
}
