//! Specimen identity, original files, and the image transformation DAG.

use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::hash::Sha256Hex;

/// Identity `specimen_id` is the stem of the original filename; see
/// `Specimen` invariants in the data model.
pub type SpecimenId = String;

/// A specimen: the stable identity under which all images, extractions,
/// and processing state for one physical herbarium sheet are grouped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specimen {
    pub specimen_id: SpecimenId,
    pub camera_filename: String,
    pub expected_catalog_number: Option<String>,
}

/// Role of an `OriginalFile` relative to the specimen it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginalFileRole {
    OriginalPhoto,
    OriginalRaw,
}

/// An immutable original file as ingested, identified by its content hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginalFile {
    pub sha256: Sha256Hex,
    pub specimen_id: SpecimenId,
    pub path: Utf8PathBuf,
    pub format: String,
    pub dimensions: Option<(u32, u32)>,
    pub size_bytes: Option<u64>,
    pub role: OriginalFileRole,
    pub captured_at: Option<DateTime<Utc>>,
}

/// One step of a deterministic preprocessing pipeline, as recorded on an
/// `ImageTransformation`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationStep {
    pub name: String,
}

/// A derived image: identified by the hash of its *output* bytes, pointing
/// back at the hash it was derived from. The derivation graph rooted at
/// `OriginalFile`s must be a DAG; callers are responsible for not
/// introducing cycles (derived_from always points strictly "earlier").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageTransformation {
    pub sha256: Sha256Hex,
    pub specimen_id: SpecimenId,
    pub derived_from: Sha256Hex,
    pub operation: Vec<OperationStep>,
    pub params: HashMap<String, serde_json::Value>,
    pub timestamp: DateTime<Utc>,
    pub tool: String,
    pub tool_version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn original_file_role_serializes_snake_case() {
        let json = serde_json::to_string(&OriginalFileRole::OriginalPhoto).unwrap();
        assert_eq!(json, "\"original_photo\"");
    }
}
