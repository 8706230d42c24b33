//! Extraction and candidate records (C5 dedup + arbitration support).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::hash::{ParamsHash, Sha256Hex};
use crate::specimen::SpecimenId;

/// Status of one extraction attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    Completed,
    Failed,
    Skipped,
}

/// A single field value with its per-field confidence, as produced by a
/// text-to-dwc or image-to-dwc engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    pub value: String,
    pub confidence: f32,
}

/// One extraction attempt. Unique on `(image_sha256, params_hash)`;
/// re-extraction is only permitted when the previous attempt's status was
/// `Failed` (enforced by `dwc_specimen_index::SpecimenIndex::should_extract`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub extraction_id: String,
    pub image_sha256: Sha256Hex,
    pub params_hash: ParamsHash,
    pub specimen_id: SpecimenId,
    pub run_id: String,
    pub status: ExtractionStatus,
    pub dwc_fields: HashMap<String, FieldValue>,
    pub raw_event_offset: u64,
    pub timestamp: DateTime<Utc>,
}

/// Every engine output recorded for later reviewer arbitration, keyed by
/// `(run_id, image, value, engine)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub run_id: String,
    pub image_sha256: Sha256Hex,
    pub engine: String,
    pub value: String,
    pub confidence: f32,
    pub error: bool,
}

/// Aggregation over all completed extractions for one specimen: the full
/// candidate set per term plus the selected best value (§4.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecimenAggregation {
    pub specimen_id: SpecimenId,
    pub candidates: HashMap<String, Vec<FieldValue>>,
    pub selected: HashMap<String, FieldValue>,
    pub computed_at: DateTime<Utc>,
}

/// Severity of a data-quality check result (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityIssueSeverity {
    Error,
    Warning,
}

/// One data-quality finding produced after aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQualityIssue {
    pub code: String,
    pub severity: QualityIssueSeverity,
    pub specimen_ids: Vec<SpecimenId>,
    pub message: String,
}
