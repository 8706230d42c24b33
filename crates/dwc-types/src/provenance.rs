//! Provenance fragment model (C10).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::hash::FragmentId;

/// Taxonomy of provenance fragment kinds, per the data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentType {
    ImagePreprocessing,
    OcrExtraction,
    DwcExtraction,
    QcValidation,
    /// Reserved; not emitted by the pipeline itself.
    Publication,
}

impl FragmentType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ImagePreprocessing => "image_preprocessing",
            Self::OcrExtraction => "ocr_extraction",
            Self::DwcExtraction => "dwc_extraction",
            Self::QcValidation => "qc_validation",
            Self::Publication => "publication",
        }
    }
}

/// An immutable, chained provenance fragment describing one
/// `source -> output` transformation.
///
/// `fragment_id` is deterministic: SHA-256 over the canonical JSON form of
/// `(fragment_type, source_identifier, "{operation}:{agent_id}",
/// output_identifier, timestamp)`. See `dwc_provenance::fragment_id` for the
/// exact canonicalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceFragment {
    pub fragment_id: FragmentId,
    pub fragment_type: FragmentType,
    pub source_identifier: String,
    pub operation: String,
    pub agent_id: String,
    pub output_identifier: String,
    pub timestamp: DateTime<Utc>,
    pub previous_fragment_id: Option<FragmentId>,
    pub parameters: BTreeMap<String, serde_json::Value>,
    pub quality_metrics: BTreeMap<String, serde_json::Value>,
    pub metadata: BTreeMap<String, serde_json::Value>,
}
