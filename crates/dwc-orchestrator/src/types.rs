use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use dwc_types::{DwcRecord, ProvenanceFragment, SpecimenId};
use serde::{Deserialize, Serialize};

/// One `raw.jsonl` line (§6 Event schema). Field names and optionality
/// mirror the spec exactly so `dwc-output`'s writer can serialize this
/// struct directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    pub run_id: String,
    pub image: String,
    pub sha256: String,
    pub engine: Option<String>,
    pub engine_version: Option<String>,
    pub dwc: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub dwc_confidence: BTreeMap<String, f32>,
    pub flags: Vec<String>,
    pub added_fields: Vec<String>,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identification_history: Option<Vec<HashMap<String, String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gbif_verification: Option<GbifVerificationSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_pct: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GbifVerificationSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taxonomy: Option<dwc_gbif::TaxonomyMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locality: Option<dwc_gbif::LocalityVerification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occurrence: Option<dwc_gbif::OccurrenceValidation>,
}

/// Everything the per-specimen algorithm produces, to be committed
/// atomically by the run controller's single writer (§5: "an event's
/// JSONL line, its DwC row, its identification-history rows, and its
/// provenance fragments are all committed together or none is").
#[derive(Debug, Clone)]
pub struct SpecimenOutcome {
    pub specimen_id: SpecimenId,
    pub event: RawEvent,
    pub dwc_record: DwcRecord,
    pub identification_history: Vec<HashMap<String, String>>,
    pub fragments: Vec<ProvenanceFragment>,
    pub mean_confidence: f32,
    pub recorded_at: DateTime<Utc>,
}

/// Why `process_specimen` returned without running the pipeline at all
/// (§4.6 step 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyDone,
    RetryLimitReached,
}
