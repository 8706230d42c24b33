//! OCR cache value types (C3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hash::Sha256Hex;

/// Cache key for an OCR result: `(specimen_sha256, engine, engine_version?)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OcrCacheKey {
    pub specimen_sha256: Sha256Hex,
    pub engine: String,
    pub engine_version: Option<String>,
}

impl OcrCacheKey {
    #[must_use]
    pub fn new(
        specimen_sha256: Sha256Hex,
        engine: impl Into<String>,
        engine_version: Option<String>,
    ) -> Self {
        Self {
            specimen_sha256,
            engine: engine.into(),
            engine_version,
        }
    }
}

/// At-most-one-per-key OCR result row; upsert semantics on write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrResult {
    pub extracted_text: String,
    pub confidence: f32,
    pub error: bool,
    pub ocr_timestamp: DateTime<Utc>,
}

/// A lineage row recorded every time the OCR cache is consulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrLineage {
    pub key: OcrCacheKey,
    pub cache_hit: bool,
    pub recorded_at: DateTime<Utc>,
}
