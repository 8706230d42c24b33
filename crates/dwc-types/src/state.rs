//! Per-specimen processing state, runs, run lineage, and the JIT image
//! cache's on-disk cache-entry record.

use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hash::Sha256Hex;
use crate::specimen::SpecimenId;

/// Status of a `(specimen_id, module)` processing attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Pending,
    Done,
    Error,
}

/// Identity `(specimen_id, module)`; upserted after each pipeline attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingState {
    pub specimen_id: SpecimenId,
    pub module: String,
    pub status: ProcessingStatus,
    pub retries: u32,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub confidence: Option<f32>,
    pub updated_at: DateTime<Utc>,
}

impl ProcessingState {
    #[must_use]
    pub fn new_pending(specimen_id: SpecimenId, module: impl Into<String>) -> Self {
        Self {
            specimen_id,
            module: module.into(),
            status: ProcessingStatus::Pending,
            retries: 0,
            error_code: None,
            error_message: None,
            confidence: None,
            updated_at: Utc::now(),
        }
    }
}

/// A run of the pipeline over a batch of input images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub config_snapshot: serde_json::Value,
    pub git_commit: Option<String>,
    pub operator: Option<String>,
}

/// Per-specimen lineage row for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunLineage {
    pub run_id: String,
    pub specimen_id: SpecimenId,
    pub processing_status: ProcessingStatus,
    pub cache_hit: bool,
    pub processed_at: DateTime<Utc>,
}

/// JIT image cache metadata row (C4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub specimen_sha256: Sha256Hex,
    pub local_path: Utf8PathBuf,
    pub cached_at: DateTime<Utc>,
    pub ttl_seconds: u64,
    pub source: String,
    pub size_bytes: u64,
}

impl CacheEntry {
    /// `now - cached_at <= ttl_seconds`. Callers must additionally check the
    /// file still exists on disk; that half of the invariant can't be
    /// checked from the metadata alone.
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.cached_at);
        age.num_seconds() >= 0 && (age.num_seconds() as u64) <= self.ttl_seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn cache_entry_fresh_within_ttl() {
        let now = Utc::now();
        let entry = CacheEntry {
            specimen_sha256: Sha256Hex::of(b"x"),
            local_path: "cache/ab/cd/x.jpg".into(),
            cached_at: now - Duration::seconds(10),
            ttl_seconds: 60,
            source: "s3".into(),
            size_bytes: 100,
        };
        assert!(entry.is_fresh(now));
    }

    #[test]
    fn cache_entry_stale_past_ttl() {
        let now = Utc::now();
        let entry = CacheEntry {
            specimen_sha256: Sha256Hex::of(b"x"),
            local_path: "cache/ab/cd/x.jpg".into(),
            cached_at: now - Duration::seconds(120),
            ttl_seconds: 60,
            source: "s3".into(),
            size_bytes: 100,
        };
        assert!(!entry.is_fresh(now));
    }
}
