use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use dwc_types::{
    Candidate, DataQualityIssue, Extraction, ExtractionStatus, FieldValue, ImageTransformation,
    OriginalFile, ParamsHash, QualityIssueSeverity, Sha256Hex, Specimen, SpecimenAggregation,
    SpecimenId,
};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::SpecimenIndexError;

const DEFAULT_CATALOG_NUMBER_PATTERN: &str = r"^Herbarium-\d{5,6}$";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    Created,
    Existed,
}

/// Central identity, dedup, and aggregation layer (§4.5). All operations
/// are transactional per call — each takes one lock, does its work, and
/// releases it, mirroring the teacher's in-memory cache discipline rather
/// than holding a lock across an `.await`.
pub struct SpecimenIndex {
    specimens: Mutex<HashMap<SpecimenId, Specimen>>,
    originals: Mutex<HashMap<String, OriginalFile>>,
    transformations: Mutex<HashMap<String, ImageTransformation>>,
    extractions: Mutex<HashMap<String, Extraction>>,
    extraction_keys: Mutex<HashMap<(String, String), String>>,
    candidates: Mutex<Vec<Candidate>>,
    catalog_number_pattern: Regex,
}

impl SpecimenIndex {
    pub fn new() -> Result<Self, SpecimenIndexError> {
        Self::with_catalog_number_pattern(DEFAULT_CATALOG_NUMBER_PATTERN)
    }

    pub fn with_catalog_number_pattern(pattern: &str) -> Result<Self, SpecimenIndexError> {
        Ok(Self {
            specimens: Mutex::new(HashMap::new()),
            originals: Mutex::new(HashMap::new()),
            transformations: Mutex::new(HashMap::new()),
            extractions: Mutex::new(HashMap::new()),
            extraction_keys: Mutex::new(HashMap::new()),
            candidates: Mutex::new(Vec::new()),
            catalog_number_pattern: Regex::new(pattern)?,
        })
    }

    pub fn register_specimen(
        &self,
        specimen_id: SpecimenId,
        camera_filename: String,
        expected_catalog_number: Option<String>,
    ) -> RegisterOutcome {
        let mut specimens = self.specimens.lock().expect("index mutex poisoned");
        if specimens.contains_key(&specimen_id) {
            return RegisterOutcome::Existed;
        }
        specimens.insert(
            specimen_id.clone(),
            Specimen {
                specimen_id,
                camera_filename,
                expected_catalog_number,
            },
        );
        RegisterOutcome::Created
    }

    pub fn register_original(&self, file: OriginalFile) -> RegisterOutcome {
        let mut originals = self.originals.lock().expect("index mutex poisoned");
        let key = file.sha256.as_str().to_string();
        let existed = originals.insert(key, file).is_some();
        if existed {
            RegisterOutcome::Existed
        } else {
            RegisterOutcome::Created
        }
    }

    pub fn register_transformation(&self, transformation: ImageTransformation) -> RegisterOutcome {
        let mut transformations = self.transformations.lock().expect("index mutex poisoned");
        let key = transformation.sha256.as_str().to_string();
        let existed = transformations.insert(key, transformation).is_some();
        if existed {
            RegisterOutcome::Existed
        } else {
            RegisterOutcome::Created
        }
    }

    /// Looks in originals first, then transformations (§4.5).
    #[must_use]
    pub fn specimen_for_image(&self, sha: &Sha256Hex) -> Option<SpecimenId> {
        let key = sha.as_str();
        if let Some(original) = self.originals.lock().expect("index mutex poisoned").get(key) {
            return Some(original.specimen_id.clone());
        }
        self.transformations
            .lock()
            .expect("index mutex poisoned")
            .get(key)
            .map(|t| t.specimen_id.clone())
    }

    /// `(bool, previousExtractionId?)` per §4.5's three-case rule.
    #[must_use]
    pub fn should_extract(&self, image_sha: &Sha256Hex, params_hash: &ParamsHash) -> (bool, Option<String>) {
        let key = extraction_key(image_sha, params_hash);
        let extraction_keys = self.extraction_keys.lock().expect("index mutex poisoned");
        let Some(extraction_id) = extraction_keys.get(&key).cloned() else {
            return (true, None);
        };
        drop(extraction_keys);

        let extractions = self.extractions.lock().expect("index mutex poisoned");
        match extractions.get(&extraction_id) {
            Some(extraction) if extraction.status == ExtractionStatus::Failed => {
                (true, Some(extraction_id))
            }
            _ => (false, Some(extraction_id)),
        }
    }

    /// Upsert by `extraction_id`; enforces the unique `(image_sha256,
    /// params_hash)` constraint against any *other* extraction id.
    pub fn record_extraction(&self, extraction: Extraction) -> Result<(), SpecimenIndexError> {
        let key = extraction_key(&extraction.image_sha256, &extraction.params_hash);
        let mut extraction_keys = self.extraction_keys.lock().expect("index mutex poisoned");
        if let Some(existing_id) = extraction_keys.get(&key) {
            if existing_id != &extraction.extraction_id {
                return Err(SpecimenIndexError::DuplicateExtractionKey {
                    extraction_id: extraction.extraction_id.clone(),
                    existing_extraction_id: existing_id.clone(),
                });
            }
        }
        extraction_keys.insert(key, extraction.extraction_id.clone());
        drop(extraction_keys);

        self.extractions
            .lock()
            .expect("index mutex poisoned")
            .insert(extraction.extraction_id.clone(), extraction);
        Ok(())
    }

    pub fn record_candidate(&self, candidate: Candidate) {
        self.candidates.lock().expect("index mutex poisoned").push(candidate);
    }

    /// Looks up a previously recorded extraction by id, used to reuse a
    /// completed extraction's `dwc_fields` instead of re-running engines
    /// when [`Self::should_extract`] reports no new attempt is warranted.
    #[must_use]
    pub fn extraction(&self, extraction_id: &str) -> Option<Extraction> {
        self.extractions
            .lock()
            .expect("index mutex poisoned")
            .get(extraction_id)
            .cloned()
    }

    /// Groups all completed extractions for `specimen_id` by term, and
    /// selects the highest-confidence non-empty value per term (§4.5).
    #[must_use]
    pub fn aggregate(&self, specimen_id: &SpecimenId) -> SpecimenAggregation {
        let extractions = self.extractions.lock().expect("index mutex poisoned");
        let mut candidates: HashMap<String, Vec<FieldValue>> = HashMap::new();

        for extraction in extractions.values() {
            if &extraction.specimen_id != specimen_id {
                continue;
            }
            if extraction.status != ExtractionStatus::Completed {
                continue;
            }
            for (term, value) in &extraction.dwc_fields {
                candidates.entry(term.clone()).or_default().push(value.clone());
            }
        }

        let mut selected = HashMap::new();
        for (term, values) in &candidates {
            let best = values
                .iter()
                .filter(|v| !v.value.is_empty())
                .max_by(|a, b| a.confidence.total_cmp(&b.confidence));
            if let Some(best) = best {
                selected.insert(term.clone(), best.clone());
            }
        }

        SpecimenAggregation {
            specimen_id: specimen_id.clone(),
            candidates,
            selected,
            computed_at: Utc::now(),
        }
    }

    /// Data-quality checks over a set of aggregations (typically every
    /// specimen in a run), invoked after aggregation (§4.5).
    #[must_use]
    pub fn check_data_quality(&self, aggregations: &[SpecimenAggregation]) -> Vec<DataQualityIssue> {
        let mut issues = Vec::new();
        let mut by_catalog_number: HashMap<&str, Vec<SpecimenId>> = HashMap::new();

        for aggregation in aggregations {
            let Some(catalog_number) = aggregation.selected.get("catalogNumber") else {
                continue;
            };
            by_catalog_number
                .entry(catalog_number.value.as_str())
                .or_default()
                .push(aggregation.specimen_id.clone());

            if !self.catalog_number_pattern.is_match(&catalog_number.value) {
                issues.push(DataQualityIssue {
                    code: "MALFORMED_CATALOG_NUMBER".to_string(),
                    severity: QualityIssueSeverity::Warning,
                    specimen_ids: vec![aggregation.specimen_id.clone()],
                    message: format!(
                        "catalogNumber {:?} does not match the configured pattern",
                        catalog_number.value
                    ),
                });
            }
        }

        for (catalog_number, specimen_ids) in by_catalog_number {
            if specimen_ids.len() > 1 {
                issues.push(DataQualityIssue {
                    code: "DUPLICATE_CATALOG_NUMBER".to_string(),
                    severity: QualityIssueSeverity::Error,
                    specimen_ids,
                    message: format!("catalogNumber {catalog_number:?} is shared by multiple specimens"),
                });
            }
        }

        issues
    }

    /// Flattens every table into a plain value for persistence across runs
    /// (§4.11) — the run controller serializes this and hands it back to
    /// [`Self::from_snapshot`] on the next `resume=true` run, mirroring
    /// [`crate`]'s sibling `ProcessingStateStore::snapshot`/`from_snapshot`.
    #[must_use]
    pub fn snapshot(&self) -> SpecimenIndexSnapshot {
        SpecimenIndexSnapshot {
            specimens: self.specimens.lock().expect("index mutex poisoned").values().cloned().collect(),
            originals: self.originals.lock().expect("index mutex poisoned").values().cloned().collect(),
            transformations: self
                .transformations
                .lock()
                .expect("index mutex poisoned")
                .values()
                .cloned()
                .collect(),
            extractions: self.extractions.lock().expect("index mutex poisoned").values().cloned().collect(),
            candidates: self.candidates.lock().expect("index mutex poisoned").clone(),
        }
    }

    /// Rebuilds an index from a prior [`Self::snapshot`], reconstructing
    /// the `extraction_keys` lookup that the snapshot itself doesn't carry
    /// (it's derived from each extraction's `image_sha256`/`params_hash`).
    pub fn from_snapshot(snapshot: SpecimenIndexSnapshot) -> Result<Self, SpecimenIndexError> {
        let index = Self::new()?;
        {
            let mut specimens = index.specimens.lock().expect("index mutex poisoned");
            for specimen in snapshot.specimens {
                specimens.insert(specimen.specimen_id.clone(), specimen);
            }
        }
        {
            let mut originals = index.originals.lock().expect("index mutex poisoned");
            for original in snapshot.originals {
                originals.insert(original.sha256.as_str().to_string(), original);
            }
        }
        {
            let mut transformations = index.transformations.lock().expect("index mutex poisoned");
            for transformation in snapshot.transformations {
                transformations.insert(transformation.sha256.as_str().to_string(), transformation);
            }
        }
        {
            let mut extraction_keys = index.extraction_keys.lock().expect("index mutex poisoned");
            let mut extractions = index.extractions.lock().expect("index mutex poisoned");
            for extraction in snapshot.extractions {
                let key = extraction_key(&extraction.image_sha256, &extraction.params_hash);
                extraction_keys.insert(key, extraction.extraction_id.clone());
                extractions.insert(extraction.extraction_id.clone(), extraction);
            }
        }
        *index.candidates.lock().expect("index mutex poisoned") = snapshot.candidates;
        Ok(index)
    }
}

/// Plain-data form of [`SpecimenIndex`] for cross-run persistence (§4.11).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpecimenIndexSnapshot {
    pub specimens: Vec<Specimen>,
    pub originals: Vec<OriginalFile>,
    pub transformations: Vec<ImageTransformation>,
    pub extractions: Vec<Extraction>,
    pub candidates: Vec<Candidate>,
}

fn extraction_key(image_sha: &Sha256Hex, params_hash: &ParamsHash) -> (String, String) {
    (image_sha.as_str().to_string(), params_hash.0.as_str().to_string())
}
