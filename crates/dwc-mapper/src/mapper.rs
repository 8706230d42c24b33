use std::collections::HashMap;

use dwc_types::DwcRecord;
use tracing::debug;

use crate::normalize::normalize_field;
use crate::resolve::{builtin_mapping_table, MappingTable};
use crate::validate::{apply_validation_flags, ValidationContext};

/// Ties key resolution, normalization, and validation together into the
/// single `map_record` entry point the orchestrator calls per extraction
/// (§4.7).
pub struct Mapper {
    table: MappingTable,
}

impl Mapper {
    /// Build a mapper from built-in rules layered with schema-derived and
    /// user-provided custom mappings (later layers win).
    #[must_use]
    pub fn new(schema_derived: Option<&MappingTable>, custom: Option<&MappingTable>) -> Self {
        let mut table = builtin_mapping_table();
        if let Some(schema_derived) = schema_derived {
            table.extend(schema_derived);
        }
        if let Some(custom) = custom {
            table.extend(custom);
        }
        Self { table }
    }

    /// Resolve and normalize a raw key -> string value map into a
    /// [`DwcRecord`], dropping any key with no applicable mapping and
    /// carrying per-field confidences through untouched.
    #[must_use]
    pub fn map_record(
        &self,
        raw_fields: &HashMap<String, String>,
        raw_confidence: &HashMap<String, f32>,
    ) -> DwcRecord {
        let mut record = DwcRecord::new();
        for (raw_key, raw_value) in raw_fields {
            let Some(term) = self.table.resolve(raw_key) else {
                debug!(key = %raw_key, "dropping unmapped field");
                continue;
            };
            let normalized = normalize_field(&term, raw_value);
            record.set(&term, normalized);
            if let Some(confidence) = raw_confidence.get(raw_key) {
                record.field_confidence.insert(term, *confidence);
            }
        }
        record
    }

    /// Append validation flags per §4.7; never rejects.
    pub fn validate(&self, record: &mut DwcRecord, context: &ValidationContext) {
        apply_validation_flags(record, context);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmapped_keys_are_dropped() {
        let mapper = Mapper::new(None, None);
        let mut raw = HashMap::new();
        raw.insert("collector".to_string(), "J. Smith".to_string());
        raw.insert("totally_unknown_field".to_string(), "x".to_string());

        let record = mapper.map_record(&raw, &HashMap::new());
        assert_eq!(record.get("recordedBy"), Some("J. Smith"));
        assert_eq!(record.fields.len(), 1);
    }

    #[test]
    fn normalization_runs_during_mapping() {
        let mapper = Mapper::new(None, None);
        let mut raw = HashMap::new();
        raw.insert("institutionCode".to_string(), "nyb".to_string());

        let record = mapper.map_record(&raw, &HashMap::new());
        assert_eq!(record.get("institutionCode"), Some("NYBG"));
    }

    #[test]
    fn custom_mapping_layer_is_honored() {
        let mut custom = crate::resolve::MappingTable::new();
        custom.insert("my_weird_field", "catalogNumber");
        let mapper = Mapper::new(None, Some(&custom));

        let mut raw = HashMap::new();
        raw.insert("my_weird_field".to_string(), "Herbarium-00001".to_string());
        let record = mapper.map_record(&raw, &HashMap::new());
        assert_eq!(record.get("catalogNumber"), Some("Herbarium-00001"));
    }

    #[test]
    fn confidence_carries_through_by_resolved_term() {
        let mapper = Mapper::new(None, None);
        let mut raw = HashMap::new();
        raw.insert("collector".to_string(), "J. Smith".to_string());
        let mut confidence = HashMap::new();
        confidence.insert("collector".to_string(), 0.87);

        let record = mapper.map_record(&raw, &confidence);
        assert_eq!(record.field_confidence.get("recordedBy"), Some(&0.87));
    }
}
