use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One configured schema to fetch (e.g. `("dwc", "https://.../dwcterms.xsd")`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSource {
    pub name: String,
    pub url: String,
}

/// The parsed element/term set of one schema document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedSchema {
    pub name: String,
    pub namespace: Option<String>,
    pub terms: BTreeSet<String>,
    pub deprecated_terms: BTreeSet<String>,
}

impl ParsedSchema {
    #[must_use]
    pub fn term_count(&self) -> usize {
        self.terms.len()
    }
}

/// One schema's cache metadata row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaMetadataEntry {
    pub namespace: Option<String>,
    pub term_count: usize,
    pub last_update: DateTime<Utc>,
}

/// The on-disk metadata file: `{last_update, versions, namespaces,
/// term_counts}` per schema (§4.8).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub schemas: BTreeMap<String, SchemaMetadataEntry>,
}

/// Set-overlap compatibility report between two schemas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityReport {
    pub schema_a: String,
    pub schema_b: String,
    pub shared_terms: BTreeSet<String>,
    pub only_in_a: BTreeSet<String>,
    pub only_in_b: BTreeSet<String>,
}

/// A suggested mapping from an unmapped field name to a schema term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingSuggestion {
    pub field: String,
    pub suggested_term: String,
    pub schema: String,
    pub similarity: f64,
}
