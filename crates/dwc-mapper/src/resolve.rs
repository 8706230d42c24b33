use std::collections::HashMap;

/// Strip a URI prefix (`http://rs.tdwg.org/dwc/terms/catalogNumber`) or a
/// `namespace:term` prefix down to the bare term name (§4.7).
#[must_use]
pub fn strip_prefix(key: &str) -> &str {
    if let Some(idx) = key.rfind('/') {
        return &key[idx + 1..];
    }
    if let Some(idx) = key.rfind('#') {
        return &key[idx + 1..];
    }
    if let Some(idx) = key.rfind(':') {
        return &key[idx + 1..];
    }
    key
}

/// Case-insensitive key -> canonical DwC term table, merged from built-in
/// rules, schema-derived dynamic mappings, and user-provided custom
/// mappings (§4.7). Later layers win on conflict.
#[derive(Debug, Clone, Default)]
pub struct MappingTable {
    entries: HashMap<String, String>,
}

impl MappingTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, canonical_term: impl Into<String>) {
        self.entries.insert(key.into().to_lowercase(), canonical_term.into());
    }

    pub fn extend(&mut self, other: &MappingTable) {
        self.entries.extend(other.entries.clone());
    }

    /// Resolve `raw_key` (after prefix stripping) to a canonical term. If
    /// the key itself (case-insensitively) is already a known canonical
    /// term's exact match, prefer the mapping table entry; otherwise fall
    /// back to treating an unmapped-but-present key as-is only when it
    /// directly matches a canonical spelling already in the table's values.
    #[must_use]
    pub fn resolve(&self, raw_key: &str) -> Option<String> {
        let stripped = strip_prefix(raw_key);
        self.entries.get(&stripped.to_lowercase()).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Minimal built-in identity mappings (canonical terms map to themselves)
/// plus a handful of common synonyms seen in specimen-label extraction
/// output. Schema-derived and custom mappings are layered on top by the
/// caller via [`MappingTable::extend`].
#[must_use]
pub fn builtin_mapping_table() -> MappingTable {
    let mut table = MappingTable::new();
    const CANONICAL_TERMS: &[&str] = &[
        "catalogNumber",
        "scientificName",
        "recordedBy",
        "eventDate",
        "locality",
        "stateProvince",
        "country",
        "decimalLatitude",
        "decimalLongitude",
        "institutionCode",
        "ownerInstitutionCode",
        "basisOfRecord",
        "typeStatus",
        "identifiedBy",
        "dateIdentified",
    ];
    for term in CANONICAL_TERMS {
        table.insert(*term, *term);
    }
    table.insert("catalog_number", "catalogNumber");
    table.insert("collector", "recordedBy");
    table.insert("collection_date", "eventDate");
    table.insert("date_collected", "eventDate");
    table.insert("species", "scientificName");
    table.insert("state", "stateProvince");
    table.insert("lat", "decimalLatitude");
    table.insert("lon", "decimalLongitude");
    table.insert("lng", "decimalLongitude");
    table
}
