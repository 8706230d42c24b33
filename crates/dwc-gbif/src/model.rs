use serde::{Deserialize, Serialize};

/// Fields a caller may supply for taxonomy verification. At least
/// `scientific_name` is expected in practice but none are individually
/// required (§4.9).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaxonomyInput {
    pub scientific_name: Option<String>,
    pub kingdom: Option<String>,
    pub phylum: Option<String>,
    pub class: Option<String>,
    pub order: Option<String>,
    pub family: Option<String>,
    pub genus: Option<String>,
    pub specific_epithet: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchType {
    Exact,
    Fuzzy,
    Higherrank,
    None,
}

/// Raw shape of a `species/match` response, using the field names the
/// spec names explicitly (§4.9).
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SpeciesMatchResponse {
    #[serde(default, rename = "matchType")]
    pub match_type: Option<MatchType>,
    #[serde(default)]
    pub confidence: Option<f32>,
    #[serde(default, rename = "taxonKey")]
    pub taxon_key: Option<i64>,
    #[serde(default, rename = "acceptedTaxonKey")]
    pub accepted_taxon_key: Option<i64>,
    #[serde(default, rename = "acceptedScientificName")]
    pub accepted_scientific_name: Option<String>,
    #[serde(default)]
    pub rank: Option<String>,
    #[serde(default)]
    pub kingdom: Option<String>,
    #[serde(default)]
    pub phylum: Option<String>,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub order: Option<String>,
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default)]
    pub genus: Option<String>,
    #[serde(default)]
    pub species: Option<String>,
    #[serde(default)]
    pub synonym: Option<bool>,
}

/// Result of a verified taxonomy match, with the canonical fields copied
/// through plus issues describing fuzzy/higher-rank/synonym/low-confidence
/// conditions (§4.9).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonomyMatch {
    pub match_type: MatchType,
    pub confidence: f32,
    pub taxon_key: Option<i64>,
    pub accepted_taxon_key: Option<i64>,
    pub accepted_scientific_name: Option<String>,
    pub rank: Option<String>,
    pub kingdom: Option<String>,
    pub phylum: Option<String>,
    pub class: Option<String>,
    pub order: Option<String>,
    pub family: Option<String>,
    pub genus: Option<String>,
    pub species: Option<String>,
    pub issues: Vec<String>,
}

/// Locality verification outcome: either a verified result, a rejected
/// input, or an unreachable-endpoint sentinel (§4.9).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LocalityOutcome {
    Verified(LocalityVerification),
    InvalidInput(String),
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalityVerification {
    pub gbif_coordinate_valid: bool,
    pub gbif_locality_verified: bool,
    pub country: Option<String>,
    pub state_province: Option<String>,
    pub country_code: Option<String>,
    pub decimal_latitude: f64,
    pub decimal_longitude: f64,
    pub distance_km: Option<f64>,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GeocodeReverseEntry {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default, rename = "stateProvince")]
    pub state_province: Option<String>,
    #[serde(default, rename = "isoCountryCode2Digit")]
    pub country_code: Option<String>,
    #[serde(default, rename = "decimalLatitude")]
    pub latitude: Option<f64>,
    #[serde(default, rename = "decimalLongitude")]
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesSuggestion {
    pub key: Option<i64>,
    pub scientific_name: Option<String>,
    pub rank: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SpeciesSuggestEntry {
    #[serde(default)]
    pub key: Option<i64>,
    #[serde(default, rename = "scientificName")]
    pub scientific_name: Option<String>,
    #[serde(default)]
    pub rank: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccurrenceValidation {
    pub verified: bool,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OccurrenceSearchResponse {
    #[serde(default)]
    pub results: Vec<serde_json::Value>,
}
