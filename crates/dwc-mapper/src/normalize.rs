use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Canonical institution code aliases. Missing mappings pass the input
/// through unchanged (§4.7).
static INSTITUTION_CODE_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("nyb", "NYBG"),
        ("ny botanical garden", "NYBG"),
        ("us natl herbarium", "US"),
        ("us national herbarium", "US"),
        ("mo bot garden", "MO"),
        ("missouri botanical garden", "MO"),
        ("harvard university herbaria", "HUH"),
    ])
});

static BASIS_OF_RECORD_VOCAB: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("specimen", "PreservedSpecimen"),
        ("preserved specimen", "PreservedSpecimen"),
        ("herbarium sheet", "PreservedSpecimen"),
        ("living specimen", "LivingSpecimen"),
        ("fossil", "FossilSpecimen"),
        ("fossil specimen", "FossilSpecimen"),
        ("human observation", "HumanObservation"),
        ("observation", "HumanObservation"),
    ])
});

static TYPE_STATUS_VOCAB: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("holotype", "Holotype"),
        ("isotype", "Isotype"),
        ("paratype", "Paratype"),
        ("syntype", "Syntype"),
        ("lectotype", "Lectotype"),
        ("neotype", "Neotype"),
        ("not a type", "NotATypeSpecimen"),
        ("none", "NotATypeSpecimen"),
    ])
});

fn normalize_via(table: &HashMap<&'static str, &'static str>, value: &str) -> String {
    table
        .get(value.trim().to_lowercase().as_str())
        .map(|canonical| (*canonical).to_string())
        .unwrap_or_else(|| value.to_string())
}

/// Normalize an `institutionCode`/`ownerInstitutionCode` value against the
/// canonical alias table (§4.7).
#[must_use]
pub fn normalize_institution_code(value: &str) -> String {
    normalize_via(&INSTITUTION_CODE_ALIASES, value)
}

/// Normalize a `basisOfRecord` value against the controlled vocabulary.
#[must_use]
pub fn normalize_basis_of_record(value: &str) -> String {
    normalize_via(&BASIS_OF_RECORD_VOCAB, value)
}

/// Normalize a `typeStatus` value against the controlled vocabulary.
#[must_use]
pub fn normalize_type_status(value: &str) -> String {
    normalize_via(&TYPE_STATUS_VOCAB, value)
}

/// Apply the right normalization for `term`, if any is defined; otherwise
/// pass `value` through unchanged.
#[must_use]
pub fn normalize_field(term: &str, value: &str) -> String {
    match term {
        "institutionCode" | "ownerInstitutionCode" => normalize_institution_code(value),
        "basisOfRecord" => normalize_basis_of_record(value),
        "typeStatus" => normalize_type_status(value),
        _ => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn institution_code_alias_is_case_insensitive() {
        assert_eq!(normalize_institution_code("NYB"), "NYBG");
        assert_eq!(normalize_institution_code("ny botanical garden"), "NYBG");
    }

    #[test]
    fn unknown_institution_code_passes_through() {
        assert_eq!(normalize_institution_code("XYZ"), "XYZ");
    }

    #[test]
    fn basis_of_record_maps_to_controlled_vocab() {
        assert_eq!(normalize_basis_of_record("herbarium sheet"), "PreservedSpecimen");
    }

    #[test]
    fn type_status_maps_to_controlled_vocab() {
        assert_eq!(normalize_type_status("Holotype"), "Holotype");
        assert_eq!(normalize_type_status("none"), "NotATypeSpecimen");
    }

    #[test]
    fn normalize_field_dispatches_by_term_name() {
        assert_eq!(normalize_field("institutionCode", "nyb"), "NYBG");
        assert_eq!(normalize_field("recordedBy", "J. Smith"), "J. Smith");
    }
}
