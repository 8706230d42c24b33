use std::collections::BTreeSet;

use dwc_types::DwcRecord;
use once_cell::sync::Lazy;
use regex::Regex;

static EVENT_DATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("static regex is valid"));

const TRUNCATE_AT: usize = 3;

/// Validation inputs beyond the record itself: which terms are required,
/// and (if schema information is available) which terms are known/
/// deprecated in the targeted schema(s) (§4.7).
#[derive(Debug, Clone, Default)]
pub struct ValidationContext {
    pub required_terms: Vec<String>,
    pub known_terms: Option<BTreeSet<String>>,
    pub deprecated_terms: BTreeSet<String>,
}

/// Append validation flags to `record.flags`, in the fixed order the spec
/// enumerates them (§4.7). Never rejects — only annotates.
pub fn apply_validation_flags(record: &mut DwcRecord, context: &ValidationContext) {
    let missing: Vec<&str> = context
        .required_terms
        .iter()
        .map(String::as_str)
        .filter(|term| record.get(term).map(str::is_empty).unwrap_or(true))
        .collect();
    if !missing.is_empty() {
        record.add_flag(format!("missing:{}", missing.join(",")));
    }

    if let Some(event_date) = record.get("eventDate") {
        if !event_date.is_empty() && !EVENT_DATE_PATTERN.is_match(event_date) {
            record.add_flag("invalid:eventDate");
        }
    }

    if let Some(known_terms) = &context.known_terms {
        let mut invalid: Vec<&str> = record
            .fields
            .keys()
            .map(String::as_str)
            .filter(|term| !known_terms.contains(*term))
            .collect();
        invalid.sort_unstable();
        if !invalid.is_empty() {
            record.add_flag(format!("invalid_fields:{}", truncated(&invalid)));
        }
    }

    let mut deprecated: Vec<&str> = record
        .fields
        .keys()
        .map(String::as_str)
        .filter(|term| context.deprecated_terms.contains(*term))
        .collect();
    deprecated.sort_unstable();
    if !deprecated.is_empty() {
        record.add_flag(format!("deprecated_fields:{}", truncated(&deprecated)));
    }
}

fn truncated(terms: &[&str]) -> String {
    terms
        .iter()
        .take(TRUNCATE_AT)
        .copied()
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_missing_required_terms() {
        let mut record = DwcRecord::new();
        record.set("scientificName", "Quercus alba");
        let context = ValidationContext {
            required_terms: vec!["catalogNumber".to_string(), "scientificName".to_string()],
            ..Default::default()
        };
        apply_validation_flags(&mut record, &context);
        assert_eq!(record.flags, vec!["missing:catalogNumber".to_string()]);
    }

    #[test]
    fn flags_invalid_event_date() {
        let mut record = DwcRecord::new();
        record.set("eventDate", "May 3rd 1990");
        apply_validation_flags(&mut record, &ValidationContext::default());
        assert!(record.flags.contains(&"invalid:eventDate".to_string()));
    }

    #[test]
    fn well_formed_event_date_is_not_flagged() {
        let mut record = DwcRecord::new();
        record.set("eventDate", "1990-05-03");
        apply_validation_flags(&mut record, &ValidationContext::default());
        assert!(!record.flags.iter().any(|f| f.starts_with("invalid:eventDate")));
    }

    #[test]
    fn invalid_fields_truncated_to_three() {
        let mut record = DwcRecord::new();
        for term in ["a", "b", "c", "d"] {
            record.set(term, "x");
        }
        let context = ValidationContext {
            known_terms: Some(BTreeSet::new()),
            ..Default::default()
        };
        apply_validation_flags(&mut record, &context);
        let flag = record
            .flags
            .iter()
            .find(|f| f.starts_with("invalid_fields:"))
            .unwrap();
        assert_eq!(flag, "invalid_fields:a,b,c");
    }

    #[test]
    fn deprecated_fields_are_flagged() {
        let mut record = DwcRecord::new();
        record.set("individualID", "42");
        let context = ValidationContext {
            deprecated_terms: BTreeSet::from(["individualID".to_string()]),
            ..Default::default()
        };
        apply_validation_flags(&mut record, &context);
        assert_eq!(record.flags, vec!["deprecated_fields:individualID".to_string()]);
    }
}
