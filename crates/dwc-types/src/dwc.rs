//! Darwin Core record value object (C7 output shape).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A normalized Darwin Core occurrence record: canonical term -> string
/// value, plus derived flags and per-field confidence.
///
/// `BTreeMap` keeps term iteration order deterministic without relying on
/// insertion order, which matters for stable CSV/JSON test fixtures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DwcRecord {
    pub fields: BTreeMap<String, String>,
    /// Semicolon-joined marker strings, in the order they were appended.
    pub flags: Vec<String>,
    pub field_confidence: BTreeMap<String, f32>,
}

impl DwcRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, term: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(term.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, term: &str) -> Option<&str> {
        self.fields.get(term).map(String::as_str)
    }

    pub fn add_flag(&mut self, flag: impl Into<String>) {
        self.flags.push(flag.into());
    }

    #[must_use]
    pub fn flags_joined(&self) -> String {
        self.flags.join(";")
    }

    #[must_use]
    pub fn mean_confidence(&self) -> f32 {
        if self.field_confidence.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.field_confidence.values().sum();
        sum / self.field_confidence.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_joined_is_semicolon_separated() {
        let mut rec = DwcRecord::new();
        rec.add_flag("missing:catalogNumber");
        rec.add_flag("invalid:eventDate");
        assert_eq!(rec.flags_joined(), "missing:catalogNumber;invalid:eventDate");
    }

    #[test]
    fn mean_confidence_of_empty_is_zero() {
        assert_eq!(DwcRecord::new().mean_confidence(), 0.0);
    }

    #[test]
    fn mean_confidence_averages_fields() {
        let mut rec = DwcRecord::new();
        rec.field_confidence.insert("a".into(), 0.8);
        rec.field_confidence.insert("b".into(), 0.4);
        assert!((rec.mean_confidence() - 0.6).abs() < 1e-6);
    }
}
