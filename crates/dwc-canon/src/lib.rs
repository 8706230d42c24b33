//! Canonical JSON hashing shared by the params-hash (C5) and provenance
//! fragment id (C10) computations.
//!
//! Both need the same property: the same logical map hashes to the same
//! digest regardless of key insertion order. We get that from
//! `serde_json_canonicalizer` (JCS, RFC 8785) rather than hand-rolling a
//! sorted-keys serializer, the same dependency the teacher workspace uses
//! for receipt emission.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use dwc_types::{FragmentId, Sha256Hex};

#[derive(Debug, Error)]
pub enum CanonError {
    #[error("failed to serialize value to JSON: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to canonicalize JSON: {0}")]
    Canonicalize(String),
}

/// Serialize `value` to canonical JSON (JCS) bytes.
pub fn canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, CanonError> {
    let as_value = serde_json::to_value(value)?;
    serde_json_canonicalizer::to_vec(&as_value)
        .map_err(|e| CanonError::Canonicalize(e.to_string()))
}

/// SHA-256 over the canonical JSON form of `value`.
pub fn hash_canonical<T: Serialize>(value: &T) -> Result<Sha256Hex, CanonError> {
    let bytes = canonical_json_bytes(value)?;
    Ok(Sha256Hex::of(&bytes))
}

/// `params_hash`: canonical JSON serialization of the params map with
/// sorted keys, then SHA-256 (§4.5). `BTreeMap` already sorts keys; JCS
/// canonicalization additionally normalizes number/string formatting.
pub fn params_hash(
    params: &BTreeMap<String, serde_json::Value>,
) -> Result<Sha256Hex, CanonError> {
    hash_canonical(params)
}

/// The tuple a provenance fragment id is computed over (§3 data model):
/// `(type, source_identifier, "{operation}:{agent_id}", output_identifier,
/// timestamp)`, rendered as canonical JSON.
#[derive(Serialize)]
struct FragmentIdTuple<'a> {
    fragment_type: &'a str,
    source_identifier: &'a str,
    operation_agent: String,
    output_identifier: &'a str,
    timestamp: DateTime<Utc>,
}

/// Compute a deterministic `FragmentId` from a fragment's identity fields.
pub fn fragment_id(
    fragment_type: &str,
    source_identifier: &str,
    operation: &str,
    agent_id: &str,
    output_identifier: &str,
    timestamp: DateTime<Utc>,
) -> Result<FragmentId, CanonError> {
    let tuple = FragmentIdTuple {
        fragment_type,
        source_identifier,
        operation_agent: format!("{operation}:{agent_id}"),
        output_identifier,
        timestamp,
    };
    Ok(FragmentId(hash_canonical(&tuple)?))
}
