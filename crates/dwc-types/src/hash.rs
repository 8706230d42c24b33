//! Content-hash newtypes shared across the pipeline.
//!
//! Hashes flow through nearly every component (cache keys, provenance
//! fragment identifiers, dedup keys). A bare `String` makes it too easy to
//! pass a file path or an engine name where a hash is expected, so every
//! hash-shaped value in this crate is one of the types below.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a string is not a well-formed lower-case hex SHA-256.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid sha256 hex string: {0:?}")]
pub struct InvalidSha256(String);

/// A lower-case hex-encoded SHA-256 digest (64 characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sha256Hex(String);

impl Sha256Hex {
    /// Validate and construct from an owned string.
    pub fn new(s: impl Into<String>) -> Result<Self, InvalidSha256> {
        let s = s.into();
        if s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit()) {
            Ok(Self(s.to_ascii_lowercase()))
        } else {
            Err(InvalidSha256(s))
        }
    }

    /// Compute the SHA-256 digest of `bytes` and wrap it.
    pub fn of(bytes: &[u8]) -> Self {
        use sha256_impl::digest_hex;
        Self(digest_hex(bytes))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First `n` hex characters, used by the duplicate-detection phash
    /// stand-in (see `ProvenanceFragment` docs and §9 Open Questions).
    #[must_use]
    pub fn prefix(&self, n: usize) -> &str {
        &self.0[..n.min(self.0.len())]
    }
}

impl fmt::Display for Sha256Hex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Sha256Hex {
    type Err = InvalidSha256;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Sha256Hex {
    type Error = InvalidSha256;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Sha256Hex> for String {
    fn from(value: Sha256Hex) -> Self {
        value.0
    }
}

/// A canonical-JSON-derived hash of a params map (`dwc_types::Sha256Hex`
/// under the hood, kept as a distinct type so a params hash can never be
/// confused with a content hash at a call site).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamsHash(pub Sha256Hex);

impl fmt::Display for ParamsHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A provenance fragment identifier: SHA-256 over the fragment's canonical
/// `(type, source, operation:agent, output, timestamp)` tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FragmentId(pub Sha256Hex);

impl fmt::Display for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

mod sha256_impl {
    use sha2::{Digest, Sha256};

    pub fn digest_hex(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let digest = hasher.finalize();
        hex_encode(&digest)
    }

    fn hex_encode(bytes: &[u8]) -> String {
        const HEX: &[u8; 16] = b"0123456789abcdef";
        let mut out = String::with_capacity(bytes.len() * 2);
        for b in bytes {
            out.push(HEX[(b >> 4) as usize] as char);
            out.push(HEX[(b & 0x0f) as usize] as char);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn of_computes_sha256() {
        let hash = Sha256Hex::of(b"hello world");
        assert_eq!(
            hash.as_str(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde"
        );
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(Sha256Hex::new("abc").is_err());
    }

    #[test]
    fn rejects_non_hex() {
        let bad = "z".repeat(64);
        assert!(Sha256Hex::new(bad).is_err());
    }

    #[test]
    fn lowercases_input() {
        let upper = "B".repeat(64);
        let hash = Sha256Hex::new(upper).unwrap();
        assert_eq!(hash.as_str(), "b".repeat(64));
    }

    #[test]
    fn prefix_truncates() {
        let hash = Sha256Hex::of(b"hello world");
        assert_eq!(hash.prefix(16).len(), 16);
        assert_eq!(hash.prefix(1000), hash.as_str());
    }
}
