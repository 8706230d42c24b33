use std::sync::Mutex;

use dwc_types::Sha256Hex;

/// Stand-in for a real perceptual-image-hash algorithm (§4.6: "an
/// intentionally cheap stand-in; swap-in of a real perceptual hash is an
/// extension point"). Kept as a trait so [`Sha256PrefixHash`] can later be
/// replaced without touching [`DuplicateCatalog`] or the orchestrator.
pub trait PerceptualHash: Send + Sync {
    fn hash(&self, sha: &Sha256Hex) -> u64;
}

/// The hash named by the spec: the first 16 hex characters of the content
/// sha, read as a 64-bit integer.
pub struct Sha256PrefixHash;

impl PerceptualHash for Sha256PrefixHash {
    fn hash(&self, sha: &Sha256Hex) -> u64 {
        u64::from_str_radix(sha.prefix(16), 16).unwrap_or(0)
    }
}

/// Per-run duplicate-image catalog (§4.6). Exact sha matches flag
/// `duplicate:sha256`; near matches under the configured popcount
/// threshold flag `duplicate:phash`. The current sha is recorded
/// regardless of outcome so later specimens can match against it.
pub struct DuplicateCatalog {
    hasher: Box<dyn PerceptualHash>,
    threshold: u32,
    seen: Mutex<Vec<(Sha256Hex, u64)>>,
}

impl DuplicateCatalog {
    #[must_use]
    pub fn new(threshold: u32) -> Self {
        Self::with_hasher(Box::new(Sha256PrefixHash), threshold)
    }

    #[must_use]
    pub fn with_hasher(hasher: Box<dyn PerceptualHash>, threshold: u32) -> Self {
        Self {
            hasher,
            threshold,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Checks `sha` against every previously recorded image in this run,
    /// then records it. Returns the duplicate flag to append to the
    /// specimen's DwC record, if any.
    pub fn check_and_record(&self, sha: &Sha256Hex) -> Option<String> {
        let hash = self.hasher.hash(sha);
        let mut seen = self.seen.lock().expect("duplicate catalog mutex poisoned");

        let mut flag = None;
        for (prior_sha, prior_hash) in seen.iter() {
            if prior_sha == sha {
                flag = Some("duplicate:sha256".to_string());
                break;
            }
            if flag.is_none() && (prior_hash ^ hash).count_ones() <= self.threshold {
                flag = Some("duplicate:phash".to_string());
            }
        }

        seen.push((sha.clone(), hash));
        flag
    }
}

/// A full label photograph runs to roughly this many recognized OCR
/// tokens; used only as the denominator for the scan-coverage estimate
/// below (§4.6, §9 Open Questions — the spec does not define how
/// `scan_pct` is computed from engine output, since per-token bounding
/// boxes aren't part of the engine contract).
const EXPECTED_TOKEN_COUNT: usize = 40;

/// Estimate scan coverage as a percentage from the OCR token count,
/// clamped to `[0, 100]`. A placeholder for a real geometric
/// bounding-box-based coverage computation, kept behind a plain function
/// so it is easy to replace.
#[must_use]
pub fn estimate_scan_pct(token_count: usize) -> f32 {
    ((token_count as f32 / EXPECTED_TOKEN_COUNT as f32) * 100.0).min(100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_sha_match_flags_duplicate_sha256() {
        let catalog = DuplicateCatalog::new(2);
        let sha = Sha256Hex::of(b"image-a");
        assert_eq!(catalog.check_and_record(&sha), None);
        assert_eq!(catalog.check_and_record(&sha), Some("duplicate:sha256".to_string()));
    }

    #[test]
    fn distinct_shas_under_popcount_threshold_flag_phash() {
        struct FixedHash(u64, u64);
        impl PerceptualHash for FixedHash {
            fn hash(&self, sha: &Sha256Hex) -> u64 {
                if sha.as_str().starts_with('a') {
                    self.0
                } else {
                    self.1
                }
            }
        }
        // differ in exactly one bit
        let catalog = DuplicateCatalog::with_hasher(Box::new(FixedHash(0b1010, 0b1011)), 1);
        let sha_a = Sha256Hex::of(b"a-image");
        let sha_b = Sha256Hex::of(b"b-image");
        assert_eq!(catalog.check_and_record(&sha_a), None);
        assert_eq!(catalog.check_and_record(&sha_b), Some("duplicate:phash".to_string()));
    }

    #[test]
    fn dissimilar_images_are_not_flagged() {
        struct FixedHash(u64, u64);
        impl PerceptualHash for FixedHash {
            fn hash(&self, sha: &Sha256Hex) -> u64 {
                if sha.as_str().starts_with('a') {
                    self.0
                } else {
                    self.1
                }
            }
        }
        let catalog = DuplicateCatalog::with_hasher(Box::new(FixedHash(0x0, 0xFFFF_FFFF)), 2);
        let sha_a = Sha256Hex::of(b"a-image");
        let sha_b = Sha256Hex::of(b"b-image");
        assert_eq!(catalog.check_and_record(&sha_a), None);
        assert_eq!(catalog.check_and_record(&sha_b), None);
    }

    #[test]
    fn scan_pct_is_clamped_to_one_hundred() {
        assert_eq!(estimate_scan_pct(0), 0.0);
        assert_eq!(estimate_scan_pct(1000), 100.0);
        assert!((estimate_scan_pct(20) - 50.0).abs() < 1e-6);
    }
}
