use camino::Utf8PathBuf;
use dwc_types::Sha256Hex;

/// Where a specimen index (or any other identity layer) has previously
/// recorded this image living, so [`crate::cached::CachedSource`] can
/// rehydrate from a known cache location without re-downloading (§4.4 step
/// 2). Kept as a narrow trait rather than a hard dependency on
/// `dwc-specimen-index` so this crate stays usable standalone.
pub trait SourceRegistry: Send + Sync {
    fn cached_location(&self, sha: &Sha256Hex) -> Option<Utf8PathBuf>;
    fn register_cache_location(&self, sha: &Sha256Hex, path: &Utf8PathBuf);
    fn register_source_location(&self, sha: &Sha256Hex, source_name: &str, location: &str);
}

/// A registry that never has prior knowledge and discards updates; used
/// when no specimen index is wired in (tests, ad hoc scripts).
#[derive(Debug, Default)]
pub struct NullRegistry;

impl SourceRegistry for NullRegistry {
    fn cached_location(&self, _sha: &Sha256Hex) -> Option<Utf8PathBuf> {
        None
    }

    fn register_cache_location(&self, _sha: &Sha256Hex, _path: &Utf8PathBuf) {}

    fn register_source_location(&self, _sha: &Sha256Hex, _source_name: &str, _location: &str) {}
}
