use std::sync::Arc;

use dwc_types::Sha256Hex;

use crate::error::ImageSourceError;
use crate::jit_cache::JitCache;
use crate::registry::SourceRegistry;
use crate::source_trait::ImageSource;

/// Given a `Source + Cache + Registry`, produces a component that resolves
/// a specimen image to a local path, downloading and caching on demand
/// (§4.4).
pub struct CachedSource {
    source: Arc<dyn ImageSource>,
    cache: Arc<JitCache>,
    registry: Arc<dyn SourceRegistry>,
}

impl CachedSource {
    #[must_use]
    pub fn new(
        source: Arc<dyn ImageSource>,
        cache: Arc<JitCache>,
        registry: Arc<dyn SourceRegistry>,
    ) -> Self {
        Self {
            source,
            cache,
            registry,
        }
    }

    /// Resolve `sha` to a local path, per §4.4's four-step algorithm:
    /// 1. cache hit -> return it.
    /// 2. known cache location registered elsewhere and the file exists ->
    ///    rehydrate and return it.
    /// 3. otherwise download through the source, register both locations.
    /// 4. `downloads_allowed = false` short-circuits step 3 with a miss.
    pub async fn get(
        &self,
        sha: &Sha256Hex,
        downloads_allowed: bool,
    ) -> Result<Option<camino::Utf8PathBuf>, ImageSourceError> {
        if let Some(hit) = self.cache.get(sha) {
            return Ok(Some(hit));
        }

        if let Some(known) = self.registry.cached_location(sha) {
            if known.exists() {
                self.cache.put(sha, known.clone(), file_size(&known), "registry")?;
                return Ok(Some(known));
            }
        }

        if !downloads_allowed {
            return Ok(None);
        }

        let dest = self.cache_path_for(sha);
        let downloaded = self.source.download(sha, &dest).await?;
        if !downloaded {
            return Ok(None);
        }

        let size = file_size(&dest);
        self.cache.put(sha, dest.clone(), size, self.source.name())?;
        self.registry.register_cache_location(sha, &dest);
        if let Some(location) = self.source.resolve_path(sha).await {
            self.registry
                .register_source_location(sha, self.source.name(), &location);
        }
        Ok(Some(dest))
    }

    fn cache_path_for(&self, sha: &Sha256Hex) -> camino::Utf8PathBuf {
        // Delegate to the same sharded layout the cache itself uses so a
        // rehydrated registry location and a freshly downloaded one land in
        // the same place.
        self.cache.shard_path_for(sha)
    }

    /// Registers a file the caller already has on local disk (e.g. one
    /// found by walking an input directory rather than fetched through
    /// `download`), so later callers can resolve it by `sha` alone via
    /// [`Self::get`] without touching the original location again.
    pub fn register_known_local(
        &self,
        sha: &Sha256Hex,
        path: &camino::Utf8Path,
    ) -> Result<(), ImageSourceError> {
        self.cache.put(sha, path.to_path_buf(), file_size(path), "local-enumerated")?;
        self.registry.register_cache_location(sha, &path.to_path_buf());
        Ok(())
    }
}

fn file_size(path: &camino::Utf8Path) -> u64 {
    std::fs::metadata(path.as_std_path()).map(|m| m.len()).unwrap_or(0)
}
