//! Persistent OCR result store with upsert (merge) semantics (§4.3).
//!
//! One JSON file per cache key under `cache_dir`, mirroring the teacher's
//! `InsightCache` (in-memory map backed by per-key disk files, BLAKE3/sha
//! keyed); writes go through `dwc-fsutil`'s atomic write so a crash never
//! leaves a half-written cache entry.

use std::collections::HashMap;
use std::sync::Mutex;

use camino::{Utf8Path, Utf8PathBuf};
use dwc_types::{OcrCacheKey, OcrResult};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum OcrCacheError {
    #[error("failed to read cache entry {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write cache entry: {0}")]
    Write(#[from] dwc_fsutil::AtomicWriteError),
    #[error("malformed cache entry {path}: {source}")]
    Malformed {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
}

pub struct OcrCache {
    cache_dir: Utf8PathBuf,
    memory: Mutex<HashMap<String, OcrResult>>,
    stats: Mutex<CacheStats>,
}

impl OcrCache {
    pub fn new(cache_dir: impl Into<Utf8PathBuf>) -> Result<Self, OcrCacheError> {
        let cache_dir = cache_dir.into();
        std::fs::create_dir_all(&cache_dir).map_err(|source| OcrCacheError::Read {
            path: cache_dir.clone(),
            source,
        })?;
        Ok(Self {
            cache_dir,
            memory: Mutex::new(HashMap::new()),
            stats: Mutex::new(CacheStats::default()),
        })
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        *self.stats.lock().expect("cache mutex poisoned")
    }

    fn entry_path(&self, key: &OcrCacheKey) -> Utf8PathBuf {
        self.cache_dir.join(format!("{}.json", file_stem(key)))
    }

    /// The cache is consulted before dispatching an OCR engine; a hit
    /// bypasses the engine entirely (§4.3, §4.6).
    pub fn get(&self, key: &OcrCacheKey) -> Result<Option<OcrResult>, OcrCacheError> {
        let cache_key = file_stem(key);
        {
            let memory = self.memory.lock().expect("cache mutex poisoned");
            if let Some(hit) = memory.get(&cache_key) {
                self.stats.lock().expect("cache mutex poisoned").hits += 1;
                return Ok(Some(hit.clone()));
            }
        }

        let path = self.entry_path(key);
        if !path.exists() {
            self.stats.lock().expect("cache mutex poisoned").misses += 1;
            return Ok(None);
        }

        match load_entry(&path) {
            Ok(result) => {
                self.memory
                    .lock()
                    .expect("cache mutex poisoned")
                    .insert(cache_key, result.clone());
                self.stats.lock().expect("cache mutex poisoned").hits += 1;
                Ok(Some(result))
            }
            Err(err) => {
                warn!(%path, error = %err, "corrupt OCR cache entry, treating as miss");
                self.stats.lock().expect("cache mutex poisoned").misses += 1;
                Ok(None)
            }
        }
    }

    /// Unconditional write, including failed results (`error=true`) so
    /// future runs can choose to retry or skip (§4.3). Entries are never
    /// auto-expired; eviction is manual via [`OcrCache::evict`].
    pub fn upsert(&self, key: &OcrCacheKey, result: OcrResult) -> Result<(), OcrCacheError> {
        let cache_key = file_stem(key);
        let path = self.entry_path(key);
        let bytes = serde_json::to_vec_pretty(&result).expect("OcrResult always serializes");
        dwc_fsutil::write_file_atomic(&path, &bytes)?;

        self.memory
            .lock()
            .expect("cache mutex poisoned")
            .insert(cache_key, result);
        self.stats.lock().expect("cache mutex poisoned").writes += 1;
        Ok(())
    }

    /// Manual eviction of a single entry (§4.3: "eviction is manual").
    pub fn evict(&self, key: &OcrCacheKey) -> std::io::Result<()> {
        let cache_key = file_stem(key);
        self.memory
            .lock()
            .expect("cache mutex poisoned")
            .remove(&cache_key);
        let path = self.entry_path(key);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

fn file_stem(key: &OcrCacheKey) -> String {
    match &key.engine_version {
        Some(version) => format!("{}_{}_{}", key.specimen_sha256.as_str(), key.engine, version),
        None => format!("{}_{}", key.specimen_sha256.as_str(), key.engine),
    }
}

fn load_entry(path: &Utf8Path) -> Result<OcrResult, OcrCacheError> {
    let content = std::fs::read_to_string(path).map_err(|source| OcrCacheError::Read {
        path: path.to_owned(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| OcrCacheError::Malformed {
        path: path.to_owned(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dwc_types::Sha256Hex;

    fn sample_key(engine: &str) -> OcrCacheKey {
        OcrCacheKey::new(
            Sha256Hex::of(b"specimen-bytes"),
            engine.to_string(),
            None,
        )
    }

    fn sample_result(text: &str) -> OcrResult {
        OcrResult {
            extracted_text: text.to_string(),
            confidence: 0.9,
            error: false,
            ocr_timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn miss_then_hit_after_upsert() {
        let dir = tempfile::tempdir().unwrap();
        let cache = OcrCache::new(Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap())
            .unwrap();
        let key = sample_key("tesseract");

        assert!(cache.get(&key).unwrap().is_none());
        assert_eq!(cache.stats().misses, 1);

        cache.upsert(&key, sample_result("Herbarium specimen")).unwrap();
        let hit = cache.get(&key).unwrap().unwrap();
        assert_eq!(hit.extracted_text, "Herbarium specimen");
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().writes, 1);
    }

    #[test]
    fn failed_results_are_cached_unconditionally() {
        let dir = tempfile::tempdir().unwrap();
        let cache = OcrCache::new(Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap())
            .unwrap();
        let key = sample_key("paddleocr");

        let mut failed = sample_result("");
        failed.error = true;
        cache.upsert(&key, failed).unwrap();

        let hit = cache.get(&key).unwrap().unwrap();
        assert!(hit.error);
    }

    #[test]
    fn persists_across_cache_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let key = sample_key("tesseract");

        {
            let cache = OcrCache::new(path.clone()).unwrap();
            cache.upsert(&key, sample_result("first run")).unwrap();
        }

        let cache2 = OcrCache::new(path).unwrap();
        let hit = cache2.get(&key).unwrap().unwrap();
        assert_eq!(hit.extracted_text, "first run");
    }

    #[test]
    fn distinct_engine_versions_are_distinct_keys() {
        let dir = tempfile::tempdir().unwrap();
        let cache = OcrCache::new(Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap())
            .unwrap();
        let sha = Sha256Hex::of(b"specimen-bytes");
        let v1 = OcrCacheKey::new(sha.clone(), "tesseract".to_string(), Some("5.0".to_string()));
        let v2 = OcrCacheKey::new(sha, "tesseract".to_string(), Some("5.1".to_string()));

        cache.upsert(&v1, sample_result("v5.0 text")).unwrap();
        assert!(cache.get(&v2).unwrap().is_none());
    }
}
