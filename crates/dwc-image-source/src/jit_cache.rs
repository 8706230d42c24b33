use std::collections::HashMap;
use std::sync::Mutex;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use dwc_types::{CacheEntry, Sha256Hex};
use tracing::warn;

use crate::error::ImageSourceError;

/// TTL-bounded, size-bounded content-addressed local copy of images (§4.4).
///
/// Invariant: every live entry's file exists on disk AND
/// `now - cached_at <= ttl_seconds`; a violation found on read is a miss
/// plus a silent eviction of the stale metadata row.
pub struct JitCache {
    cache_dir: Utf8PathBuf,
    metadata_path: Utf8PathBuf,
    ttl_seconds: u64,
    max_size_bytes: u64,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl JitCache {
    pub fn open(
        cache_dir: impl Into<Utf8PathBuf>,
        ttl_seconds: u64,
        max_size_bytes: u64,
    ) -> Result<Self, ImageSourceError> {
        let cache_dir = cache_dir.into();
        std::fs::create_dir_all(&cache_dir).map_err(|source| ImageSourceError::Io {
            path: cache_dir.clone(),
            source,
        })?;
        let metadata_path = cache_dir.join("metadata.json");
        let entries = load_metadata(&metadata_path);
        Ok(Self {
            cache_dir,
            metadata_path,
            ttl_seconds,
            max_size_bytes,
            entries: Mutex::new(entries),
        })
    }

    fn shard_path(&self, sha: &Sha256Hex) -> Utf8PathBuf {
        dwc_fsutil::shard_path(&self.cache_dir, sha, "jpg")
    }

    /// Public form of the sharded destination path for `sha`, used by
    /// [`crate::cached::CachedSource`] to pick a download destination that
    /// matches where this cache will later look for it.
    #[must_use]
    pub fn shard_path_for(&self, sha: &Sha256Hex) -> Utf8PathBuf {
        self.shard_path(sha)
    }

    /// Returns the local path for a live entry, or `None` on a miss —
    /// including a silent eviction when the metadata is stale or the file
    /// has gone missing out from under us.
    #[must_use]
    pub fn get(&self, sha: &Sha256Hex) -> Option<Utf8PathBuf> {
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        let key = sha.as_str().to_string();
        let entry = entries.get(&key)?;
        let fresh = entry.is_fresh(Utc::now());
        let exists = Utf8Path::new(entry.local_path.as_str()).exists();
        if fresh && exists {
            return Some(entry.local_path.clone());
        }
        entries.remove(&key);
        drop(entries);
        let _ = self.persist();
        None
    }

    /// Record a freshly-downloaded file, evicting oldest entries first if
    /// the cache would exceed `max_size_bytes` (down to 90% of the limit).
    pub fn put(
        &self,
        sha: &Sha256Hex,
        local_path: Utf8PathBuf,
        size_bytes: u64,
        source: impl Into<String>,
    ) -> Result<(), ImageSourceError> {
        {
            let mut entries = self.entries.lock().expect("cache mutex poisoned");
            entries.insert(
                sha.as_str().to_string(),
                CacheEntry {
                    specimen_sha256: sha.clone(),
                    local_path,
                    cached_at: Utc::now(),
                    ttl_seconds: self.ttl_seconds,
                    source: source.into(),
                    size_bytes,
                },
            );
        }
        self.evict_if_over_budget()?;
        self.persist()
    }

    fn total_size(entries: &HashMap<String, CacheEntry>) -> u64 {
        entries.values().map(|e| e.size_bytes).sum()
    }

    fn evict_if_over_budget(&self) -> Result<(), ImageSourceError> {
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        if Self::total_size(&entries) <= self.max_size_bytes {
            return Ok(());
        }
        let target = (self.max_size_bytes as f64 * 0.9) as u64;
        let mut ordered: Vec<(String, CacheEntry)> = entries.drain().collect();
        ordered.sort_by_key(|(_, entry)| entry.cached_at);

        let mut kept = Vec::new();
        let mut running_total: u64 = ordered.iter().map(|(_, e)| e.size_bytes).sum();
        for (key, entry) in ordered {
            if running_total <= target {
                kept.push((key, entry));
                continue;
            }
            running_total = running_total.saturating_sub(entry.size_bytes);
            if Utf8Path::new(entry.local_path.as_str()).exists() {
                let _ = std::fs::remove_file(entry.local_path.as_std_path());
            }
        }
        *entries = kept.into_iter().collect();
        Ok(())
    }

    /// Best-effort metadata persistence, used on modification and at
    /// process end; corrupt metadata on the next open is treated as an
    /// empty cache rather than a hard error.
    pub fn persist(&self) -> Result<(), ImageSourceError> {
        let entries = self.entries.lock().expect("cache mutex poisoned");
        let snapshot: Vec<&CacheEntry> = entries.values().collect();
        let bytes = match serde_json::to_vec_pretty(&snapshot) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(error = %err, "failed to serialize JIT cache metadata");
                return Ok(());
            }
        };
        dwc_fsutil::write_file_atomic(&self.metadata_path, &bytes)?;
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache mutex poisoned").len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn load_metadata(path: &Utf8Path) -> HashMap<String, CacheEntry> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return HashMap::new();
    };
    match serde_json::from_str::<Vec<CacheEntry>>(&content) {
        Ok(list) => list
            .into_iter()
            .map(|entry| (entry.specimen_sha256.as_str().to_string(), entry))
            .collect(),
        Err(err) => {
            warn!(%path, error = %err, "corrupt JIT cache metadata, starting empty");
            HashMap::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn fresh_cache(ttl: u64, max_bytes: u64) -> (tempfile::TempDir, JitCache) {
        let dir = tempfile::tempdir().unwrap();
        let cache =
            JitCache::open(Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap(), ttl, max_bytes)
                .unwrap();
        (dir, cache)
    }

    #[test]
    fn miss_on_empty_cache() {
        let (_dir, cache) = fresh_cache(3600, 1_000_000);
        assert!(cache.get(&Sha256Hex::of(b"x")).is_none());
    }

    #[test]
    fn put_then_get_roundtrips() {
        let (dir, cache) = fresh_cache(3600, 1_000_000);
        let sha = Sha256Hex::of(b"x");
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .unwrap()
            .join("entry.jpg");
        std::fs::write(&path, b"bytes").unwrap();
        cache.put(&sha, path.clone(), 5, "s3").unwrap();

        assert_eq!(cache.get(&sha), Some(path));
    }

    #[test]
    fn expired_entry_is_a_miss_and_is_evicted() {
        let (dir, cache) = fresh_cache(10, 1_000_000);
        let sha = Sha256Hex::of(b"x");
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .unwrap()
            .join("entry.jpg");
        std::fs::write(&path, b"bytes").unwrap();

        {
            let mut entries = cache.entries.lock().unwrap();
            entries.insert(
                sha.as_str().to_string(),
                CacheEntry {
                    specimen_sha256: sha.clone(),
                    local_path: path,
                    cached_at: Utc::now() - Duration::seconds(3600),
                    ttl_seconds: 10,
                    source: "s3".to_string(),
                    size_bytes: 5,
                },
            );
        }

        assert!(cache.get(&sha).is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn over_budget_evicts_oldest_first() {
        let (dir, cache) = fresh_cache(3600, 10);
        let base = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();

        let old_sha = Sha256Hex::of(b"old");
        let old_path = base.join("old.jpg");
        std::fs::write(&old_path, [0u8; 6]).unwrap();
        cache.put(&old_sha, old_path.clone(), 6, "s3").unwrap();

        let new_sha = Sha256Hex::of(b"new");
        let new_path = base.join("new.jpg");
        std::fs::write(&new_path, [0u8; 6]).unwrap();
        cache.put(&new_sha, new_path, 6, "s3").unwrap();

        // 12 bytes > 10 byte budget; the older entry should be gone, the
        // newer one should remain, and its file should have been removed.
        assert!(cache.get(&old_sha).is_none());
        assert!(!old_path.exists());
    }

    #[test]
    fn corrupt_metadata_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let base = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        std::fs::write(base.join("metadata.json"), b"not json").unwrap();

        let cache = JitCache::open(base, 3600, 1_000_000).unwrap();
        assert!(cache.is_empty());
    }
}
