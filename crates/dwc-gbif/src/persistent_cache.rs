use std::collections::HashMap;

use camino::Utf8PathBuf;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::GbifError;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    value: serde_json::Value,
    cached_at: DateTime<Utc>,
}

/// Persistent JSON cache of taxonomy matches keyed by canonical scientific
/// name (lowercase, trimmed), TTL-bounded, atomically written. Used by the
/// review-side validator so repeat lookups of the same name don't re-hit
/// GBIF across process runs (§4.9).
pub struct PersistentCache {
    path: Utf8PathBuf,
    ttl: Duration,
    entries: HashMap<String, CacheEntry>,
}

impl PersistentCache {
    pub fn open(path: impl Into<Utf8PathBuf>, ttl_days: i64) -> Self {
        let path = path.into();
        let entries = load(&path);
        Self {
            path,
            ttl: Duration::days(ttl_days),
            entries,
        }
    }

    fn key(name: &str) -> String {
        name.trim().to_lowercase()
    }

    #[must_use]
    pub fn get(&self, scientific_name: &str) -> Option<serde_json::Value> {
        let entry = self.entries.get(&Self::key(scientific_name))?;
        if Utc::now().signed_duration_since(entry.cached_at) > self.ttl {
            return None;
        }
        Some(entry.value.clone())
    }

    pub fn put(&mut self, scientific_name: &str, value: serde_json::Value) -> Result<(), GbifError> {
        self.entries.insert(
            Self::key(scientific_name),
            CacheEntry {
                value,
                cached_at: Utc::now(),
            },
        );
        self.persist()
    }

    fn persist(&self) -> Result<(), GbifError> {
        let bytes = serde_json::to_vec_pretty(&self.entries)?;
        dwc_fsutil::write_file_atomic(&self.path, &bytes)?;
        Ok(())
    }
}

fn load(path: &Utf8PathBuf) -> HashMap<String, CacheEntry> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return HashMap::new();
    };
    match serde_json::from_str(&content) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(%path, error = %err, "corrupt GBIF persistent cache, starting empty");
            HashMap::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn miss_on_empty_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PersistentCache::open(
            Utf8PathBuf::from_path_buf(dir.path().join("gbif.json")).unwrap(),
            30,
        );
        assert!(cache.get("Quercus alba").is_none());
    }

    #[test]
    fn key_is_case_and_whitespace_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = PersistentCache::open(
            Utf8PathBuf::from_path_buf(dir.path().join("gbif.json")).unwrap(),
            30,
        );
        cache.put("Quercus alba", json!({"taxonKey": 1})).unwrap();
        assert_eq!(cache.get("  QUERCUS ALBA  "), Some(json!({"taxonKey": 1})));
    }

    #[test]
    fn persists_across_cache_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("gbif.json")).unwrap();
        {
            let mut cache = PersistentCache::open(path.clone(), 30);
            cache.put("Quercus alba", json!({"taxonKey": 1})).unwrap();
        }
        let cache = PersistentCache::open(path, 30);
        assert_eq!(cache.get("Quercus alba"), Some(json!({"taxonKey": 1})));
    }

    #[test]
    fn expired_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = PersistentCache::open(
            Utf8PathBuf::from_path_buf(dir.path().join("gbif.json")).unwrap(),
            -1,
        );
        cache.put("Quercus alba", json!({"taxonKey": 1})).unwrap();
        assert!(cache.get("Quercus alba").is_none());
    }
}
