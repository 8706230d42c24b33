use std::sync::Arc;

use dwc_types::Sha256Hex;
use tokio::sync::Semaphore;
use tracing::warn;

use crate::cached::CachedSource;
use crate::error::ImageSourceError;

/// One specimen's warmup outcome; failures are reported, not propagated,
/// so one bad image can't cancel the rest of the batch (§4.4).
pub struct WarmupResult {
    pub sha: Sha256Hex,
    pub outcome: Result<(), ImageSourceError>,
}

/// Download `shas` into the cache with up to `max_workers` concurrent
/// downloads. Per-item failures are collected into the result list rather
/// than aborting the batch.
pub async fn warmup(
    cached: Arc<CachedSource>,
    shas: Vec<Sha256Hex>,
    max_workers: usize,
) -> Vec<WarmupResult> {
    let semaphore = Arc::new(Semaphore::new(max_workers.max(1)));
    let mut tasks = Vec::with_capacity(shas.len());

    for sha in shas {
        let cached = cached.clone();
        let semaphore = semaphore.clone();
        tasks.push(tokio::spawn(async move {
            let _permit = semaphore
                .acquire()
                .await
                .expect("semaphore is never closed during warmup");
            let outcome = cached.get(&sha, true).await.map(|_| ());
            WarmupResult { sha, outcome }
        }));
    }

    let mut results = Vec::with_capacity(tasks.len());
    for task in tasks {
        match task.await {
            Ok(result) => results.push(result),
            Err(join_err) => {
                warn!(error = %join_err, "warmup task panicked");
            }
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jit_cache::JitCache;
    use crate::registry::NullRegistry;
    use crate::source_trait::ImageSource;
    use async_trait::async_trait;
    use camino::Utf8PathBuf;

    struct AlwaysFailsFor(Sha256Hex);

    #[async_trait]
    impl ImageSource for AlwaysFailsFor {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn resolve_path(&self, _sha: &Sha256Hex) -> Option<String> {
            None
        }

        async fn download(
            &self,
            sha: &Sha256Hex,
            dest: &camino::Utf8Path,
        ) -> Result<bool, ImageSourceError> {
            if *sha == self.0 {
                return Err(ImageSourceError::NotFound(sha.as_str().to_string()));
            }
            tokio::fs::write(dest, b"bytes").await.unwrap();
            Ok(true)
        }

        async fn exists(&self, _sha: &Sha256Hex) -> Result<bool, ImageSourceError> {
            Ok(true)
        }
    }

    #[tokio::test]
    async fn one_failure_does_not_cancel_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(
            JitCache::open(
                Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap(),
                3600,
                10_000_000,
            )
            .unwrap(),
        );
        let bad = Sha256Hex::of(b"bad");
        let good = Sha256Hex::of(b"good");
        let source = Arc::new(AlwaysFailsFor(bad.clone()));
        let cached = Arc::new(CachedSource::new(source, cache, Arc::new(NullRegistry)));

        let results = warmup(cached, vec![bad.clone(), good.clone()], 2).await;
        assert_eq!(results.len(), 2);
        let bad_result = results.iter().find(|r| r.sha == bad).unwrap();
        let good_result = results.iter().find(|r| r.sha == good).unwrap();
        assert!(bad_result.outcome.is_err());
        assert!(good_result.outcome.is_ok());
    }
}
