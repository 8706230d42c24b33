use async_trait::async_trait;
use camino::Utf8Path;
use dwc_types::Sha256Hex;

use crate::error::ImageSourceError;

/// Capability set every image source variant implements (§4.4).
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// A human-readable name for this source, used in provenance/cache
    /// bookkeeping (e.g. `"local"`, `"s3"`, `"http"`).
    fn name(&self) -> &str;

    /// Resolve a URI/path for `sha` within this source, without fetching
    /// bytes. `None` if this source has no opinion on where the image
    /// lives (e.g. an HTTP source that only knows how to construct a URL
    /// lazily at download time may still return `Some`).
    async fn resolve_path(&self, sha: &Sha256Hex) -> Option<String>;

    /// Fetch the image's bytes into `dest`, returning `true` on success and
    /// `false` if this source doesn't have the image (a `Multi` source
    /// tries the next member on `false`; transport errors are propagated).
    async fn download(&self, sha: &Sha256Hex, dest: &Utf8Path) -> Result<bool, ImageSourceError>;

    /// Cheaper existence check where the source can answer it without a
    /// full download (HEAD request, `stat`, shard path probe).
    async fn exists(&self, sha: &Sha256Hex) -> Result<bool, ImageSourceError>;
}
