use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use dwc_types::Sha256Hex;

use crate::error::ImageSourceError;
use crate::source_trait::ImageSource;

/// Deterministic shard path `base/ab/cd/<sha>.jpg` (§4.4).
pub struct LocalSource {
    base_dir: Utf8PathBuf,
    ext: String,
}

impl LocalSource {
    #[must_use]
    pub fn new(base_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ext: "jpg".to_string(),
        }
    }

    #[must_use]
    pub fn with_ext(mut self, ext: impl Into<String>) -> Self {
        self.ext = ext.into();
        self
    }

    fn shard_path(&self, sha: &Sha256Hex) -> Utf8PathBuf {
        dwc_fsutil::shard_path(&self.base_dir, sha, &self.ext)
    }
}

#[async_trait]
impl ImageSource for LocalSource {
    fn name(&self) -> &str {
        "local"
    }

    async fn resolve_path(&self, sha: &Sha256Hex) -> Option<String> {
        let path = self.shard_path(sha);
        path.exists().then(|| path.to_string())
    }

    async fn download(&self, sha: &Sha256Hex, dest: &Utf8Path) -> Result<bool, ImageSourceError> {
        let path = self.shard_path(sha);
        if !path.exists() {
            return Ok(false);
        }
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| ImageSourceError::Io {
                    path: parent.to_owned(),
                    source,
                })?;
        }
        tokio::fs::copy(&path, dest)
            .await
            .map_err(|source| ImageSourceError::Io {
                path: path.clone(),
                source,
            })?;
        Ok(true)
    }

    async fn exists(&self, sha: &Sha256Hex) -> Result<bool, ImageSourceError> {
        Ok(self.shard_path(sha).exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_image_reports_false_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let base = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let source = LocalSource::new(base);
        let sha = Sha256Hex::of(b"nope");
        let dest = tempfile::NamedTempFile::new().unwrap();
        let dest_path = Utf8PathBuf::from_path_buf(dest.path().to_path_buf()).unwrap();

        assert!(!source.exists(&sha).await.unwrap());
        assert!(!source.download(&sha, &dest_path).await.unwrap());
    }

    #[tokio::test]
    async fn download_copies_sharded_file() {
        let dir = tempfile::tempdir().unwrap();
        let base = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let sha = Sha256Hex::of(b"specimen-bytes");
        let shard = dwc_fsutil::shard_path(&base, &sha, "jpg");
        std::fs::create_dir_all(shard.parent().unwrap()).unwrap();
        std::fs::write(&shard, b"fake-jpeg-bytes").unwrap();

        let source = LocalSource::new(base);
        assert!(source.exists(&sha).await.unwrap());

        let out_dir = tempfile::tempdir().unwrap();
        let dest = Utf8PathBuf::from_path_buf(out_dir.path().to_path_buf())
            .unwrap()
            .join("out.jpg");
        assert!(source.download(&sha, &dest).await.unwrap());
        assert_eq!(std::fs::read(&dest).unwrap(), b"fake-jpeg-bytes");
    }
}
