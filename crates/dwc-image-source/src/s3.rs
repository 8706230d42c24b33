use async_trait::async_trait;
use camino::Utf8Path;
use dwc_types::Sha256Hex;
use tokio::process::Command;

use crate::error::ImageSourceError;
use crate::source_trait::ImageSource;

/// Same shard layout as [`crate::local::LocalSource`] under an S3 URI,
/// fetched via an out-of-process object-store client (the `aws` CLI) the
/// way the OCR engines shell out to `tesseract`/`paddleocr` rather than
/// linking an SDK (§4.4).
pub struct S3Source {
    bucket: String,
    region: Option<String>,
    prefix: String,
    ext: String,
    binary: String,
}

impl S3Source {
    #[must_use]
    pub fn new(bucket: impl Into<String>, region: Option<String>, prefix: Option<String>) -> Self {
        Self {
            bucket: bucket.into(),
            region,
            prefix: prefix.unwrap_or_default(),
            ext: "jpg".to_string(),
            binary: "aws".to_string(),
        }
    }

    #[must_use]
    pub fn with_ext(mut self, ext: impl Into<String>) -> Self {
        self.ext = ext.into();
        self
    }

    fn key_for(&self, sha: &Sha256Hex) -> String {
        let hex = sha.as_str();
        let shard = format!("{}/{}/{}.{}", &hex[0..2], &hex[2..4], hex, self.ext);
        if self.prefix.is_empty() {
            shard
        } else {
            format!("{}/{}", self.prefix.trim_end_matches('/'), shard)
        }
    }

    fn uri_for(&self, sha: &Sha256Hex) -> String {
        format!("s3://{}/{}", self.bucket, self.key_for(sha))
    }

    fn base_command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("s3api");
        if let Some(region) = &self.region {
            cmd.args(["--region", region]);
        }
        cmd
    }
}

#[async_trait]
impl ImageSource for S3Source {
    fn name(&self) -> &str {
        "s3"
    }

    async fn resolve_path(&self, sha: &Sha256Hex) -> Option<String> {
        Some(self.uri_for(sha))
    }

    async fn download(&self, sha: &Sha256Hex, dest: &Utf8Path) -> Result<bool, ImageSourceError> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| ImageSourceError::Io {
                    path: parent.to_owned(),
                    source,
                })?;
        }
        let output = self
            .base_command()
            .args([
                "get-object",
                "--bucket",
                &self.bucket,
                "--key",
                &self.key_for(sha),
                dest.as_str(),
            ])
            .output()
            .await
            .map_err(|source| ImageSourceError::Io {
                path: dest.to_owned(),
                source,
            })?;

        if output.status.success() {
            return Ok(true);
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("NoSuchKey") || stderr.contains("404") {
            return Ok(false);
        }
        Err(ImageSourceError::ObjectStoreClient(stderr.to_string()))
    }

    async fn exists(&self, sha: &Sha256Hex) -> Result<bool, ImageSourceError> {
        let output = self
            .base_command()
            .args(["head-object", "--bucket", &self.bucket, "--key", &self.key_for(sha)])
            .output()
            .await
            .map_err(|source| ImageSourceError::Io {
                path: Utf8Path::new(&self.bucket).to_owned(),
                source,
            })?;
        Ok(output.status.success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_includes_prefix_and_shard() {
        let source = S3Source::new("herbarium-images", None, Some("specimens".to_string()));
        let sha = Sha256Hex::of(b"x");
        let key = source.key_for(&sha);
        assert!(key.starts_with("specimens/"));
        assert!(key.ends_with(&format!("{}.jpg", sha.as_str())));
    }

    #[test]
    fn uri_has_s3_scheme() {
        let source = S3Source::new("bucket", None, None);
        let sha = Sha256Hex::of(b"x");
        assert!(source.uri_for(&sha).starts_with("s3://bucket/"));
    }
}
