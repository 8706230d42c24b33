use async_trait::async_trait;
use camino::Utf8Path;
use dwc_types::Sha256Hex;

use crate::error::ImageSourceError;
use crate::source_trait::ImageSource;

/// Read-only HTTP source: `{base_url}/{shard}/{shard}/{sha}.{ext}` (§4.4).
pub struct HttpSource {
    base_url: String,
    ext: String,
    client: reqwest::Client,
}

impl HttpSource {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ext: "jpg".to_string(),
            client: reqwest::Client::new(),
        }
    }

    #[must_use]
    pub fn with_ext(mut self, ext: impl Into<String>) -> Self {
        self.ext = ext.into();
        self
    }

    fn url_for(&self, sha: &Sha256Hex) -> String {
        let hex = sha.as_str();
        format!(
            "{}/{}/{}/{}.{}",
            self.base_url.trim_end_matches('/'),
            &hex[0..2],
            &hex[2..4],
            hex,
            self.ext
        )
    }
}

#[async_trait]
impl ImageSource for HttpSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn resolve_path(&self, sha: &Sha256Hex) -> Option<String> {
        Some(self.url_for(sha))
    }

    async fn download(&self, sha: &Sha256Hex, dest: &Utf8Path) -> Result<bool, ImageSourceError> {
        let url = self.url_for(sha);
        let response = self.client.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !response.status().is_success() {
            return Err(ImageSourceError::BadStatus {
                status: response.status().as_u16(),
                url,
            });
        }
        let bytes = response.bytes().await?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| ImageSourceError::Io {
                    path: parent.to_owned(),
                    source,
                })?;
        }
        tokio::fs::write(dest, &bytes)
            .await
            .map_err(|source| ImageSourceError::Io {
                path: dest.to_owned(),
                source,
            })?;
        Ok(true)
    }

    async fn exists(&self, sha: &Sha256Hex) -> Result<bool, ImageSourceError> {
        let url = self.url_for(sha);
        let response = self.client.head(&url).send().await?;
        Ok(response.status().is_success())
    }
}
