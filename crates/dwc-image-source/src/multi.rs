use std::sync::Arc;

use async_trait::async_trait;
use camino::Utf8Path;
use dwc_types::Sha256Hex;

use crate::error::ImageSourceError;
use crate::source_trait::ImageSource;

/// Tries each member source in order; the first success wins (§4.4).
pub struct MultiSource {
    members: Vec<Arc<dyn ImageSource>>,
}

impl MultiSource {
    pub fn new(members: Vec<Arc<dyn ImageSource>>) -> Result<Self, ImageSourceError> {
        if members.is_empty() {
            return Err(ImageSourceError::EmptyMulti);
        }
        Ok(Self { members })
    }
}

#[async_trait]
impl ImageSource for MultiSource {
    fn name(&self) -> &str {
        "multi"
    }

    async fn resolve_path(&self, sha: &Sha256Hex) -> Option<String> {
        for member in &self.members {
            if let Some(path) = member.resolve_path(sha).await {
                return Some(path);
            }
        }
        None
    }

    async fn download(&self, sha: &Sha256Hex, dest: &Utf8Path) -> Result<bool, ImageSourceError> {
        let mut last_err = None;
        for member in &self.members {
            match member.download(sha, dest).await {
                Ok(true) => return Ok(true),
                Ok(false) => continue,
                Err(err) => last_err = Some(err),
            }
        }
        match last_err {
            Some(err) => Err(err),
            None => Ok(false),
        }
    }

    async fn exists(&self, sha: &Sha256Hex) -> Result<bool, ImageSourceError> {
        for member in &self.members {
            if member.exists(sha).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
