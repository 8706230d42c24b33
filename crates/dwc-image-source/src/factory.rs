use std::sync::Arc;

use dwc_config::ImageSourceConfig;

use crate::error::ImageSourceError;
use crate::http::HttpSource;
use crate::local::LocalSource;
use crate::multi::MultiSource;
use crate::s3::S3Source;
use crate::source_trait::ImageSource;

/// Build the configured image source tree, dispatching on `config.kind`
/// the way `dwc-engine`'s registry dispatches on engine name — a small,
/// named-variant factory rather than a generic plugin loader (§4.4).
pub fn build_source(config: &ImageSourceConfig) -> Result<Arc<dyn ImageSource>, ImageSourceError> {
    match config.kind.as_str() {
        "local" => {
            let base_dir = config
                .base_dir
                .clone()
                .ok_or_else(|| ImageSourceError::UnknownKind("local source missing base_dir".to_string()))?;
            Ok(Arc::new(LocalSource::new(base_dir)))
        }
        "s3" => {
            let bucket = config
                .bucket
                .clone()
                .ok_or_else(|| ImageSourceError::UnknownKind("s3 source missing bucket".to_string()))?;
            Ok(Arc::new(S3Source::new(
                bucket,
                config.region.clone(),
                config.prefix.clone(),
            )))
        }
        "http" => {
            let base_url = config
                .base_url
                .clone()
                .ok_or_else(|| ImageSourceError::UnknownKind("http source missing base_url".to_string()))?;
            Ok(Arc::new(HttpSource::new(base_url)))
        }
        "multi" => {
            let members = config
                .sources
                .iter()
                .map(build_source)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Arc::new(MultiSource::new(members)?))
        }
        other => Err(ImageSourceError::UnknownKind(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_requires_base_dir() {
        let config = ImageSourceConfig {
            kind: "local".to_string(),
            ..Default::default()
        };
        assert!(build_source(&config).is_err());
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let config = ImageSourceConfig {
            kind: "ftp".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            build_source(&config),
            Err(ImageSourceError::UnknownKind(_))
        ));
    }

    #[test]
    fn multi_recurses_into_members() {
        let config = ImageSourceConfig {
            kind: "multi".to_string(),
            sources: vec![ImageSourceConfig {
                kind: "local".to_string(),
                base_dir: Some("/tmp/images".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(build_source(&config).is_ok());
    }
}
