//! Layered TOML configuration (§6 Ambient and §9 DESIGN NOTES: "Config
//! objects as dicts — expose a single `Config` value type with nested
//! structs... do not thread opaque key-value maps through the pipeline.").

mod merge;
mod model;

pub use model::{
    Config, ConfigSource, DwcConfig, GbifConfig, GptConfig, GptVariantConfig, ImageSourceConfig,
    OcrConfig, PaddleOcrConfig, PipelineConfig, PreprocessConfig, ProcessingConfig, QcConfig,
    SourceAttribution, TesseractConfig,
};

use camino::Utf8Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to deserialize merged configuration: {0}")]
    Deserialize(#[from] toml::de::Error),
}

impl Config {
    /// Start from the packaged default (this crate's `Config::default()`,
    /// rendered as TOML) and, if `path` exists, deep-merge its contents on
    /// top. Returns the effective `Config` plus a flat source-attribution
    /// map (every key present in the user file is attributed `ConfigFile`;
    /// everything else is `Default`).
    pub fn load(path: Option<&Utf8Path>) -> Result<(Config, SourceAttribution), ConfigLoadError> {
        let default_config = Config::default();
        let mut merged: toml::Value = toml::Value::try_from(&default_config)
            .expect("Config::default() always serializes to a TOML table");

        let mut attribution = SourceAttribution::new();

        if let Some(path) = path {
            if path.exists() {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Read {
                    path: path.to_string(),
                    source,
                })?;
                let overlay: toml::Value =
                    toml::from_str(&raw).map_err(|source| ConfigLoadError::Parse {
                        path: path.to_string(),
                        source,
                    })?;
                record_keys(&overlay, String::new(), &mut attribution);
                merge::deep_merge(&mut merged, overlay);
            }
        }

        let config: Config = merged.try_into()?;
        Ok((config, attribution))
    }

    /// Convenience for embedding scenarios with no config file at all.
    #[must_use]
    pub fn defaults() -> Config {
        Config::default()
    }
}

fn record_keys(value: &toml::Value, prefix: String, out: &mut SourceAttribution) {
    if let toml::Value::Table(table) = value {
        for (key, inner) in table {
            let full_key = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            out.insert(full_key.clone(), ConfigSource::ConfigFile);
            record_keys(inner, full_key, out);
        }
    }
}
