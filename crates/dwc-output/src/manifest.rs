use std::collections::BTreeMap;

use camino::Utf8Path;
use chrono::{DateTime, Utc};
use dwc_config::Config;
use serde::{Deserialize, Serialize};

use crate::error::OutputError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvenanceManifestSection {
    pub total_fragments: usize,
    pub fragment_types: BTreeMap<String, usize>,
    pub provenance_file: String,
}

/// `manifest.json` (§4.12): the run's identity, effective config, and a
/// summary of the provenance chain it produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_commit: Option<String>,
    pub config: serde_json::Value,
    pub provenance: ProvenanceManifestSection,
}

pub fn build_manifest(
    run_id: impl Into<String>,
    started_at: DateTime<Utc>,
    git_commit: Option<String>,
    config: &Config,
    fragment_type_counts: BTreeMap<String, usize>,
    provenance_file: impl Into<String>,
) -> Result<Manifest, OutputError> {
    let config_value = serde_json::to_value(config)?;
    let total_fragments = fragment_type_counts.values().sum();
    Ok(Manifest {
        run_id: run_id.into(),
        started_at,
        git_commit,
        config: config_value,
        provenance: ProvenanceManifestSection {
            total_fragments,
            fragment_types: fragment_type_counts,
            provenance_file: provenance_file.into(),
        },
    })
}

impl Manifest {
    pub fn write(&self, path: impl AsRef<Utf8Path>) -> Result<(), OutputError> {
        let bytes = serde_json::to_vec_pretty(self)?;
        dwc_fsutil::write_file_atomic(path.as_ref(), &bytes)?;
        Ok(())
    }

    pub fn read(path: impl AsRef<Utf8Path>) -> Result<Manifest, OutputError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| OutputError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest = serde_json::from_slice(&bytes)?;
        Ok(manifest)
    }
}
