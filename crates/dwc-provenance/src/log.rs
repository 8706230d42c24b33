use camino::Utf8PathBuf;
use dwc_types::ProvenanceFragment;

use crate::error::ProvenanceError;

/// Append-only writer for `provenance.jsonl` (§4.10). Writes never modify
/// prior lines; the caller (the run controller's single writer) is
/// responsible for serializing concurrent appends, matching the
/// single-writer discipline used for the other run outputs (§5).
pub struct ProvenanceLog {
    path: Utf8PathBuf,
}

impl ProvenanceLog {
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn append(&self, fragment: &ProvenanceFragment) -> Result<(), ProvenanceError> {
        let line = serde_json::to_string(fragment)?;
        dwc_fsutil::append_line(&self.path, &line)?;
        Ok(())
    }

    #[must_use]
    pub fn path(&self) -> &camino::Utf8Path {
        &self.path
    }
}
