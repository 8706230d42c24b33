use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::error::OutputError;

/// Appends one JSON line per specimen to `raw.jsonl` (§6, §4.12).
///
/// Mirrors [`dwc_provenance::ProvenanceLog`]: a thin wrapper over
/// `dwc-fsutil`'s append-only write so every line lands durably before the
/// next is written, and resuming a run is just "keep appending".
pub struct EventWriter {
    path: Utf8PathBuf,
}

impl EventWriter {
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn append_event<T: Serialize>(&self, event: &T) -> Result<(), OutputError> {
        let line = serde_json::to_string(event)?;
        dwc_fsutil::append_line(&self.path, &line)?;
        Ok(())
    }
}
