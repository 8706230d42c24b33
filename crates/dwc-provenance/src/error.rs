use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProvenanceError {
    #[error("failed to compute fragment id: {0}")]
    Canon(#[from] dwc_canon::CanonError),
    #[error("failed to serialize fragment: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    AtomicWrite(#[from] dwc_fsutil::AtomicWriteError),
}
