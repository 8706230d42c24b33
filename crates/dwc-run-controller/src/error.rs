use camino::Utf8PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunControllerError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Output(#[from] dwc_output::OutputError),
    #[error(transparent)]
    SpecimenIndex(#[from] dwc_specimen_index::SpecimenIndexError),
    #[error(transparent)]
    Provenance(#[from] dwc_provenance::ProvenanceError),
    #[error(transparent)]
    OcrCache(#[from] dwc_ocr_cache::OcrCacheError),
    #[error("fatal pipeline error: {0}")]
    Configuration(String),
}
