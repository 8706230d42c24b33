use dwc_types::error::PipelineError;
use thiserror::Error;

/// Failures that can surface from running one specimen through the
/// pipeline, beyond the already-classified [`PipelineError`] (§4.6, §7).
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Preprocess(#[from] dwc_preprocess::PreprocessError),
    #[error(transparent)]
    SpecimenIndex(#[from] dwc_specimen_index::SpecimenIndexError),
    #[error(transparent)]
    Provenance(#[from] dwc_provenance::ProvenanceError),
    #[error(transparent)]
    Canon(#[from] dwc_canon::CanonError),
    #[error(transparent)]
    OcrCache(#[from] dwc_ocr_cache::OcrCacheError),
    #[error(transparent)]
    EngineDispatch(#[from] dwc_engine::EngineOrRegistryError),
}

impl From<OrchestratorError> for PipelineError {
    /// Anything not already a [`PipelineError`] is an infrastructure
    /// failure the orchestrator did not anticipate classifying more
    /// precisely; treat it the same as an engine's own "unknown" failure
    /// so retry accounting still applies (§7: "any other error ... is
    /// retryable").
    fn from(err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::Pipeline(e) => e,
            OrchestratorError::EngineDispatch(dwc_engine::EngineOrRegistryError::Engine(e)) => {
                PipelineError::Engine(e)
            }
            OrchestratorError::EngineDispatch(dwc_engine::EngineOrRegistryError::Registry(e)) => {
                PipelineError::Registry(e)
            }
            other => PipelineError::Unknown(other.to_string()),
        }
    }
}
