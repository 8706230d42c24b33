//! Shared data model and error taxonomy for the herbarium extraction
//! pipeline.
//!
//! Every component crate (`dwc-engine`, `dwc-orchestrator`, `dwc-output`,
//! …) depends on this crate rather than redefining the entities from the
//! data model, so that e.g. a `Sha256Hex` produced by `dwc-image-source`
//! can be handed directly to `dwc-provenance` without re-validation.

pub mod dwc;
pub mod error;
pub mod extraction;
pub mod hash;
pub mod ocr;
pub mod provenance;
pub mod specimen;
pub mod state;

pub use dwc::DwcRecord;
pub use error::{
    ConfigurationError, EngineError, EngineErrorCode, PipelineError, RegistryError,
};
pub use extraction::{
    Candidate, DataQualityIssue, Extraction, ExtractionStatus, FieldValue, QualityIssueSeverity,
    SpecimenAggregation,
};
pub use hash::{FragmentId, InvalidSha256, ParamsHash, Sha256Hex};
pub use ocr::{OcrCacheKey, OcrLineage, OcrResult};
pub use provenance::{FragmentType, ProvenanceFragment};
pub use specimen::{ImageTransformation, OperationStep, OriginalFile, OriginalFileRole, Specimen, SpecimenId};
pub use state::{CacheEntry, ProcessingState, ProcessingStatus, Run, RunLineage};
