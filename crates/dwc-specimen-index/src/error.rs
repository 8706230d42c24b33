use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpecimenIndexError {
    #[error("extraction {extraction_id} violates the unique (image_sha256, params_hash) constraint already held by {existing_extraction_id}")]
    DuplicateExtractionKey {
        extraction_id: String,
        existing_extraction_id: String,
    },
    #[error("no specimen registered for image sha256 {0}")]
    UnknownImage(String),
    #[error("invalid data-quality regex: {0}")]
    InvalidRegex(#[from] regex::Error),
    #[error("failed to hash params: {0}")]
    Canon(#[from] dwc_canon::CanonError),
}
