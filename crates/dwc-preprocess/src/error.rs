use thiserror::Error;

/// Errors from running a preprocessing pipeline (§4.2).
#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("unknown preprocessing step: {0}")]
    UnknownStep(String),
    #[error("failed to decode or encode image: {0}")]
    Image(#[from] image::ImageError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
