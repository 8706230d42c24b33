//! Shared error taxonomy.
//!
//! Each component crate may add its own narrower error enum; the variants
//! here are the ones referenced directly by the data model and by more than
//! one downstream crate (engine dispatch, orchestrator error classification).

use thiserror::Error;

/// Structured error carried by engine capability implementations (C1).
///
/// Engines never panic or use exceptions for control flow: every failure is
/// one of these codes plus a human-readable message, matching §4.1 and the
/// `Result<T, EngineError | ConfigError | UnknownError>` guidance in §9.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct EngineError {
    pub code: EngineErrorCode,
    pub message: String,
}

impl EngineError {
    #[must_use]
    pub fn new(code: EngineErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Stable engine error codes (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineErrorCode {
    MissingDependency,
    MissingPrompt,
    ApiError,
    ParseError,
    OcrError,
    InvalidLanguage,
}

impl std::fmt::Display for EngineErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::MissingDependency => "MISSING_DEPENDENCY",
            Self::MissingPrompt => "MISSING_PROMPT",
            Self::ApiError => "API_ERROR",
            Self::ParseError => "PARSE_ERROR",
            Self::OcrError => "OCR_ERROR",
            Self::InvalidLanguage => "INVALID_LANGUAGE",
        };
        f.write_str(s)
    }
}

/// Registry-level lookup failures (§4.1).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown task: {0}")]
    UnknownTask(String),
    #[error("unknown engine {engine:?} for task {task:?}")]
    UnknownEngine { task: String, engine: String },
}

/// Configuration-kind errors: escape to the caller unchanged, never
/// retried (§7).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("missing required configuration key: {0}")]
    MissingKey(String),
    #[error("invalid engine preference: {0}")]
    InvalidEnginePreference(String),
    #[error("invalid preprocessing step: {0}")]
    InvalidPreprocessingStep(String),
    #[error("invalid language code: {0}")]
    InvalidLanguageCode(String),
    #[error("invalid semantic version: {0}")]
    InvalidVersion(String),
}

/// The per-specimen classification used by the orchestrator (§7): engine
/// errors and unknown errors are retryable and recorded in
/// `ProcessingState`; configuration errors propagate unchanged.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("unsupported step: {0}")]
    UnsupportedStep(String),
    #[error("unknown error: {0}")]
    Unknown(String),
}

impl PipelineError {
    /// `true` when the orchestrator should increment `ProcessingState.retries`
    /// and persist a failure rather than propagate.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Engine(_) | Self::Unknown(_))
    }

    /// The error code recorded on `ProcessingState.error_code`.
    #[must_use]
    pub fn error_code(&self) -> String {
        match self {
            Self::Configuration(_) => "CONFIGURATION".to_string(),
            Self::Engine(e) => e.code.to_string(),
            Self::Registry(RegistryError::UnknownTask(_)) => "UNKNOWN_TASK".to_string(),
            Self::Registry(RegistryError::UnknownEngine { .. }) => "UNKNOWN_ENGINE".to_string(),
            Self::UnsupportedStep(_) => "UNSUPPORTED_STEP".to_string(),
            Self::Unknown(_) => "UNKNOWN".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_are_retryable() {
        let err = PipelineError::Engine(EngineError::new(EngineErrorCode::OcrError, "boom"));
        assert!(err.is_retryable());
        assert_eq!(err.error_code(), "OCR_ERROR");
    }

    #[test]
    fn configuration_errors_are_not_retryable() {
        let err = PipelineError::Configuration(ConfigurationError::MissingKey(
            "image_to_dwc_instructions".into(),
        ));
        assert!(!err.is_retryable());
        assert_eq!(err.error_code(), "CONFIGURATION");
    }

    #[test]
    fn unknown_is_retryable() {
        let err = PipelineError::Unknown("boom".into());
        assert!(err.is_retryable());
        assert_eq!(err.error_code(), "UNKNOWN");
    }
}
