use async_trait::async_trait;
use camino::Utf8Path;
use dwc_types::error::{EngineError, EngineErrorCode};

use crate::types::{
    FallbackOutcome, ImageToTextOptions, ImageToTextOutput, TextToDwcOptions, TextToDwcOutput,
};

fn not_supported(task: &str) -> EngineError {
    EngineError::new(
        EngineErrorCode::MissingDependency,
        format!("engine does not implement {task}"),
    )
}

/// A registered OCR/LLM backend. An engine need only implement the
/// capabilities it actually has — the defaults report `MISSING_DEPENDENCY`
/// for the rest, mirroring how the teacher's `LlmBackend` implementors each
/// cover one provider while sharing a single trait object type.
#[async_trait]
pub trait Engine: Send + Sync {
    fn name(&self) -> &str;

    fn version(&self) -> Option<String> {
        None
    }

    async fn image_to_text(
        &self,
        _image_path: &Utf8Path,
        _opts: &ImageToTextOptions,
    ) -> Result<ImageToTextOutput, EngineError> {
        Err(not_supported("image_to_text"))
    }

    async fn text_to_dwc(
        &self,
        _text: &str,
        _opts: &TextToDwcOptions,
    ) -> Result<TextToDwcOutput, EngineError> {
        Err(not_supported("text_to_dwc"))
    }

    async fn image_to_dwc(
        &self,
        _image_path: &Utf8Path,
        _opts: &TextToDwcOptions,
    ) -> Result<TextToDwcOutput, EngineError> {
        Err(not_supported("image_to_dwc"))
    }
}

/// A pure function over its inputs that may re-run another registered
/// engine and pick a different final result (§4.1). Implementations must
/// not recurse into their own engine.
#[async_trait]
pub trait FallbackPolicy: Send + Sync {
    async fn apply(
        &self,
        image_path: &Utf8Path,
        text: &str,
        confidences: &[f32],
        run_lang: Option<&str>,
    ) -> Result<FallbackOutcome, EngineError>;
}
