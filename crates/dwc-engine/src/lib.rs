//! Process-wide engine registry (§4.1): a plugin system for OCR and
//! LLM-style DwC extraction backends, generalized from the teacher's
//! single-provider `xchecker-llm` factory into a `(task, engine_name)`
//! keyed registry covering three distinct capability shapes.

mod builtin;
mod engine_trait;
mod registry;
mod task;
mod types;

pub use builtin::register_builtin_engines;
pub use engine_trait::{Engine, FallbackPolicy};
pub use registry::{EngineOrRegistryError, Registry};
pub use task::Task;
pub use types::{
    FallbackOutcome, ImageToTextOptions, ImageToTextOutput, TextToDwcOptions, TextToDwcOutput,
};

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use camino::Utf8Path;
    use dwc_config::Config;
    use dwc_types::error::{EngineError, EngineErrorCode};
    use std::sync::Arc;

    struct StubEngine {
        name: &'static str,
        text: &'static str,
    }

    #[async_trait]
    impl Engine for StubEngine {
        fn name(&self) -> &str {
            self.name
        }

        async fn image_to_text(
            &self,
            _image_path: &Utf8Path,
            _opts: &ImageToTextOptions,
        ) -> Result<ImageToTextOutput, EngineError> {
            Ok(ImageToTextOutput {
                text: self.text.to_string(),
                per_token_confidences: vec![0.9, 0.8],
            })
        }
    }

    struct FailingEngine;

    #[async_trait]
    impl Engine for FailingEngine {
        fn name(&self) -> &str {
            "failing"
        }

        async fn image_to_text(
            &self,
            _image_path: &Utf8Path,
            _opts: &ImageToTextOptions,
        ) -> Result<ImageToTextOutput, EngineError> {
            Err(EngineError::new(EngineErrorCode::OcrError, "boom"))
        }
    }

    #[tokio::test]
    async fn register_and_dispatch_roundtrip() {
        let registry = Registry::new();
        registry.register(
            Task::ImageToText,
            "stub",
            Arc::new(StubEngine {
                name: "stub",
                text: "hello",
            }),
        );

        assert_eq!(registry.available(Task::ImageToText), vec!["stub"]);

        let out = registry
            .dispatch_image_to_text(
                "stub",
                Utf8Path::new("/tmp/x.jpg"),
                &ImageToTextOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(out.text, "hello");
        assert!((out.avg_confidence() - 0.85).abs() < 1e-6);
    }

    #[tokio::test]
    async fn unknown_task_and_engine_errors() {
        let registry = Registry::new();
        let err = registry
            .dispatch_image_to_text("missing", Utf8Path::new("/tmp/x.jpg"), &ImageToTextOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineOrRegistryError::Registry(dwc_types::error::RegistryError::UnknownTask(_))
        ));

        registry.register(
            Task::ImageToText,
            "stub",
            Arc::new(StubEngine {
                name: "stub",
                text: "hello",
            }),
        );
        let err = registry
            .dispatch_image_to_text("other", Utf8Path::new("/tmp/x.jpg"), &ImageToTextOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineOrRegistryError::Registry(dwc_types::error::RegistryError::UnknownEngine { .. })
        ));
    }

    #[tokio::test]
    async fn engine_failure_propagates() {
        let registry = Registry::new();
        registry.register(Task::ImageToText, "failing", Arc::new(FailingEngine));
        let err = registry
            .dispatch_image_to_text("failing", Utf8Path::new("/tmp/x.jpg"), &ImageToTextOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineOrRegistryError::Engine(_)));
    }

    #[test]
    fn select_engine_prefers_configured_when_available() {
        let registry = Registry::new();
        registry.register(
            Task::ImageToText,
            "paddleocr",
            Arc::new(StubEngine {
                name: "paddleocr",
                text: "",
            }),
        );
        registry.register(
            Task::ImageToText,
            "tesseract",
            Arc::new(StubEngine {
                name: "tesseract",
                text: "",
            }),
        );

        let mut config = Config::defaults();
        config.ocr.preferred_engine = Some("paddleocr".to_string());
        assert_eq!(
            registry.select_engine(Task::ImageToText, &config),
            Some("paddleocr".to_string())
        );
    }

    #[test]
    fn select_engine_falls_through_unconfigured_gpt_without_allow_gpt() {
        let registry = Registry::new();
        registry.register(
            Task::TextToDwc,
            "gpt",
            Arc::new(StubEngine {
                name: "gpt",
                text: "",
            }),
        );
        registry.register(
            Task::TextToDwc,
            "local-llm",
            Arc::new(StubEngine {
                name: "local-llm",
                text: "",
            }),
        );

        let config = Config::defaults();
        assert_eq!(
            registry.select_engine(Task::TextToDwc, &config),
            Some("local-llm".to_string())
        );
    }
}
