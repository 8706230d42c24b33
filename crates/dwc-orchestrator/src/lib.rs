//! Per-specimen pipeline orchestration (§4.6): preprocessing, engine
//! dispatch with OCR caching and fallback, Darwin Core mapping and
//! validation, optional GBIF verification, and QC flagging, chained
//! together with provenance fragments.
//!
//! This crate owns the algorithm for *one* specimen; `dwc-run-controller`
//! owns fanning that out across a batch, persisting results, and
//! resuming a partial run.

mod context;
mod error;
mod pipeline;
mod qc;
mod state_store;
mod types;

pub use context::PipelineContext;
pub use error::OrchestratorError;
pub use pipeline::{process_specimen, Outcome};
pub use qc::{estimate_scan_pct, DuplicateCatalog, PerceptualHash, Sha256PrefixHash};
pub use state_store::ProcessingStateStore;
pub use types::{GbifVerificationSummary, RawEvent, SkipReason, SpecimenOutcome};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use camino::Utf8Path;
    use dwc_config::Config;
    use dwc_engine::{
        Engine, FallbackOutcome, FallbackPolicy, ImageToTextOptions, ImageToTextOutput, Registry,
        Task, TextToDwcOptions, TextToDwcOutput,
    };
    use dwc_mapper::Mapper;
    use dwc_ocr_cache::OcrCache;
    use dwc_specimen_index::SpecimenIndex;
    use dwc_types::error::{EngineError, EngineErrorCode};

    use super::*;

    fn write_temp_image(dir: &tempfile::TempDir, name: &str) -> camino::Utf8PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, b"fake-image-bytes").unwrap();
        camino::Utf8PathBuf::from_path_buf(path).unwrap()
    }

    fn make_context(config: Config, registry: Registry, cache_dir: &tempfile::TempDir) -> PipelineContext {
        let cache_path = camino::Utf8PathBuf::from_path_buf(cache_dir.path().to_path_buf()).unwrap();
        PipelineContext::new(
            Arc::new(config),
            Arc::new(registry),
            Arc::new(SpecimenIndex::new().unwrap()),
            Arc::new(OcrCache::new(cache_path).unwrap()),
            Arc::new(Mapper::new(None, None)),
            None,
            Arc::new(ProcessingStateStore::new()),
        )
    }

    struct StubOcr {
        text: &'static str,
        confidence: f32,
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl Engine for StubOcr {
        fn name(&self) -> &str {
            "tesseract"
        }

        async fn image_to_text(
            &self,
            _image_path: &Utf8Path,
            _opts: &ImageToTextOptions,
        ) -> Result<ImageToTextOutput, EngineError> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(ImageToTextOutput {
                text: self.text.to_string(),
                per_token_confidences: vec![self.confidence],
            })
        }
    }

    struct StubDwc;

    #[async_trait]
    impl Engine for StubDwc {
        fn name(&self) -> &str {
            "local-llm"
        }

        async fn text_to_dwc(
            &self,
            text: &str,
            _opts: &TextToDwcOptions,
        ) -> Result<TextToDwcOutput, EngineError> {
            let mut fields = std::collections::HashMap::new();
            fields.insert("catalogNumber".to_string(), "Herbarium-00001".to_string());
            fields.insert("scientificName".to_string(), text.to_string());
            let mut confidence = std::collections::HashMap::new();
            confidence.insert("catalogNumber".to_string(), 0.9);
            confidence.insert("scientificName".to_string(), 0.9);
            Ok(TextToDwcOutput {
                fields,
                per_field_confidence: confidence,
                identification_history: Vec::new(),
            })
        }
    }

    struct FailingOcr;

    #[async_trait]
    impl Engine for FailingOcr {
        fn name(&self) -> &str {
            "tesseract"
        }

        async fn image_to_text(
            &self,
            _image_path: &Utf8Path,
            _opts: &ImageToTextOptions,
        ) -> Result<ImageToTextOutput, EngineError> {
            Err(EngineError::new(EngineErrorCode::OcrError, "boom"))
        }
    }

    struct AlwaysFallbackToGpt;

    #[async_trait]
    impl FallbackPolicy for AlwaysFallbackToGpt {
        async fn apply(
            &self,
            _image_path: &Utf8Path,
            _text: &str,
            confidences: &[f32],
            _run_lang: Option<&str>,
        ) -> Result<FallbackOutcome, EngineError> {
            let avg = confidences.iter().sum::<f32>() / confidences.len().max(1) as f32;
            if avg < 0.5 {
                Ok(FallbackOutcome {
                    text: "Herbarium-00002 Quercus alba".to_string(),
                    per_token_confidences: vec![0.95],
                    final_engine: "gpt".to_string(),
                    final_engine_version: Some("2024-08".to_string()),
                })
            } else {
                Ok(FallbackOutcome {
                    text: _text.to_string(),
                    per_token_confidences: confidences.to_vec(),
                    final_engine: "tesseract".to_string(),
                    final_engine_version: None,
                })
            }
        }
    }

    fn base_config() -> Config {
        let mut config = Config::defaults();
        config.ocr.preferred_engine = Some("tesseract".to_string());
        config.dwc.preferred_engine = Some("local-llm".to_string());
        config
    }

    #[tokio::test]
    async fn second_run_is_an_ocr_cache_hit() {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();
        let image = write_temp_image(&dir, "Herbarium-00001.jpg");

        let registry = Registry::new();
        let ocr = Arc::new(StubOcr {
            text: "Herbarium-00001 Quercus alba",
            confidence: 0.9,
            calls: std::sync::atomic::AtomicUsize::new(0),
        });
        registry.register(Task::ImageToText, "tesseract", ocr.clone());
        registry.register(Task::TextToDwc, "local-llm", Arc::new(StubDwc));

        let ctx = make_context(base_config(), registry, &cache_dir);

        process_specimen(&ctx, "run1", "sp1".to_string(), "IMG_0001.jpg".to_string(), &image)
            .await
            .unwrap();
        assert_eq!(ocr.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(ctx.ocr_cache.stats().misses, 1);

        // A second specimen sharing the same (unchanged) image content hits
        // the OCR cache instead of dispatching the engine again.
        process_specimen(&ctx, "run1", "sp2".to_string(), "IMG_0002.jpg".to_string(), &image)
            .await
            .unwrap();
        assert_eq!(ocr.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(ctx.ocr_cache.stats().hits, 1);
    }

    #[tokio::test]
    async fn retry_exhaustion_skips_on_the_third_run() {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();
        let image = write_temp_image(&dir, "Herbarium-00003.jpg");

        let registry = Registry::new();
        registry.register(Task::ImageToText, "tesseract", Arc::new(FailingOcr));
        registry.register(Task::TextToDwc, "local-llm", Arc::new(StubDwc));

        let mut config = base_config();
        config.processing.retry_limit = 2;
        let ctx = make_context(config, registry, &cache_dir);

        let err1 = process_specimen(&ctx, "run1", "sp1".to_string(), "IMG_0003.jpg".to_string(), &image)
            .await
            .unwrap_err();
        assert!(matches!(err1, OrchestratorError::Pipeline(_)));
        let state = ctx.state_store.get("sp1", "process").unwrap();
        assert_eq!(state.retries, 1);

        let err2 = process_specimen(&ctx, "run2", "sp1".to_string(), "IMG_0003.jpg".to_string(), &image)
            .await
            .unwrap_err();
        assert!(matches!(err2, OrchestratorError::Pipeline(_)));
        let state = ctx.state_store.get("sp1", "process").unwrap();
        assert_eq!(state.retries, 2);

        let outcome = process_specimen(&ctx, "run3", "sp1".to_string(), "IMG_0003.jpg".to_string(), &image)
            .await
            .unwrap();
        assert!(matches!(outcome, Outcome::Skipped(SkipReason::RetryLimitReached)));
        let state = ctx.state_store.get("sp1", "process").unwrap();
        assert_eq!(state.retries, 2, "skipped run must not increment retries further");
    }

    #[tokio::test]
    async fn low_confidence_ocr_triggers_fallback_to_gpt() {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();
        let image = write_temp_image(&dir, "Herbarium-00002.jpg");

        let registry = Registry::new();
        let ocr = Arc::new(StubOcr {
            text: "barely legible",
            confidence: 0.15,
            calls: std::sync::atomic::AtomicUsize::new(0),
        });
        registry.register(Task::ImageToText, "tesseract", ocr);
        registry.register(Task::TextToDwc, "local-llm", Arc::new(StubDwc));
        registry.register_fallback("tesseract", Arc::new(AlwaysFallbackToGpt));

        let ctx = make_context(base_config(), registry, &cache_dir);

        let outcome = process_specimen(&ctx, "run1", "sp1".to_string(), "IMG_0002.jpg".to_string(), &image)
            .await
            .unwrap();
        let Outcome::Processed(outcome) = outcome else {
            panic!("expected the specimen to process");
        };
        assert_eq!(outcome.event.engine.as_deref(), Some("gpt"));
        assert_eq!(
            outcome.dwc_record.get("scientificName"),
            Some("Herbarium-00002 Quercus alba")
        );
    }

    #[tokio::test]
    async fn already_done_specimens_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();
        let image = write_temp_image(&dir, "Herbarium-00004.jpg");

        let registry = Registry::new();
        registry.register(
            Task::ImageToText,
            "tesseract",
            Arc::new(StubOcr {
                text: "Herbarium-00004 Quercus alba",
                confidence: 0.9,
                calls: std::sync::atomic::AtomicUsize::new(0),
            }),
        );
        registry.register(Task::TextToDwc, "local-llm", Arc::new(StubDwc));

        let ctx = make_context(base_config(), registry, &cache_dir);
        process_specimen(&ctx, "run1", "sp1".to_string(), "IMG_0004.jpg".to_string(), &image)
            .await
            .unwrap();

        let outcome = process_specimen(&ctx, "run2", "sp1".to_string(), "IMG_0004.jpg".to_string(), &image)
            .await
            .unwrap();
        assert!(matches!(outcome, Outcome::Skipped(SkipReason::AlreadyDone)));
    }
}
