//! Run controller (§4.11): allocates a run id, enumerates input images,
//! fans per-specimen work out across a bounded worker pool, and commits
//! each specimen's outputs through a single writer so an "event complete"
//! (JSONL line + DwC row + identification-history rows + provenance
//! fragments) is never partially visible (§5).

mod error;
mod git;
mod input;
mod run;

pub use error::RunControllerError;
pub use git::current_commit_hash;
pub use input::{default_extensions, enumerate_inputs};
pub use run::{run, run_with_registry, RunOptions, RunSummary};

#[cfg(test)]
mod tests {
    use std::sync::{atomic::AtomicUsize, Arc};

    use async_trait::async_trait;
    use camino::{Utf8Path, Utf8PathBuf};
    use dwc_config::Config;
    use dwc_engine::{Engine, ImageToTextOptions, ImageToTextOutput, Task, TextToDwcOptions, TextToDwcOutput};
    use dwc_types::error::EngineError;

    use super::*;

    struct StubOcr;

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
            Ok(ImageToTextOutput {
                text: "Herbarium-00001 Quercus alba".to_string(),
                per_token_confidences: vec![0.9],
            })
        }
    }

    struct StubDwc {
        calls: Arc<AtomicUsize>,
    }

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
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
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

    fn base_config() -> Config {
        let mut config = Config::defaults();
        config.ocr.preferred_engine = Some("tesseract".to_string());
        config.dwc.preferred_engine = Some("local-llm".to_string());
        config
    }

    #[tokio::test]
    async fn empty_input_dir_produces_headers_only_outputs_and_a_manifest() {
        let input_dir = tempfile::tempdir().unwrap();
        let output_dir = tempfile::tempdir().unwrap();

        let options = RunOptions::new(
            Utf8PathBuf::from_path_buf(input_dir.path().to_path_buf()).unwrap(),
            Utf8PathBuf::from_path_buf(output_dir.path().to_path_buf()).unwrap(),
            base_config(),
        );

        let summary = run(options).await.unwrap();
        assert_eq!(summary.specimens_seen, 0);
        assert_eq!(summary.specimens_processed, 0);

        let occurrence = std::fs::read_to_string(output_dir.path().join("occurrence.csv")).unwrap();
        assert_eq!(occurrence.lines().count(), 1, "header line only");

        let manifest_path = output_dir.path().join("manifest.json");
        assert!(manifest_path.exists());
    }

    #[tokio::test]
    async fn processes_every_recognized_image_and_writes_the_full_output_set() {
        let input_dir = tempfile::tempdir().unwrap();
        std::fs::write(input_dir.path().join("Herbarium-00001.jpg"), b"fake-jpeg-bytes").unwrap();
        std::fs::write(input_dir.path().join("ignored.txt"), b"not an image").unwrap();
        let output_dir = tempfile::tempdir().unwrap();

        let options = RunOptions::new(
            Utf8PathBuf::from_path_buf(input_dir.path().to_path_buf()).unwrap(),
            Utf8PathBuf::from_path_buf(output_dir.path().to_path_buf()).unwrap(),
            base_config(),
        );

        let registry = Arc::new(dwc_engine::Registry::new());
        registry.register(Task::ImageToText, "tesseract", Arc::new(StubOcr));
        let dwc_calls = Arc::new(AtomicUsize::new(0));
        registry.register(
            Task::TextToDwc,
            "local-llm",
            Arc::new(StubDwc { calls: dwc_calls.clone() }),
        );

        let summary = run_with_registry(options, registry).await.unwrap();
        assert_eq!(summary.specimens_seen, 1);
        assert_eq!(summary.specimens_processed, 1);
        assert_eq!(dwc_calls.load(std::sync::atomic::Ordering::SeqCst), 1);

        for name in [
            "raw.jsonl",
            "occurrence.csv",
            "identification_history.csv",
            "meta.xml",
            "manifest.json",
            "provenance.jsonl",
        ] {
            assert!(output_dir.path().join(name).exists(), "missing {name}");
        }

        let occurrence = std::fs::read_to_string(output_dir.path().join("occurrence.csv")).unwrap();
        assert_eq!(occurrence.lines().count(), 2, "header plus one specimen row");
    }
}
