//! PaddleOCR engine, invoked as a subprocess emitting one JSON object per
//! line of recognized text: `{"text": "...", "confidence": 0.0-1.0}`.

use async_trait::async_trait;
use camino::Utf8Path;
use dwc_config::PaddleOcrConfig;
use dwc_types::error::{EngineError, EngineErrorCode};
use serde::Deserialize;
use tokio::process::Command;

use crate::engine_trait::Engine;
use crate::types::{ImageToTextOptions, ImageToTextOutput};

pub struct PaddleOcrEngine {
    binary: String,
    config: PaddleOcrConfig,
}

impl PaddleOcrEngine {
    #[must_use]
    pub fn new(config: PaddleOcrConfig) -> Self {
        Self {
            binary: "paddleocr".to_string(),
            config,
        }
    }
}

#[derive(Deserialize)]
struct PaddleLine {
    text: String,
    confidence: f32,
}

#[async_trait]
impl Engine for PaddleOcrEngine {
    fn name(&self) -> &str {
        "paddleocr"
    }

    async fn image_to_text(
        &self,
        image_path: &Utf8Path,
        opts: &ImageToTextOptions,
    ) -> Result<ImageToTextOutput, EngineError> {
        let lang = opts
            .lang
            .clone()
            .or_else(|| self.config.lang.clone())
            .or_else(|| opts.langs.first().cloned())
            .unwrap_or_else(|| "en".to_string());

        let output = Command::new(&self.binary)
            .arg("--image")
            .arg(image_path.as_str())
            .arg("--lang")
            .arg(&lang)
            .arg("--format")
            .arg("jsonl")
            .output()
            .await
            .map_err(|e| {
                EngineError::new(
                    EngineErrorCode::MissingDependency,
                    format!("failed to launch paddleocr: {e}"),
                )
            })?;

        if !output.status.success() {
            return Err(EngineError::new(
                EngineErrorCode::OcrError,
                format!(
                    "paddleocr exited with {:?}: {}",
                    output.status.code(),
                    String::from_utf8_lossy(&output.stderr)
                ),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut words = Vec::new();
        let mut confidences = Vec::new();
        for line in stdout.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let parsed: PaddleLine = serde_json::from_str(line).map_err(|e| {
                EngineError::new(
                    EngineErrorCode::ParseError,
                    format!("malformed paddleocr output line: {e}"),
                )
            })?;
            words.push(parsed.text);
            confidences.push(parsed.confidence);
        }

        Ok(ImageToTextOutput {
            text: words.join("\n"),
            per_token_confidences: confidences,
        })
    }
}
