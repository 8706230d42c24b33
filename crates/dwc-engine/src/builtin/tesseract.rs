//! Tesseract OCR engine, invoked as a subprocess (teacher's CLI-backend
//! pattern in `xchecker-llm::claude_cli`, generalized from an LLM CLI to an
//! OCR CLI).

use async_trait::async_trait;
use camino::Utf8Path;
use dwc_config::TesseractConfig;
use dwc_types::error::{EngineError, EngineErrorCode};
use tokio::process::Command;

use crate::engine_trait::Engine;
use crate::types::{ImageToTextOptions, ImageToTextOutput};

pub struct TesseractEngine {
    binary: String,
    config: TesseractConfig,
}

impl TesseractEngine {
    #[must_use]
    pub fn new(config: TesseractConfig) -> Self {
        Self {
            binary: "tesseract".to_string(),
            config,
        }
    }
}

#[async_trait]
impl Engine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn image_to_text(
        &self,
        image_path: &Utf8Path,
        opts: &ImageToTextOptions,
    ) -> Result<ImageToTextOutput, EngineError> {
        let lang = opts
            .lang
            .clone()
            .or_else(|| opts.langs.first().cloned())
            .unwrap_or_else(|| "eng".to_string());

        let mut cmd = Command::new(&self.binary);
        cmd.arg(image_path.as_str())
            .arg("stdout")
            .arg("-l")
            .arg(&lang)
            .arg("tsv");

        if let Some(oem) = self.config.oem {
            cmd.arg("--oem").arg(oem.to_string());
        }
        if let Some(psm) = self.config.psm {
            cmd.arg("--psm").arg(psm.to_string());
        }
        for extra in &self.config.extra_args {
            cmd.arg(extra);
        }

        let output = cmd.output().await.map_err(|e| {
            EngineError::new(
                EngineErrorCode::MissingDependency,
                format!("failed to launch tesseract: {e}"),
            )
        })?;

        if !output.status.success() {
            return Err(EngineError::new(
                EngineErrorCode::OcrError,
                format!(
                    "tesseract exited with {:?}: {}",
                    output.status.code(),
                    String::from_utf8_lossy(&output.stderr)
                ),
            ));
        }

        parse_tsv(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse tesseract's `tsv` output format: tab-separated columns with `conf`
/// (0-100, or -1 for non-text rows) and `text` among them.
fn parse_tsv(tsv: &str) -> Result<ImageToTextOutput, EngineError> {
    let mut lines = tsv.lines();
    let header = lines.next().ok_or_else(|| {
        EngineError::new(EngineErrorCode::ParseError, "empty tesseract tsv output")
    })?;
    let columns: Vec<&str> = header.split('\t').collect();
    let conf_idx = columns.iter().position(|c| *c == "conf");
    let text_idx = columns.iter().position(|c| *c == "text");

    let mut words = Vec::new();
    let mut confidences = Vec::new();

    for line in lines {
        let fields: Vec<&str> = line.split('\t').collect();
        let (Some(ci), Some(ti)) = (conf_idx, text_idx) else {
            continue;
        };
        let (Some(conf_raw), Some(text_raw)) = (fields.get(ci), fields.get(ti)) else {
            continue;
        };
        let conf: f32 = conf_raw.parse().unwrap_or(-1.0);
        if conf < 0.0 || text_raw.trim().is_empty() {
            continue;
        }
        words.push((*text_raw).to_string());
        confidences.push(conf / 100.0);
    }

    Ok(ImageToTextOutput {
        text: words.join(" "),
        per_token_confidences: confidences,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tsv_with_confidences() {
        let tsv = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext\n\
                    5\t1\t1\t1\t1\t1\t0\t0\t10\t10\t95.5\tHerbarium\n\
                    5\t1\t1\t1\t1\t2\t0\t0\t10\t10\t-1\t\n";
        let out = parse_tsv(tsv).unwrap();
        assert_eq!(out.text, "Herbarium");
        assert_eq!(out.per_token_confidences, vec![0.955]);
    }

    #[test]
    fn empty_output_is_a_parse_error() {
        assert!(parse_tsv("").is_err());
    }
}
