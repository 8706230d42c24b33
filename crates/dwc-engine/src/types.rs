use std::collections::HashMap;

use serde_json::Value;

/// Options for `image_to_text` (§4.1 capability contracts).
#[derive(Debug, Clone, Default)]
pub struct ImageToTextOptions {
    pub langs: Vec<String>,
    pub lang: Option<String>,
    pub engine_opts: HashMap<String, Value>,
}

#[derive(Debug, Clone)]
pub struct ImageToTextOutput {
    pub text: String,
    pub per_token_confidences: Vec<f32>,
}

impl ImageToTextOutput {
    #[must_use]
    pub fn avg_confidence(&self) -> f32 {
        if self.per_token_confidences.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.per_token_confidences.iter().sum();
        sum / self.per_token_confidences.len() as f32
    }
}

/// Options shared by `text_to_dwc` and `image_to_dwc`.
#[derive(Debug, Clone, Default)]
pub struct TextToDwcOptions {
    pub fields: Option<Vec<String>>,
    pub model: Option<String>,
    pub dry_run: bool,
    pub prompt_dir: Option<String>,
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TextToDwcOutput {
    pub fields: HashMap<String, String>,
    pub per_field_confidence: HashMap<String, f32>,
    /// `identificationHistory` rows popped out of the result, per §4.6 step 4.
    pub identification_history: Vec<HashMap<String, String>>,
}

/// Result of invoking a fallback policy over an OCR result (§4.1).
#[derive(Debug, Clone)]
pub struct FallbackOutcome {
    pub text: String,
    pub per_token_confidences: Vec<f32>,
    pub final_engine: String,
    pub final_engine_version: Option<String>,
}
