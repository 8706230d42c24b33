//! GPT-family text/image-to-DwC engine, generalized from the teacher's
//! HTTP-backed `OpenRouterBackend`/`AnthropicBackend` (`reqwest` JSON POST
//! over a chat-completions-shaped endpoint).
//!
//! One struct backs all three configured aliases (`gpt`, `gpt4o`,
//! `gpt4omini`) — per the Open Question resolution in DESIGN.md, the
//! *configured alias name* is what callers see in `Candidate`/event rows,
//! not this struct's internal model string.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose;
use base64::Engine as _;
use camino::Utf8Path;
use dwc_types::error::{EngineError, EngineErrorCode};
use serde::{Deserialize, Serialize};

use crate::engine_trait::Engine;
use crate::types::{TextToDwcOptions, TextToDwcOutput};

pub struct GptEngine {
    alias: String,
    model: String,
    api_base: String,
    api_key_env: String,
    dry_run: bool,
    http: reqwest::Client,
}

impl GptEngine {
    #[must_use]
    pub fn new(alias: impl Into<String>, model: impl Into<String>, dry_run: bool) -> Self {
        Self {
            alias: alias.into(),
            model: model.into(),
            api_base: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            dry_run,
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .expect("reqwest client builds with static config"),
        }
    }

    fn api_key(&self) -> Result<String, EngineError> {
        std::env::var(&self.api_key_env).map_err(|_| {
            EngineError::new(
                EngineErrorCode::MissingDependency,
                format!("{} not set for GPT engine '{}'", self.api_key_env, self.alias),
            )
        })
    }

    fn prompt_for(text: &str, instructions: Option<&str>, has_image: bool) -> String {
        let base = instructions.unwrap_or(
            "Extract Darwin Core fields as a flat JSON object mapping term name to value.",
        );
        if has_image {
            base.to_string()
        } else {
            format!("{base}\n\nOCR text:\n{text}")
        }
    }

    async fn chat_completion(&self, prompt: &str, image_b64: Option<&str>) -> Result<String, EngineError> {
        let mut content = vec![ContentPart::Text {
            text: prompt.to_string(),
        }];
        if let Some(b64) = image_b64 {
            content.push(ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: format!("data:image/jpeg;base64,{b64}"),
                },
            });
        }

        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content,
            }],
        };

        let response = self
            .http
            .post(&self.api_base)
            .bearer_auth(self.api_key()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::new(EngineErrorCode::ApiError, e.to_string()))?;

        if !response.status().is_success() {
            return Err(EngineError::new(
                EngineErrorCode::ApiError,
                format!("GPT API returned {}", response.status()),
            ));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| EngineError::new(EngineErrorCode::ParseError, e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| EngineError::new(EngineErrorCode::ParseError, "GPT response had no choices"))
    }

    fn parse_dwc_json(raw: &str) -> Result<TextToDwcOutput, EngineError> {
        let value: serde_json::Value = serde_json::from_str(raw.trim())
            .map_err(|e| EngineError::new(EngineErrorCode::ParseError, format!("GPT response was not JSON: {e}")))?;

        let mut fields = HashMap::new();
        let mut identification_history = Vec::new();

        if let serde_json::Value::Object(map) = value {
            for (key, v) in map {
                if key == "identificationHistory" {
                    if let serde_json::Value::Array(rows) = v {
                        for row in rows {
                            if let serde_json::Value::Object(row_map) = row {
                                let mut out_row = HashMap::new();
                                for (k, rv) in row_map {
                                    out_row.insert(k, value_to_string(&rv));
                                }
                                identification_history.push(out_row);
                            }
                        }
                    }
                    continue;
                }
                fields.insert(key, value_to_string(&v));
            }
        }

        let per_field_confidence = fields.keys().map(|k| (k.clone(), 1.0)).collect();

        Ok(TextToDwcOutput {
            fields,
            per_field_confidence,
            identification_history,
        })
    }
}

fn value_to_string(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl Engine for GptEngine {
    fn name(&self) -> &str {
        &self.alias
    }

    async fn text_to_dwc(
        &self,
        text: &str,
        opts: &TextToDwcOptions,
    ) -> Result<TextToDwcOutput, EngineError> {
        if self.dry_run || opts.dry_run {
            return Ok(TextToDwcOutput::default());
        }
        let prompt = Self::prompt_for(text, opts.instructions.as_deref(), false);
        let raw = self.chat_completion(&prompt, None).await?;
        Self::parse_dwc_json(&raw)
    }

    async fn image_to_dwc(
        &self,
        image_path: &Utf8Path,
        opts: &TextToDwcOptions,
    ) -> Result<TextToDwcOutput, EngineError> {
        let instructions = opts.instructions.as_deref().ok_or_else(|| {
            EngineError::new(
                EngineErrorCode::MissingPrompt,
                "image_to_dwc requires `instructions` in config",
            )
        })?;

        if self.dry_run || opts.dry_run {
            return Ok(TextToDwcOutput::default());
        }

        let bytes = tokio::fs::read(image_path.as_std_path())
            .await
            .map_err(|e| EngineError::new(EngineErrorCode::ApiError, format!("failed to read image: {e}")))?;
        let b64 = general_purpose::STANDARD.encode(&bytes);
        let prompt = Self::prompt_for("", Some(instructions), true);
        let raw = self.chat_completion(&prompt, Some(&b64)).await?;
        Self::parse_dwc_json(&raw)
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<ContentPart>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flat_dwc_json_with_identification_history() {
        let raw = r#"{"catalogNumber": "Herbarium-00123", "identificationHistory": [{"identifiedBy": "A. Botanist"}]}"#;
        let out = GptEngine::parse_dwc_json(raw).unwrap();
        assert_eq!(out.fields.get("catalogNumber").unwrap(), "Herbarium-00123");
        assert_eq!(out.identification_history.len(), 1);
        assert_eq!(
            out.identification_history[0].get("identifiedBy").unwrap(),
            "A. Botanist"
        );
    }
}
