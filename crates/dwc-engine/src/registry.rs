use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use camino::Utf8Path;
use dwc_config::Config;
use dwc_types::error::{EngineError, RegistryError};
use tracing::instrument;

use crate::engine_trait::{Engine, FallbackPolicy};
use crate::task::Task;
use crate::types::{ImageToTextOptions, ImageToTextOutput, TextToDwcOptions, TextToDwcOutput};

/// Names treated as paid/gated engines; disallowed unless `ocr.allow_gpt`.
const PAID_ENGINES: &[&str] = &["gpt", "gpt4o", "gpt4omini"];

/// Process-wide `(task, engine_name) -> capability` registry (§4.1).
#[derive(Default)]
pub struct Registry {
    engines: Mutex<HashMap<(Task, String), Arc<dyn Engine>>>,
    fallbacks: Mutex<HashMap<String, Arc<dyn FallbackPolicy>>>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent; last write wins for a given `(task, name)`.
    pub fn register(&self, task: Task, name: impl Into<String>, engine: Arc<dyn Engine>) {
        let mut engines = self.engines.lock().expect("registry mutex poisoned");
        engines.insert((task, name.into()), engine);
    }

    /// The registered engine's self-reported version, if it has one and is
    /// registered for `task`. Used to build the OCR cache key and the
    /// `engine_version` field recorded on pipeline events.
    #[must_use]
    pub fn engine_version(&self, task: Task, name: &str) -> Option<String> {
        let engines = self.engines.lock().expect("registry mutex poisoned");
        engines.get(&(task, name.to_string())).and_then(|e| e.version())
    }

    /// Drop every registered engine whose name is not in `allowed`, across
    /// all tasks. Used by the run controller to honor an operator-supplied
    /// engine allow-list (§6 `run(... enabledEngines?, ...)`) without
    /// threading a filter through [`crate::builtin::register_builtin_engines`].
    pub fn retain(&self, allowed: &[String]) {
        let mut engines = self.engines.lock().expect("registry mutex poisoned");
        engines.retain(|(_, name), _| allowed.iter().any(|a| a == name));
    }

    #[must_use]
    pub fn available(&self, task: Task) -> Vec<String> {
        let engines = self.engines.lock().expect("registry mutex poisoned");
        let mut names: Vec<String> = engines
            .keys()
            .filter(|(t, _)| *t == task)
            .map(|(_, name)| name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn register_fallback(&self, engine: impl Into<String>, policy: Arc<dyn FallbackPolicy>) {
        let mut fallbacks = self.fallbacks.lock().expect("registry mutex poisoned");
        fallbacks.insert(engine.into(), policy);
    }

    #[must_use]
    pub fn get_fallback(&self, engine: &str) -> Option<Arc<dyn FallbackPolicy>> {
        let fallbacks = self.fallbacks.lock().expect("registry mutex poisoned");
        fallbacks.get(engine).cloned()
    }

    fn lookup(&self, task: Task, name: &str) -> Result<Arc<dyn Engine>, RegistryError> {
        let engines = self.engines.lock().expect("registry mutex poisoned");
        if !engines.keys().any(|(t, _)| *t == task) {
            return Err(RegistryError::UnknownTask(task.to_string()));
        }
        engines
            .get(&(task, name.to_string()))
            .cloned()
            .ok_or_else(|| RegistryError::UnknownEngine {
                task: task.to_string(),
                engine: name.to_string(),
            })
    }

    #[instrument(skip(self, opts), fields(task = %Task::ImageToText, engine = %name))]
    pub async fn dispatch_image_to_text(
        &self,
        name: &str,
        image_path: &Utf8Path,
        opts: &ImageToTextOptions,
    ) -> Result<ImageToTextOutput, EngineOrRegistryError> {
        let engine = self.lookup(Task::ImageToText, name)?;
        engine
            .image_to_text(image_path, opts)
            .await
            .map_err(EngineOrRegistryError::Engine)
    }

    #[instrument(skip(self, opts), fields(task = %Task::TextToDwc, engine = %name))]
    pub async fn dispatch_text_to_dwc(
        &self,
        name: &str,
        text: &str,
        opts: &TextToDwcOptions,
    ) -> Result<TextToDwcOutput, EngineOrRegistryError> {
        let engine = self.lookup(Task::TextToDwc, name)?;
        engine
            .text_to_dwc(text, opts)
            .await
            .map_err(EngineOrRegistryError::Engine)
    }

    #[instrument(skip(self, opts), fields(task = %Task::ImageToDwc, engine = %name))]
    pub async fn dispatch_image_to_dwc(
        &self,
        name: &str,
        image_path: &Utf8Path,
        opts: &TextToDwcOptions,
    ) -> Result<TextToDwcOutput, EngineOrRegistryError> {
        let engine = self.lookup(Task::ImageToDwc, name)?;
        engine
            .image_to_dwc(image_path, opts)
            .await
            .map_err(EngineOrRegistryError::Engine)
    }

    /// Select which engine to use for `task`: `preferred_engine` if
    /// configured and available and gate-eligible; otherwise the first
    /// available engine (sorted) that passes the gate. Engines that fail a
    /// gate fall through to the next candidate (§4.1).
    #[must_use]
    pub fn select_engine(&self, task: Task, config: &Config) -> Option<String> {
        let available = self.available(task);
        let passes_gate = |name: &str| -> bool {
            if PAID_ENGINES.contains(&name) && !config.ocr.allow_gpt {
                return false;
            }
            if name == "tesseract" && cfg!(target_os = "macos") && !config.tesseract.allow_on_macos
            {
                return false;
            }
            true
        };

        if let Some(preferred) = config.ocr.preferred_engine.as_deref() {
            if available.iter().any(|n| n == preferred) && passes_gate(preferred) {
                return Some(preferred.to_string());
            }
        }

        available.into_iter().find(|n| passes_gate(n))
    }
}

/// Dispatch failures: either the registry lookup missed, or the engine
/// itself failed.
#[derive(Debug, thiserror::Error)]
pub enum EngineOrRegistryError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Engine(EngineError),
}
