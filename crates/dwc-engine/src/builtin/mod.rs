mod gpt;
mod paddleocr;
mod tesseract;

use std::sync::Arc;

use dwc_config::Config;

use crate::registry::Registry;
use crate::task::Task;
use gpt::GptEngine;
use paddleocr::PaddleOcrEngine;
use tesseract::TesseractEngine;

/// Register every built-in engine this binary ships with (the `init`-analog
/// called out in §9 DESIGN NOTES, mirroring the teacher's
/// `construct_backend_for_provider` dispatch-by-name). Third-party engines
/// register separately via an explicit plug-in hook — see
/// [`Registry::register`].
pub fn register_builtin_engines(registry: &Registry, config: &Config) {
    let tesseract = Arc::new(TesseractEngine::new(config.tesseract.clone()));
    registry.register(Task::ImageToText, "tesseract", tesseract);

    let paddleocr = Arc::new(PaddleOcrEngine::new(config.paddleocr.clone()));
    registry.register(Task::ImageToText, "paddleocr", paddleocr);

    if config.ocr.allow_gpt {
        for (alias, variant) in [
            ("gpt4o", &config.gpt4o),
            ("gpt4omini", &config.gpt4omini),
        ] {
            let model = variant
                .model
                .clone()
                .unwrap_or_else(|| default_model_for(alias).to_string());
            let engine = Arc::new(GptEngine::new(alias, model, config.gpt.dry_run));
            registry.register(Task::TextToDwc, alias, engine.clone());
            registry.register(Task::ImageToDwc, alias, engine);
        }

        let model = config
            .gpt
            .model
            .clone()
            .unwrap_or_else(|| "gpt-4o".to_string());
        let engine = Arc::new(GptEngine::new("gpt", model, config.gpt.dry_run));
        registry.register(Task::TextToDwc, "gpt", engine.clone());
        registry.register(Task::ImageToDwc, "gpt", engine);
    }
}

fn default_model_for(alias: &str) -> &'static str {
    match alias {
        "gpt4o" => "gpt-4o",
        "gpt4omini" => "gpt-4o-mini",
        _ => "gpt-4o",
    }
}
