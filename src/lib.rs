//! Library entry point for the herbarium specimen extraction pipeline
//! (§1, §6). This crate wires the packaged components — engine registry,
//! preprocessor, OCR cache, image source, specimen index, orchestrator, DwC
//! mapper, schema manager, GBIF client, provenance log, run controller, and
//! output writers — behind a single `run(...)` call; the CLI surface,
//! review UI, and everything else that calls this library live elsewhere.

mod error;

pub use dwc_config::{Config, ConfigLoadError, ConfigSource, SourceAttribution};
pub use dwc_run_controller::RunSummary;
pub use dwc_types::{DataQualityIssue, QualityIssueSeverity, SpecimenId};
pub use error::Error;

use camino::Utf8Path;

/// Runs the pipeline against every recognized image under `input_dir` and
/// writes the run's outputs to `output_dir` (§6).
///
/// `enabled_engines`, when `Some`, restricts dispatch to that allow-list of
/// engine names across every task (see [`dwc_engine::Registry::retain`]).
/// `resume` is accepted for forward compatibility with the resume
/// semantics described in §4.11 but is currently a no-op: every run
/// re-enumerates and re-processes its inputs, relying on the OCR/GBIF
/// caches and specimen index for incremental speedups rather than skipping
/// already-seen specimens outright.
pub async fn run(
    input_dir: impl AsRef<Utf8Path>,
    output_dir: impl AsRef<Utf8Path>,
    config: Config,
    enabled_engines: Option<Vec<String>>,
    resume: bool,
) -> Result<RunSummary, Error> {
    let mut options = dwc_run_controller::RunOptions::new(
        input_dir.as_ref().to_path_buf(),
        output_dir.as_ref().to_path_buf(),
        config,
    );
    options.enabled_engines = enabled_engines;
    options.resume = resume;

    dwc_run_controller::run(options).await.map_err(Error::from)
}

/// Loads the effective configuration from a packaged default deep-merged
/// with an optional user TOML file (§6), for callers that don't already
/// have a `Config` in hand.
pub fn load_config(path: Option<&Utf8Path>) -> Result<(Config, SourceAttribution), Error> {
    Config::load(path).map_err(Error::from)
}
