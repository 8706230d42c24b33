use std::collections::BTreeMap;
use std::sync::Arc;

use camino::Utf8PathBuf;
use chrono::{SecondsFormat, Utc};
use dwc_config::Config;
use dwc_engine::{register_builtin_engines, Registry};
use dwc_mapper::Mapper;
use dwc_ocr_cache::OcrCache;
use dwc_orchestrator::{process_specimen, Outcome, OrchestratorError, PipelineContext, ProcessingStateStore};
use dwc_output::{
    build_manifest, build_meta_xml, write_bundle, BundleFormat, EventWriter, IdentHistoryCsvWriter,
    OccurrenceCsvWriter,
};
use dwc_provenance::ProvenanceLog;
use dwc_specimen_index::{SpecimenIndex, SpecimenIndexSnapshot};
use dwc_types::error::PipelineError;
use dwc_types::{DataQualityIssue, ProcessingState, SpecimenId};
use tokio::sync::{mpsc, Semaphore};
use tracing::{info, warn};

use crate::error::RunControllerError;
use crate::git::current_commit_hash;
use crate::input::{default_extensions, enumerate_inputs};

/// Everything the programmatic entry point (§6: `run(inputDir, outputDir,
/// config, enabledEngines?, resume)`) needs, bundled into one value.
pub struct RunOptions {
    pub input_dir: Utf8PathBuf,
    pub output_dir: Utf8PathBuf,
    pub config: Config,
    pub enabled_engines: Option<Vec<String>>,
    pub resume: bool,
    pub input_extensions: Vec<String>,
}

impl RunOptions {
    #[must_use]
    pub fn new(
        input_dir: impl Into<Utf8PathBuf>,
        output_dir: impl Into<Utf8PathBuf>,
        config: Config,
    ) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            config,
            enabled_engines: None,
            resume: false,
            input_extensions: default_extensions(),
        }
    }
}

/// What a completed (or aborted) run produced, for the caller's log line
/// and exit-code decision (§4.11, §6).
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub run_id: String,
    pub specimens_seen: usize,
    pub specimens_processed: usize,
    pub specimens_skipped: usize,
    pub specimens_failed: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub data_quality_issues: Vec<DataQualityIssue>,
    pub manifest_path: Utf8PathBuf,
}

struct WorkerMessage {
    specimen_id: SpecimenId,
    result: Result<Outcome, OrchestratorError>,
}

fn specimen_id_for(path: &camino::Utf8Path) -> SpecimenId {
    path.file_stem().map(str::to_string).unwrap_or_else(|| path.to_string())
}

/// Loads the specimen index persisted by a prior run's [`save_specimen_index`]
/// (§4.11 resume semantics). A missing or corrupt snapshot is not fatal —
/// `resume=true` against a fresh output directory just starts from an empty
/// index, the same as `resume=false` would.
fn load_specimen_index(path: &Utf8PathBuf) -> Result<SpecimenIndex, RunControllerError> {
    let Ok(bytes) = std::fs::read(path) else {
        return Ok(SpecimenIndex::new()?);
    };
    match serde_json::from_slice::<SpecimenIndexSnapshot>(&bytes) {
        Ok(snapshot) => Ok(SpecimenIndex::from_snapshot(snapshot)?),
        Err(err) => {
            warn!(path = %path, error = %err, "corrupt specimen index snapshot, resuming with an empty index");
            Ok(SpecimenIndex::new()?)
        }
    }
}

fn save_specimen_index(path: &Utf8PathBuf, snapshot: &SpecimenIndexSnapshot) -> Result<(), RunControllerError> {
    let bytes = serde_json::to_vec_pretty(snapshot).expect("SpecimenIndexSnapshot always serializes");
    std::fs::write(path, bytes).map_err(|source| RunControllerError::Io {
        path: path.clone(),
        source,
    })
}

/// Loads the processing-state table persisted by a prior run's
/// [`save_processing_state`]. Same missing/corrupt handling as
/// [`load_specimen_index`].
fn load_processing_state(path: &Utf8PathBuf) -> ProcessingStateStore {
    let Ok(bytes) = std::fs::read(path) else {
        return ProcessingStateStore::new();
    };
    match serde_json::from_slice::<Vec<ProcessingState>>(&bytes) {
        Ok(states) => ProcessingStateStore::from_snapshot(states),
        Err(err) => {
            warn!(path = %path, error = %err, "corrupt processing state snapshot, resuming with empty state");
            ProcessingStateStore::new()
        }
    }
}

fn save_processing_state(path: &Utf8PathBuf, states: &[ProcessingState]) -> Result<(), RunControllerError> {
    let bytes = serde_json::to_vec_pretty(states).expect("ProcessingState always serializes");
    std::fs::write(path, bytes).map_err(|source| RunControllerError::Io {
        path: path.clone(),
        source,
    })
}

/// Runs every recognized image under `options.input_dir` through the
/// pipeline and writes the run's outputs to `options.output_dir` (§4.11).
///
/// Per-specimen engine/unknown errors are logged and counted in the
/// returned summary; they never abort the run. A configuration-class
/// error (not retryable, per §7) is fatal: the run stops and `run`
/// returns `Err` without finalizing outputs, matching "fatal configuration
/// errors produce a non-zero termination" (§6).
pub async fn run(options: RunOptions) -> Result<RunSummary, RunControllerError> {
    let registry = Arc::new(Registry::new());
    register_builtin_engines(&registry, &options.config);
    if let Some(allowed) = &options.enabled_engines {
        registry.retain(allowed);
    }
    run_with_registry(options, registry).await
}

/// Same as [`run`], but with a caller-supplied engine registry instead of
/// the real built-in engines — the seam integration tests use to swap in
/// stub engines without a tesseract/GPT dependency.
pub async fn run_with_registry(options: RunOptions, registry: Arc<Registry>) -> Result<RunSummary, RunControllerError> {
    let run_id = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    let started_at = Utc::now();

    std::fs::create_dir_all(&options.output_dir).map_err(|source| RunControllerError::Io {
        path: options.output_dir.clone(),
        source,
    })?;
    let git_commit = current_commit_hash(&options.input_dir);

    let ocr_cache = Arc::new(OcrCache::new(options.output_dir.join(".ocr-cache"))?);
    let specimen_index_path = options.output_dir.join("specimen_index.json");
    let processing_state_path = options.output_dir.join("processing_state.json");
    let specimen_index = Arc::new(if options.resume {
        load_specimen_index(&specimen_index_path)?
    } else {
        SpecimenIndex::new()?
    });
    let mapper = Arc::new(Mapper::new(None, None));
    let state_store = Arc::new(if options.resume {
        load_processing_state(&processing_state_path)
    } else {
        ProcessingStateStore::new()
    });

    let ctx = PipelineContext::with_gbif_cache_dir(
        options.config.clone(),
        registry,
        specimen_index.clone(),
        ocr_cache.clone(),
        mapper,
        state_store.clone(),
        options.output_dir.join(".gbif-cache"),
    );
    if let Some(schema_manager) = &ctx.schema_manager {
        schema_manager.refresh(false).await;
    }

    let inputs = enumerate_inputs(&options.input_dir, &options.input_extensions);
    let specimens_seen = inputs.len();

    let event_writer = EventWriter::new(options.output_dir.join("raw.jsonl"));
    let occurrence_path = options.output_dir.join("occurrence.csv");
    let mut occurrence_writer = OccurrenceCsvWriter::open(&occurrence_path, options.config.dwc.term_order.clone())?;
    let ident_path = options.output_dir.join("identification_history.csv");
    let mut ident_writer = IdentHistoryCsvWriter::open(&ident_path)?;
    let provenance_log = ProvenanceLog::new(options.output_dir.join("provenance.jsonl"));

    let max_workers = options.config.image_source.max_workers.max(1);
    let semaphore = Arc::new(Semaphore::new(max_workers));
    let (tx, mut rx) = mpsc::channel::<WorkerMessage>(128);

    let mut handles = Vec::with_capacity(inputs.len());
    for path in inputs {
        let permit_sem = semaphore.clone();
        let ctx = ctx.clone();
        let tx = tx.clone();
        let run_id = run_id.clone();
        handles.push(tokio::spawn(async move {
            let _permit = permit_sem
                .acquire_owned()
                .await
                .expect("semaphore is never closed mid-run");
            let specimen_id = specimen_id_for(&path);
            let camera_filename = path.file_name().unwrap_or(specimen_id.as_str()).to_string();
            let result = process_specimen(&ctx, &run_id, specimen_id.clone(), camera_filename, &path).await;
            let _ = tx.send(WorkerMessage { specimen_id, result }).await;
        }));
    }
    drop(tx);

    let mut processed = 0usize;
    let mut skipped = 0usize;
    let mut failed = 0usize;
    let mut fatal: Option<String> = None;
    let mut fragment_type_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut processed_specimen_ids: Vec<SpecimenId> = Vec::new();

    while let Some(message) = rx.recv().await {
        match message.result {
            Ok(Outcome::Processed(outcome)) => {
                event_writer.append_event(&outcome.event)?;
                occurrence_writer.append_record(&outcome.dwc_record.fields)?;
                for row in &outcome.identification_history {
                    let row: BTreeMap<String, String> = row.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                    ident_writer.append_record(&row)?;
                }
                for fragment in &outcome.fragments {
                    provenance_log.append(fragment)?;
                    *fragment_type_counts.entry(fragment.fragment_type.as_str().to_string()).or_insert(0) += 1;
                }
                processed_specimen_ids.push(message.specimen_id);
                processed += 1;
            }
            Ok(Outcome::Skipped(reason)) => {
                info!(specimen_id = %message.specimen_id, ?reason, "specimen skipped");
                skipped += 1;
            }
            Err(err) => {
                let pipeline_err: PipelineError = err.into();
                if pipeline_err.is_retryable() {
                    warn!(specimen_id = %message.specimen_id, error = %pipeline_err, "specimen failed, will retry on a later run");
                    failed += 1;
                } else {
                    warn!(specimen_id = %message.specimen_id, error = %pipeline_err, "fatal configuration error");
                    fatal.get_or_insert(pipeline_err.to_string());
                }
            }
        }
    }

    for handle in handles {
        let _ = handle.await;
    }

    if let Some(message) = fatal {
        return Err(RunControllerError::Configuration(message));
    }

    occurrence_writer.flush()?;
    ident_writer.flush()?;

    let aggregations: Vec<_> = processed_specimen_ids.iter().map(|id| specimen_index.aggregate(id)).collect();
    let data_quality_issues = specimen_index.check_data_quality(&aggregations);

    let meta_xml = build_meta_xml(&options.config.dwc.term_order)?;
    let meta_xml_path = options.output_dir.join("meta.xml");
    std::fs::write(&meta_xml_path, &meta_xml).map_err(|source| RunControllerError::Io {
        path: meta_xml_path.clone(),
        source,
    })?;

    let manifest = build_manifest(
        run_id.clone(),
        started_at,
        git_commit.clone(),
        &options.config,
        fragment_type_counts,
        "provenance.jsonl",
    )?;
    let manifest_path = options.output_dir.join("manifest.json");
    manifest.write(&manifest_path)?;

    let utc_compact = started_at.format("%Y%m%dT%H%M%SZ").to_string();
    write_bundle(
        &options.output_dir,
        env!("CARGO_PKG_VERSION"),
        BundleFormat::Simple,
        &utc_compact,
        git_commit.as_deref(),
        None,
        &[
            ("occurrence.csv", occurrence_path),
            ("identification_history.csv", ident_path),
            ("meta.xml", meta_xml_path),
            ("manifest.json", manifest_path.clone()),
        ],
        true,
    )?;

    save_specimen_index(&specimen_index_path, &specimen_index.snapshot())?;
    save_processing_state(&processing_state_path, &state_store.snapshot())?;

    let cache_stats = ocr_cache.stats();
    info!(
        run_id = %run_id,
        specimens_seen,
        processed,
        skipped,
        failed,
        cache_hits = cache_stats.hits,
        cache_misses = cache_stats.misses,
        "run complete"
    );

    Ok(RunSummary {
        run_id,
        specimens_seen,
        specimens_processed: processed,
        specimens_skipped: skipped,
        specimens_failed: failed,
        cache_hits: cache_stats.hits,
        cache_misses: cache_stats.misses,
        data_quality_issues,
        manifest_path,
    })
}
