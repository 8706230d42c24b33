use std::collections::{BTreeMap, BTreeSet, HashMap};

use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use dwc_config::Config;
use dwc_engine::{ImageToTextOptions, Task, TextToDwcOptions};
use dwc_gbif::{LocalityOutcome, TaxonomyInput};
use dwc_mapper::ValidationContext;
use dwc_preprocess::PreprocessParams;
use dwc_types::{
    Candidate, ConfigurationError, Extraction, ExtractionStatus, FieldValue, FragmentType,
    ImageTransformation, OcrCacheKey, OperationStep, OriginalFile, OriginalFileRole, PipelineError,
    ProcessingState, ProcessingStatus, ProvenanceFragment, Sha256Hex, SpecimenId,
};
use tracing::{info, instrument, warn};

use crate::context::PipelineContext;
use crate::error::OrchestratorError;
use crate::qc::estimate_scan_pct;
use crate::types::{GbifVerificationSummary, RawEvent, SkipReason, SpecimenOutcome};

const PROCESS_MODULE: &str = "process";

/// What `process_specimen` did for one specimen.
#[derive(Debug, Clone)]
pub enum Outcome {
    Processed(SpecimenOutcome),
    Skipped(SkipReason),
}

/// Deletes the preprocessing temp file on drop, regardless of how the
/// pipeline exits (`dwc-preprocess` hands ownership of the temp file back
/// to its caller; this is where we discharge it).
struct TempCleanup(Option<Utf8PathBuf>);

impl Drop for TempCleanup {
    fn drop(&mut self) {
        if let Some(path) = &self.0 {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// Run one specimen through the full pipeline: preprocessing, engine
/// dispatch, mapping/validation, GBIF verification, and QC flags (§4.6).
///
/// Per-specimen failures never abort a run. Retryable errors are recorded
/// on the processing state and propagated so the run controller can log
/// and move on; configuration errors propagate unchanged and are expected
/// to abort the run (§7).
#[instrument(skip(ctx, image_path), fields(specimen_id = %specimen_id))]
pub async fn process_specimen(
    ctx: &PipelineContext,
    run_id: &str,
    specimen_id: SpecimenId,
    camera_filename: String,
    image_path: &Utf8Path,
) -> Result<Outcome, OrchestratorError> {
    ctx.specimen_index
        .register_specimen(specimen_id.clone(), camera_filename, None);

    let prior_state = ctx.state_store.get(&specimen_id, PROCESS_MODULE);
    if let Some(state) = &prior_state {
        if state.status == ProcessingStatus::Done {
            return Ok(Outcome::Skipped(SkipReason::AlreadyDone));
        }
        if state.status == ProcessingStatus::Error && state.retries >= ctx.config.processing.retry_limit
        {
            warn!(specimen_id = %specimen_id, retries = state.retries, "skipping specimen, retry limit reached");
            return Ok(Outcome::Skipped(SkipReason::RetryLimitReached));
        }
    }

    match run_steps(ctx, run_id, &specimen_id, image_path).await {
        Ok(outcome) => {
            ctx.state_store.upsert(ProcessingState {
                specimen_id: specimen_id.clone(),
                module: PROCESS_MODULE.to_string(),
                status: ProcessingStatus::Done,
                retries: prior_state.map(|s| s.retries).unwrap_or(0),
                error_code: None,
                error_message: None,
                confidence: Some(outcome.mean_confidence),
                updated_at: Utc::now(),
            });
            info!(specimen_id = %specimen_id, confidence = outcome.mean_confidence, "specimen processed");
            Ok(Outcome::Processed(outcome))
        }
        Err(err) => {
            let pipeline_err: PipelineError = err.into();
            if pipeline_err.is_retryable() {
                let retries = prior_state.map(|s| s.retries).unwrap_or(0) + 1;
                ctx.state_store.upsert(ProcessingState {
                    specimen_id: specimen_id.clone(),
                    module: PROCESS_MODULE.to_string(),
                    status: ProcessingStatus::Error,
                    retries,
                    error_code: Some(pipeline_err.error_code()),
                    error_message: Some(pipeline_err.to_string()),
                    confidence: None,
                    updated_at: Utc::now(),
                });
                warn!(specimen_id = %specimen_id, error = %pipeline_err, retries, "specimen failed, recorded for retry");
            } else {
                warn!(specimen_id = %specimen_id, error = %pipeline_err, "specimen failed with a configuration error");
            }
            Err(OrchestratorError::Pipeline(pipeline_err))
        }
    }
}

async fn run_steps(
    ctx: &PipelineContext,
    run_id: &str,
    specimen_id: &SpecimenId,
    image_path: &Utf8Path,
) -> Result<SpecimenOutcome, OrchestratorError> {
    let config = &ctx.config;
    let input_bytes = std::fs::read(image_path).map_err(|e| {
        OrchestratorError::Pipeline(PipelineError::Unknown(format!(
            "failed to read {image_path}: {e}"
        )))
    })?;
    let input_sha = Sha256Hex::of(&input_bytes);

    ctx.specimen_index.register_original(OriginalFile {
        sha256: input_sha.clone(),
        specimen_id: specimen_id.clone(),
        path: image_path.to_path_buf(),
        format: image_path.extension().unwrap_or("").to_string(),
        dimensions: None,
        size_bytes: Some(input_bytes.len() as u64),
        role: OriginalFileRole::OriginalPhoto,
        captured_at: None,
    });
    if let Some(image_source) = &ctx.image_source {
        if let Err(err) = image_source.register_known_local(&input_sha, image_path) {
            warn!(specimen_id = %specimen_id, error = %err, "failed to register image with the JIT cache");
        }
    }

    let mut chain = dwc_provenance::ProvenanceChain::new();
    let mut fragments: Vec<ProvenanceFragment> = Vec::new();

    let (proc_path, proc_sha, _cleanup) = if config.preprocess.pipeline.is_empty() {
        (image_path.to_path_buf(), input_sha.clone(), TempCleanup(None))
    } else {
        let params = PreprocessParams {
            contrast_factor: config.preprocess.contrast_factor,
            max_dim_px: config.preprocess.max_dim_px,
            binarize_method: config.preprocess.binarize_method.clone(),
            adaptive_window_size: config.preprocess.adaptive_window_size,
            adaptive_k: config.preprocess.adaptive_k,
        };
        let temp_path = dwc_preprocess::run_pipeline(image_path, &config.preprocess.pipeline, &params)?;
        let proc_bytes = std::fs::read(&temp_path).map_err(|e| {
            OrchestratorError::Pipeline(PipelineError::Unknown(format!(
                "failed to read preprocessed image {temp_path}: {e}"
            )))
        })?;
        let proc_sha = Sha256Hex::of(&proc_bytes);

        ctx.specimen_index.register_transformation(ImageTransformation {
            sha256: proc_sha.clone(),
            specimen_id: specimen_id.clone(),
            derived_from: input_sha.clone(),
            operation: config
                .preprocess
                .pipeline
                .iter()
                .map(|name| OperationStep { name: name.clone() })
                .collect(),
            params: HashMap::new(),
            timestamp: Utc::now(),
            tool: "dwc-preprocess".to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        });
        // Not registered with `ctx.image_source`: `temp_path` is removed by
        // `TempCleanup` before this function returns, so it never outlives
        // a cache entry long enough to be worth rehydrating later.

        let mut params_map = BTreeMap::new();
        params_map.insert("steps".to_string(), serde_json::json!(config.preprocess.pipeline));
        params_map.insert("contrast_factor".to_string(), serde_json::json!(params.contrast_factor));
        params_map.insert("max_dim_px".to_string(), serde_json::json!(params.max_dim_px));
        fragments.push(chain.next_fragment(
            FragmentType::ImagePreprocessing,
            input_sha.as_str(),
            "preprocess",
            "dwc-preprocess",
            proc_sha.as_str(),
            params_map,
            BTreeMap::new(),
            BTreeMap::new(),
        )?);

        (temp_path.clone(), proc_sha, TempCleanup(Some(temp_path)))
    };

    let params_hash = extraction_params_hash(config)?;
    // `should` gates whether a *new* extraction attempt is warranted: false
    // means a completed extraction already exists for this exact
    // image+params, so its `dwc_fields` are reused below instead of
    // re-running engines (§4.5, §8's dedup property). `record_extraction`
    // reuses the prior extraction id so the upsert updates that row rather
    // than colliding with it.
    let (should, prior_extraction_id) = ctx.specimen_index.should_extract(&proc_sha, &params_hash);
    let reused_extraction = if should {
        None
    } else {
        prior_extraction_id.as_deref().and_then(|id| ctx.specimen_index.extraction(id))
    };
    let extraction_id = prior_extraction_id.unwrap_or_else(|| format!("{run_id}:{specimen_id}"));

    let mut raw_fields: HashMap<String, String> = HashMap::new();
    let mut raw_confidence: HashMap<String, f32> = HashMap::new();
    let mut identification_history: Vec<HashMap<String, String>> = Vec::new();
    let mut accumulated_text = String::new();
    let mut ocr_engine: Option<String> = None;
    let mut ocr_engine_version: Option<String> = None;
    let mut dwc_engine_name: Option<String> = None;
    let mut dwc_engine_version: Option<String> = None;

    if let Some(extraction) = reused_extraction {
        info!(specimen_id = %specimen_id, extraction_id = %extraction.extraction_id, "reusing prior extraction, image+params already seen");
        for (term, value) in extraction.dwc_fields {
            raw_confidence.insert(term.clone(), value.confidence);
            raw_fields.insert(term, value.value);
        }
    } else {
        for step in &config.pipeline.steps {
            match step.as_str() {
                "image_to_text" => {
                    let engine_name = ctx
                        .registry
                        .select_engine(Task::ImageToText, config)
                        .ok_or_else(|| {
                            configuration_error(ConfigurationError::InvalidEnginePreference(
                                "no image_to_text engine available".to_string(),
                            ))
                        })?;
                    let engine_version = ctx.registry.engine_version(Task::ImageToText, &engine_name);
                    let cache_key = OcrCacheKey::new(proc_sha.clone(), engine_name.clone(), engine_version.clone());

                    let (text, confidences, cache_hit) = match ctx.ocr_cache.get(&cache_key)? {
                        Some(cached) => (cached.extracted_text, vec![cached.confidence], true),
                        None => {
                            let opts = ImageToTextOptions {
                                langs: config.ocr.langs.clone(),
                                lang: config.ocr.langs.first().cloned(),
                                engine_opts: HashMap::new(),
                            };
                            let output = ctx
                                .registry
                                .dispatch_image_to_text(&engine_name, &proc_path, &opts)
                                .await?;
                            let avg = output.avg_confidence();
                            ctx.ocr_cache.upsert(
                                &cache_key,
                                dwc_types::OcrResult {
                                    extracted_text: output.text.clone(),
                                    confidence: avg,
                                    error: false,
                                    ocr_timestamp: Utc::now(),
                                },
                            )?;
                            (output.text, output.per_token_confidences, false)
                        }
                    };

                    let avg_confidence = if confidences.is_empty() {
                        0.0
                    } else {
                        confidences.iter().sum::<f32>() / confidences.len() as f32
                    };
                    ctx.specimen_index.record_candidate(Candidate {
                        run_id: run_id.to_string(),
                        image_sha256: proc_sha.clone(),
                        engine: engine_name.clone(),
                        value: text.clone(),
                        confidence: avg_confidence,
                        error: false,
                    });

                    let (mut final_text, mut final_confidences, mut final_engine, mut final_engine_version) =
                        (text, confidences, engine_name.clone(), engine_version.clone());

                    if let Some(policy) = ctx.registry.get_fallback(&engine_name) {
                        let outcome = policy
                            .apply(
                                &proc_path,
                                &final_text,
                                &final_confidences,
                                config.ocr.langs.first().map(String::as_str),
                            )
                            .await
                            .map_err(|e| OrchestratorError::Pipeline(PipelineError::Engine(e)))?;
                        if outcome.final_engine != engine_name {
                            ctx.specimen_index.record_candidate(Candidate {
                                run_id: run_id.to_string(),
                                image_sha256: proc_sha.clone(),
                                engine: outcome.final_engine.clone(),
                                value: outcome.text.clone(),
                                confidence: {
                                    let c = &outcome.per_token_confidences;
                                    if c.is_empty() { 0.0 } else { c.iter().sum::<f32>() / c.len() as f32 }
                                },
                                error: false,
                            });
                        }
                        final_text = outcome.text;
                        final_confidences = outcome.per_token_confidences;
                        final_engine = outcome.final_engine;
                        final_engine_version = outcome.final_engine_version;
                    }

                    accumulated_text = final_text.clone();
                    ocr_engine = Some(final_engine.clone());
                    ocr_engine_version = final_engine_version.clone();

                    let avg_final = if final_confidences.is_empty() {
                        0.0
                    } else {
                        final_confidences.iter().sum::<f32>() / final_confidences.len() as f32
                    };
                    let mut quality = BTreeMap::new();
                    quality.insert("avg_confidence".to_string(), serde_json::json!(avg_final));
                    let mut params_map = BTreeMap::new();
                    params_map.insert("engine".to_string(), serde_json::json!(final_engine));
                    params_map.insert("cache_hit".to_string(), serde_json::json!(cache_hit));
                    fragments.push(chain.next_fragment(
                        FragmentType::OcrExtraction,
                        proc_sha.as_str(),
                        "ocr",
                        final_engine.as_str(),
                        Sha256Hex::of(final_text.as_bytes()).as_str(),
                        params_map,
                        quality,
                        BTreeMap::new(),
                    )?);
                }
                "text_to_dwc" => {
                    let engine_name = ctx
                        .registry
                        .select_engine(Task::TextToDwc, config)
                        .ok_or_else(|| {
                            configuration_error(ConfigurationError::InvalidEnginePreference(
                                "no text_to_dwc engine available".to_string(),
                            ))
                        })?;
                    let engine_version = ctx.registry.engine_version(Task::TextToDwc, &engine_name);
                    let opts = TextToDwcOptions {
                        fields: None,
                        model: config.gpt.model.clone(),
                        dry_run: config.gpt.dry_run,
                        prompt_dir: config.gpt.prompt_dir.clone(),
                        instructions: None,
                    };
                    let output = ctx
                        .registry
                        .dispatch_text_to_dwc(&engine_name, &accumulated_text, &opts)
                        .await?;
                    raw_fields.extend(output.fields);
                    raw_confidence.extend(output.per_field_confidence);
                    identification_history.extend(output.identification_history);
                    if dwc_engine_name.is_none() {
                        dwc_engine_name = Some(engine_name.clone());
                        dwc_engine_version = engine_version;
                    }

                    let text_sha = Sha256Hex::of(accumulated_text.as_bytes());
                    fragments.push(chain.next_fragment(
                        FragmentType::DwcExtraction,
                        text_sha.as_str(),
                        "text_to_dwc",
                        engine_name.as_str(),
                        text_sha.as_str(),
                        BTreeMap::new(),
                        BTreeMap::new(),
                        BTreeMap::new(),
                    )?);
                }
                "image_to_dwc" => {
                    let instructions = config.pipeline.image_to_dwc_instructions.clone().ok_or_else(|| {
                        configuration_error(ConfigurationError::MissingKey(
                            "pipeline.image_to_dwc_instructions".to_string(),
                        ))
                    })?;
                    let engine_name = ctx
                        .registry
                        .select_engine(Task::ImageToDwc, config)
                        .ok_or_else(|| {
                            configuration_error(ConfigurationError::InvalidEnginePreference(
                                "no image_to_dwc engine available".to_string(),
                            ))
                        })?;
                    let engine_version = ctx.registry.engine_version(Task::ImageToDwc, &engine_name);
                    let opts = TextToDwcOptions {
                        fields: None,
                        model: config.gpt.model.clone(),
                        dry_run: config.gpt.dry_run,
                        prompt_dir: config.gpt.prompt_dir.clone(),
                        instructions: Some(instructions),
                    };
                    let output = ctx
                        .registry
                        .dispatch_image_to_dwc(&engine_name, &proc_path, &opts)
                        .await?;
                    raw_fields.extend(output.fields);
                    raw_confidence.extend(output.per_field_confidence);
                    identification_history.extend(output.identification_history);
                    if dwc_engine_name.is_none() {
                        dwc_engine_name = Some(engine_name.clone());
                        dwc_engine_version = engine_version;
                    }

                    fragments.push(chain.next_fragment(
                        FragmentType::DwcExtraction,
                        proc_sha.as_str(),
                        "image_to_dwc",
                        engine_name.as_str(),
                        proc_sha.as_str(),
                        BTreeMap::new(),
                        BTreeMap::new(),
                        BTreeMap::new(),
                    )?);
                }
                other => {
                    return Err(OrchestratorError::Pipeline(PipelineError::UnsupportedStep(
                        other.to_string(),
                    )));
                }
            }
        }
    }

    let mut record = ctx.mapper.map_record(&raw_fields, &raw_confidence);
    let mut added_fields = Vec::new();
    let mut event_errors = Vec::new();

    let mut gbif_summary = None;
    if config.qc.gbif.enabled {
        if let Some(gbif) = &ctx.gbif {
            let mut summary = GbifVerificationSummary {
                taxonomy: None,
                locality: None,
                occurrence: None,
            };

            let taxonomy_input = TaxonomyInput {
                scientific_name: record.get("scientificName").map(str::to_string),
                kingdom: record.get("kingdom").map(str::to_string),
                phylum: record.get("phylum").map(str::to_string),
                class: record.get("class").map(str::to_string),
                order: record.get("order").map(str::to_string),
                family: record.get("family").map(str::to_string),
                genus: record.get("genus").map(str::to_string),
                specific_epithet: record.get("specificEpithet").map(str::to_string),
            };
            if taxonomy_input.scientific_name.is_some() {
                if let Some(taxonomy) = gbif.verify_taxonomy(&taxonomy_input).await {
                    apply_taxonomy(&mut record, &taxonomy, &mut added_fields);
                    for issue in &taxonomy.issues {
                        record.add_flag(format!("gbif_issue:taxonomy:{issue}"));
                    }
                    summary.taxonomy = Some(taxonomy);
                }
            }

            let coords = record
                .get("decimalLatitude")
                .and_then(|v| v.parse::<f64>().ok())
                .zip(record.get("decimalLongitude").and_then(|v| v.parse::<f64>().ok()));
            if let Some((lat, lon)) = coords {
                match gbif.verify_locality(lat, lon).await {
                    LocalityOutcome::Verified(locality) => {
                        apply_locality(&mut record, &locality, &mut added_fields);
                        for issue in &locality.issues {
                            record.add_flag(format!("gbif_issue:locality:{issue}"));
                        }
                        summary.locality = Some(locality);
                    }
                    LocalityOutcome::InvalidInput(reason) => {
                        record.add_flag(format!("gbif_issue:locality:{reason}"));
                    }
                    LocalityOutcome::Unavailable => {
                        event_errors.push("GBIF verification error: locality service unavailable".to_string());
                    }
                }

                if config.qc.gbif.enable_occurrence_validation {
                    if let Some(occurrence) = gbif.validate_occurrence(lat, lon).await {
                        for issue in &occurrence.issues {
                            record.add_flag(format!("gbif_issue:occurrence:{issue}"));
                        }
                        summary.occurrence = Some(occurrence);
                    }
                }
            }

            let mut quality = BTreeMap::new();
            quality.insert("issue_count".to_string(), serde_json::json!(record.flags.len()));
            fragments.push(chain.next_fragment(
                FragmentType::QcValidation,
                proc_sha.as_str(),
                "gbif_verification",
                "dwc-gbif",
                proc_sha.as_str(),
                BTreeMap::new(),
                quality,
                BTreeMap::new(),
            )?);

            gbif_summary = Some(summary);
        }
    }

    let (known_terms, deprecated_terms) = schema_validation_sets(ctx);
    ctx.mapper.validate(
        &mut record,
        &ValidationContext {
            required_terms: config.dwc.strict_minimal_fields.clone(),
            known_terms,
            deprecated_terms,
        },
    );

    if let Some(dup_flag) = ctx.duplicates.check_and_record(&input_sha) {
        record.add_flag(dup_flag);
    }
    if record.mean_confidence() < config.qc.low_confidence_flag {
        record.add_flag("low_confidence");
    }
    let scan_pct = if ocr_engine.is_some() {
        let token_count = accumulated_text.split_whitespace().count();
        let pct = estimate_scan_pct(token_count);
        if pct >= 100.0 - config.qc.top_fifth_scan_pct {
            record.add_flag("top_fifth_scan");
        }
        Some(pct)
    } else {
        None
    };

    let mut dwc_fields = HashMap::new();
    for (term, value) in &record.fields {
        dwc_fields.insert(
            term.clone(),
            FieldValue {
                value: value.clone(),
                confidence: record.field_confidence.get(term).copied().unwrap_or(0.0),
            },
        );
    }
    ctx.specimen_index.record_extraction(Extraction {
        extraction_id,
        image_sha256: proc_sha.clone(),
        params_hash,
        specimen_id: specimen_id.clone(),
        run_id: run_id.to_string(),
        status: ExtractionStatus::Completed,
        dwc_fields,
        raw_event_offset: 0,
        timestamp: Utc::now(),
    })?;

    let (engine, engine_version) = match &ocr_engine {
        Some(e) => (Some(e.clone()), ocr_engine_version),
        None => (dwc_engine_name, dwc_engine_version),
    };

    let mean_confidence = record.mean_confidence();
    let event = RawEvent {
        run_id: run_id.to_string(),
        image: image_path.to_string(),
        sha256: input_sha.as_str().to_string(),
        engine,
        engine_version,
        dwc: record.fields.clone(),
        dwc_confidence: record.field_confidence.clone(),
        flags: record.flags.clone(),
        added_fields,
        errors: event_errors,
        identification_history: if identification_history.is_empty() {
            None
        } else {
            Some(identification_history.clone())
        },
        gbif_verification: gbif_summary,
        scan_pct,
    };

    Ok(SpecimenOutcome {
        specimen_id: specimen_id.clone(),
        event,
        dwc_record: record,
        identification_history,
        fragments,
        mean_confidence,
        recorded_at: Utc::now(),
    })
}

fn configuration_error(err: ConfigurationError) -> OrchestratorError {
    OrchestratorError::Pipeline(PipelineError::Configuration(err))
}

/// Unions `term_set`/`deprecated_terms` across every schema
/// [`PipelineContext::schema_manager`] currently has cached, so
/// `ValidationContext`'s `invalid_fields:`/`deprecated_fields:` flags (§4.7)
/// are populated whenever `config.dwc.schema_files` names at least one
/// schema. `(None, empty)` when no schema manager is configured, matching
/// the unconstrained behavior validation always had before §4.8 was wired
/// in.
fn schema_validation_sets(ctx: &PipelineContext) -> (Option<BTreeSet<String>>, BTreeSet<String>) {
    let Some(manager) = &ctx.schema_manager else {
        return (None, BTreeSet::new());
    };
    let mut known = BTreeSet::new();
    let mut deprecated = BTreeSet::new();
    let mut any = false;
    for schema in manager.available_schemas() {
        if let Some(terms) = manager.term_set(&schema) {
            any = true;
            known.extend(terms);
        }
        if let Some(terms) = manager.deprecated_terms(&schema) {
            deprecated.extend(terms);
        }
    }
    (any.then_some(known), deprecated)
}

fn extraction_params_hash(config: &Config) -> Result<dwc_types::ParamsHash, dwc_canon::CanonError> {
    let mut map = BTreeMap::new();
    map.insert("pipeline_steps".to_string(), serde_json::to_value(&config.pipeline.steps)?);
    map.insert(
        "preprocess_pipeline".to_string(),
        serde_json::to_value(&config.preprocess.pipeline)?,
    );
    map.insert(
        "ocr_preferred_engine".to_string(),
        serde_json::to_value(&config.ocr.preferred_engine)?,
    );
    map.insert(
        "image_to_dwc_instructions".to_string(),
        serde_json::to_value(&config.pipeline.image_to_dwc_instructions)?,
    );
    Ok(dwc_types::ParamsHash(dwc_canon::params_hash(&map)?))
}

/// GBIF-verified taxonomy wins on conflict; absent/empty fields are filled
/// in and added to `added`, present-but-different fields are overwritten,
/// matching values are left alone (§4.9).
fn apply_taxonomy(record: &mut dwc_types::DwcRecord, taxonomy: &dwc_gbif::TaxonomyMatch, added: &mut Vec<String>) {
    let scientific_name = taxonomy
        .accepted_scientific_name
        .clone()
        .or_else(|| taxonomy.species.clone());
    let candidates: Vec<(&str, Option<&str>)> = vec![
        ("kingdom", taxonomy.kingdom.as_deref()),
        ("phylum", taxonomy.phylum.as_deref()),
        ("class", taxonomy.class.as_deref()),
        ("order", taxonomy.order.as_deref()),
        ("family", taxonomy.family.as_deref()),
        ("genus", taxonomy.genus.as_deref()),
        ("scientificName", scientific_name.as_deref()),
    ];
    apply_gbif_fields(record, candidates, added);
}

fn apply_locality(record: &mut dwc_types::DwcRecord, locality: &dwc_gbif::LocalityVerification, added: &mut Vec<String>) {
    let lat = locality.decimal_latitude.to_string();
    let lon = locality.decimal_longitude.to_string();
    let candidates: Vec<(&str, Option<&str>)> = vec![
        ("country", locality.country.as_deref()),
        ("stateProvince", locality.state_province.as_deref()),
        ("countryCode", locality.country_code.as_deref()),
        ("decimalLatitude", Some(lat.as_str())),
        ("decimalLongitude", Some(lon.as_str())),
    ];
    apply_gbif_fields(record, candidates, added);
}

fn apply_gbif_fields(record: &mut dwc_types::DwcRecord, candidates: Vec<(&str, Option<&str>)>, added: &mut Vec<String>) {
    for (term, value) in candidates {
        let Some(value) = value else { continue };
        if value.is_empty() {
            continue;
        }
        match record.get(term) {
            None => {
                record.set(term, value);
                added.push(term.to_string());
                record.add_flag(format!("gbif_updated:{term}"));
            }
            Some(existing) if existing.is_empty() => {
                record.set(term, value);
                added.push(term.to_string());
                record.add_flag(format!("gbif_updated:{term}"));
            }
            Some(existing) if existing != value => {
                record.set(term, value);
                record.add_flag(format!("gbif_updated:{term}"));
            }
            _ => {}
        }
    }
}
