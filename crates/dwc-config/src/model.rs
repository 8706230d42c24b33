//! The `Config` value type: every recognized key from §6, as nested
//! structs — never an opaque key-value map (§9 DESIGN NOTES).

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub preprocess: PreprocessConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub gpt: GptConfig,
    #[serde(default)]
    pub gpt4o: GptVariantConfig,
    #[serde(default)]
    pub gpt4omini: GptVariantConfig,
    #[serde(default)]
    pub tesseract: TesseractConfig,
    #[serde(default)]
    pub paddleocr: PaddleOcrConfig,
    #[serde(default)]
    pub qc: QcConfig,
    #[serde(default)]
    pub dwc: DwcConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
    #[serde(default)]
    pub image_source: ImageSourceConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    #[serde(default = "default_pipeline_steps")]
    pub steps: Vec<String>,
    pub image_to_dwc_instructions: Option<String>,
}

fn default_pipeline_steps() -> Vec<String> {
    vec!["image_to_text".to_string(), "text_to_dwc".to_string()]
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            steps: default_pipeline_steps(),
            image_to_dwc_instructions: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PreprocessConfig {
    #[serde(default)]
    pub pipeline: Vec<String>,
    #[serde(default = "default_contrast_factor")]
    pub contrast_factor: f32,
    #[serde(default = "default_max_dim_px")]
    pub max_dim_px: u32,
    #[serde(default = "default_binarize_method")]
    pub binarize_method: String,
    #[serde(default = "default_adaptive_window_size")]
    pub adaptive_window_size: u32,
    #[serde(default = "default_adaptive_k")]
    pub adaptive_k: f32,
}

fn default_contrast_factor() -> f32 {
    1.0
}
fn default_max_dim_px() -> u32 {
    3000
}
fn default_binarize_method() -> String {
    "otsu".to_string()
}
fn default_adaptive_window_size() -> u32 {
    25
}
fn default_adaptive_k() -> f32 {
    0.2
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            pipeline: Vec::new(),
            contrast_factor: default_contrast_factor(),
            max_dim_px: default_max_dim_px(),
            binarize_method: default_binarize_method(),
            adaptive_window_size: default_adaptive_window_size(),
            adaptive_k: default_adaptive_k(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OcrConfig {
    #[serde(default)]
    pub enabled_engines: Vec<String>,
    pub preferred_engine: Option<String>,
    #[serde(default = "default_langs")]
    pub langs: Vec<String>,
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
    #[serde(default)]
    pub allow_gpt: bool,
}

fn default_langs() -> Vec<String> {
    vec!["eng".to_string()]
}
fn default_confidence_threshold() -> f32 {
    0.5
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled_engines: Vec::new(),
            preferred_engine: None,
            langs: default_langs(),
            confidence_threshold: default_confidence_threshold(),
            allow_gpt: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GptConfig {
    pub model: Option<String>,
    #[serde(default)]
    pub dry_run: bool,
    pub prompt_dir: Option<String>,
    pub fallback_threshold: Option<f32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GptVariantConfig {
    pub model: Option<String>,
    pub fallback_threshold: Option<f32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TesseractConfig {
    pub oem: Option<u32>,
    pub psm: Option<u32>,
    #[serde(default)]
    pub extra_args: Vec<String>,
    #[serde(default)]
    pub model_paths: Vec<String>,
    /// Platform gate override: Tesseract is disallowed on macOS unless set.
    #[serde(default)]
    pub allow_on_macos: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PaddleOcrConfig {
    pub lang: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QcConfig {
    #[serde(default = "default_phash_threshold")]
    pub phash_threshold: u32,
    #[serde(default = "default_low_confidence_flag")]
    pub low_confidence_flag: f32,
    #[serde(default = "default_top_fifth_scan_pct")]
    pub top_fifth_scan_pct: f32,
    #[serde(default)]
    pub gbif: GbifConfig,
}

fn default_phash_threshold() -> u32 {
    2
}
fn default_low_confidence_flag() -> f32 {
    0.5
}
fn default_top_fifth_scan_pct() -> f32 {
    80.0
}

impl Default for QcConfig {
    fn default() -> Self {
        Self {
            phash_threshold: default_phash_threshold(),
            low_confidence_flag: default_low_confidence_flag(),
            top_fifth_scan_pct: default_top_fifth_scan_pct(),
            gbif: GbifConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GbifConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_species_match_endpoint")]
    pub species_match_endpoint: String,
    #[serde(default = "default_geocode_endpoint")]
    pub geocode_endpoint: String,
    #[serde(default = "default_species_suggest_endpoint")]
    pub species_suggest_endpoint: String,
    #[serde(default = "default_occurrence_search_endpoint")]
    pub occurrence_search_endpoint: String,
    #[serde(default = "default_gbif_timeout")]
    pub timeout: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
    #[serde(default = "default_min_confidence_score")]
    pub min_confidence_score: f32,
    #[serde(default)]
    pub enable_fuzzy_matching: bool,
    #[serde(default)]
    pub enable_occurrence_validation: bool,
}

fn default_species_match_endpoint() -> String {
    "https://api.gbif.org/v1/species/match".to_string()
}
fn default_geocode_endpoint() -> String {
    "https://api.gbif.org/v1/geocode/reverse".to_string()
}
fn default_species_suggest_endpoint() -> String {
    "https://api.gbif.org/v1/species/suggest".to_string()
}
fn default_occurrence_search_endpoint() -> String {
    "https://api.gbif.org/v1/occurrence/search".to_string()
}
fn default_gbif_timeout() -> u64 {
    10
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_backoff_factor() -> f64 {
    1.0
}
fn default_cache_size() -> usize {
    1000
}
fn default_min_confidence_score() -> f32 {
    0.80
}

impl Default for GbifConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            species_match_endpoint: default_species_match_endpoint(),
            geocode_endpoint: default_geocode_endpoint(),
            species_suggest_endpoint: default_species_suggest_endpoint(),
            occurrence_search_endpoint: default_occurrence_search_endpoint(),
            timeout: default_gbif_timeout(),
            retry_attempts: default_retry_attempts(),
            backoff_factor: default_backoff_factor(),
            cache_size: default_cache_size(),
            min_confidence_score: default_min_confidence_score(),
            enable_fuzzy_matching: false,
            enable_occurrence_validation: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DwcConfig {
    #[serde(default)]
    pub schema_files: Vec<String>,
    #[serde(default)]
    pub custom: HashMap<String, String>,
    #[serde(default)]
    pub strict_minimal_fields: Vec<String>,
    pub preferred_engine: Option<String>,
    #[serde(default = "default_term_order")]
    pub term_order: Vec<String>,
}

fn default_term_order() -> Vec<String> {
    // Minimal canonical order; callers typically override via config.
    vec![
        "catalogNumber".to_string(),
        "scientificName".to_string(),
        "recordedBy".to_string(),
        "eventDate".to_string(),
        "locality".to_string(),
        "stateProvince".to_string(),
        "country".to_string(),
        "decimalLatitude".to_string(),
        "decimalLongitude".to_string(),
    ]
}

impl Default for DwcConfig {
    fn default() -> Self {
        Self {
            schema_files: Vec::new(),
            custom: HashMap::new(),
            strict_minimal_fields: vec!["catalogNumber".to_string(), "scientificName".to_string()],
            preferred_engine: None,
            term_order: default_term_order(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProcessingConfig {
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,
}

fn default_retry_limit() -> u32 {
    3
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            retry_limit: default_retry_limit(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageSourceConfig {
    /// One of `local`, `s3`, `http`, `multi`.
    #[serde(default = "default_image_source_kind")]
    pub kind: String,
    pub base_dir: Option<String>,
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub prefix: Option<String>,
    pub base_url: Option<String>,
    /// Ordered member list for `kind = "multi"`.
    #[serde(default)]
    pub sources: Vec<ImageSourceConfig>,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
    #[serde(default = "default_max_size_bytes")]
    pub max_size_bytes: u64,
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

fn default_image_source_kind() -> String {
    "local".to_string()
}
fn default_cache_dir() -> String {
    ".dwc-cache/images".to_string()
}
fn default_ttl_seconds() -> u64 {
    7 * 24 * 60 * 60
}
fn default_max_size_bytes() -> u64 {
    10 * 1024 * 1024 * 1024
}
fn default_max_workers() -> usize {
    4
}

impl Default for ImageSourceConfig {
    fn default() -> Self {
        Self {
            kind: default_image_source_kind(),
            base_dir: None,
            bucket: None,
            region: None,
            prefix: None,
            base_url: None,
            sources: Vec::new(),
            cache_dir: default_cache_dir(),
            ttl_seconds: default_ttl_seconds(),
            max_size_bytes: default_max_size_bytes(),
            max_workers: default_max_workers(),
        }
    }
}

/// Source attribution for one configuration value, used for status/debug
/// rendering the way the teacher's `StatusManager::build_effective_config`
/// attributes each value to cli/config/programmatic/default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    Default,
    ConfigFile,
    Env,
    Programmatic,
}

/// Flat key -> (rendered value, source) map for status/debug display.
pub type SourceAttribution = BTreeMap<String, ConfigSource>;
