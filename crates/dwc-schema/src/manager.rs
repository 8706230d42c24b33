use std::collections::HashMap;
use std::sync::RwLock;

use camino::Utf8PathBuf;
use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use crate::error::SchemaError;
use crate::model::{
    CacheMetadata, CompatibilityReport, MappingSuggestion, ParsedSchema, SchemaMetadataEntry,
    SchemaSource,
};
use crate::similarity::similarity_ratio;
use crate::xml_parse::parse_schema_xml;

const DEFAULT_MIN_SIMILARITY: f64 = 0.6;

/// Fetches, caches, and serves DwC/ABCD schema term sets (§4.8).
pub struct SchemaManager {
    cache_dir: Utf8PathBuf,
    sources: Vec<SchemaSource>,
    update_interval: Duration,
    client: reqwest::Client,
    schemas: RwLock<HashMap<String, ParsedSchema>>,
    metadata: RwLock<CacheMetadata>,
}

impl SchemaManager {
    pub fn new(
        cache_dir: impl Into<Utf8PathBuf>,
        sources: Vec<SchemaSource>,
        update_interval_days: i64,
    ) -> Result<Self, SchemaError> {
        let cache_dir = cache_dir.into();
        std::fs::create_dir_all(&cache_dir).ok();
        let metadata = load_metadata(&cache_dir);
        let schemas = load_cached_schemas(&cache_dir, &metadata);
        Ok(Self {
            cache_dir,
            sources,
            update_interval: Duration::days(update_interval_days),
            client: reqwest::Client::new(),
            schemas: RwLock::new(schemas),
            metadata: RwLock::new(metadata),
        })
    }

    fn metadata_path(&self) -> Utf8PathBuf {
        self.cache_dir.join("metadata.json")
    }

    fn schema_path(&self, name: &str) -> Utf8PathBuf {
        self.cache_dir.join(format!("{name}.xsd"))
    }

    fn needs_refresh(&self, name: &str, now: DateTime<Utc>) -> bool {
        let metadata = self.metadata.read().expect("schema metadata lock poisoned");
        match metadata.schemas.get(name) {
            Some(entry) => now.signed_duration_since(entry.last_update) > self.update_interval,
            None => true,
        }
    }

    /// Refresh every configured schema whose cache is stale (or all of
    /// them, if `force`). Per-schema fetch failures are logged and that
    /// schema's existing cached copy (if any) is left in place.
    pub async fn refresh(&self, force: bool) {
        let now = Utc::now();
        for source in &self.sources {
            if !force && !self.needs_refresh(&source.name, now) {
                continue;
            }
            if let Err(err) = self.fetch_one(source, now).await {
                warn!(schema = %source.name, error = %err, "schema refresh failed, keeping cached copy");
            }
        }
    }

    async fn fetch_one(&self, source: &SchemaSource, now: DateTime<Utc>) -> Result<(), SchemaError> {
        let response = self
            .client
            .get(&source.url)
            .send()
            .await
            .map_err(|source_err| SchemaError::Fetch {
                name: source.name.clone(),
                url: source.url.clone(),
                source: source_err,
            })?;
        if !response.status().is_success() {
            return Err(SchemaError::BadStatus {
                name: source.name.clone(),
                status: response.status().as_u16(),
            });
        }
        let bytes = response.bytes().await.map_err(|source_err| SchemaError::Fetch {
            name: source.name.clone(),
            url: source.url.clone(),
            source: source_err,
        })?;

        let parsed = parse_schema_xml(&source.name, &bytes)?;
        dwc_fsutil::write_file_atomic(&self.schema_path(&source.name), &bytes)?;

        {
            let mut metadata = self.metadata.write().expect("schema metadata lock poisoned");
            metadata.schemas.insert(
                source.name.clone(),
                SchemaMetadataEntry {
                    namespace: parsed.namespace.clone(),
                    term_count: parsed.term_count(),
                    last_update: now,
                },
            );
        }
        self.persist_metadata();

        self.schemas
            .write()
            .expect("schema cache lock poisoned")
            .insert(source.name.clone(), parsed);
        Ok(())
    }

    fn persist_metadata(&self) {
        let metadata = self.metadata.read().expect("schema metadata lock poisoned");
        if let Ok(bytes) = serde_json::to_vec_pretty(&*metadata) {
            let _ = dwc_fsutil::write_file_atomic(&self.metadata_path(), &bytes);
        }
    }

    #[must_use]
    pub fn available_schemas(&self) -> Vec<String> {
        let mut names: Vec<String> = self.schemas.read().expect("schema cache lock poisoned").keys().cloned().collect();
        names.sort();
        names
    }

    #[must_use]
    pub fn term_set(&self, name: &str) -> Option<std::collections::BTreeSet<String>> {
        self.schemas
            .read()
            .expect("schema cache lock poisoned")
            .get(name)
            .map(|schema| schema.terms.clone())
    }

    #[must_use]
    pub fn deprecated_terms(&self, name: &str) -> Option<std::collections::BTreeSet<String>> {
        self.schemas
            .read()
            .expect("schema cache lock poisoned")
            .get(name)
            .map(|schema| schema.deprecated_terms.clone())
    }

    pub fn compatibility_report(&self, a: &str, b: &str) -> Result<CompatibilityReport, SchemaError> {
        let schemas = self.schemas.read().expect("schema cache lock poisoned");
        let schema_a = schemas.get(a).ok_or_else(|| SchemaError::UnknownSchema(a.to_string()))?;
        let schema_b = schemas.get(b).ok_or_else(|| SchemaError::UnknownSchema(b.to_string()))?;

        Ok(CompatibilityReport {
            schema_a: a.to_string(),
            schema_b: b.to_string(),
            shared_terms: schema_a.terms.intersection(&schema_b.terms).cloned().collect(),
            only_in_a: schema_a.terms.difference(&schema_b.terms).cloned().collect(),
            only_in_b: schema_b.terms.difference(&schema_a.terms).cloned().collect(),
        })
    }

    /// Suggest the best-matching schema term for `field`, across all
    /// cached schemas, if any scores above `min_similarity`
    /// (default 0.6, §4.8).
    #[must_use]
    pub fn suggest_mapping(&self, field: &str, min_similarity: Option<f64>) -> Option<MappingSuggestion> {
        let threshold = min_similarity.unwrap_or(DEFAULT_MIN_SIMILARITY);
        let field_lower = field.to_lowercase();
        let schemas = self.schemas.read().expect("schema cache lock poisoned");

        let mut best: Option<MappingSuggestion> = None;
        for schema in schemas.values() {
            for term in &schema.terms {
                let similarity = similarity_ratio(&field_lower, &term.to_lowercase());
                if similarity < threshold {
                    continue;
                }
                let better = match &best {
                    Some(current) => similarity > current.similarity,
                    None => true,
                };
                if better {
                    best = Some(MappingSuggestion {
                        field: field.to_string(),
                        suggested_term: term.clone(),
                        schema: schema.name.clone(),
                        similarity,
                    });
                }
            }
        }
        best
    }
}

fn load_metadata(cache_dir: &Utf8PathBuf) -> CacheMetadata {
    let path = cache_dir.join("metadata.json");
    let Ok(content) = std::fs::read_to_string(&path) else {
        return CacheMetadata::default();
    };
    match serde_json::from_str(&content) {
        Ok(metadata) => metadata,
        Err(err) => {
            warn!(%path, error = %err, "corrupt schema cache metadata, starting empty");
            CacheMetadata::default()
        }
    }
}

fn load_cached_schemas(
    cache_dir: &Utf8PathBuf,
    metadata: &CacheMetadata,
) -> HashMap<String, ParsedSchema> {
    let mut schemas = HashMap::new();
    for name in metadata.schemas.keys() {
        let path = cache_dir.join(format!("{name}.xsd"));
        let Ok(bytes) = std::fs::read(&path) else {
            continue;
        };
        match parse_schema_xml(name, &bytes) {
            Ok(parsed) => {
                schemas.insert(name.clone(), parsed);
            }
            Err(err) => {
                warn!(%path, error = %err, "corrupt cached schema XML, will refetch on next refresh");
            }
        }
    }
    schemas
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn compatibility_report_computes_set_overlap() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SchemaManager::new(
            Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap(),
            Vec::new(),
            30,
        )
        .unwrap();

        {
            let mut schemas = manager.schemas.write().unwrap();
            schemas.insert(
                "dwc".to_string(),
                ParsedSchema {
                    name: "dwc".to_string(),
                    namespace: None,
                    terms: ["catalogNumber", "scientificName"].into_iter().map(String::from).collect(),
                    deprecated_terms: Default::default(),
                },
            );
            schemas.insert(
                "abcd".to_string(),
                ParsedSchema {
                    name: "abcd".to_string(),
                    namespace: None,
                    terms: ["catalogNumber", "unitID"].into_iter().map(String::from).collect(),
                    deprecated_terms: Default::default(),
                },
            );
        }

        let report = manager.compatibility_report("dwc", "abcd").unwrap();
        assert!(report.shared_terms.contains("catalogNumber"));
        assert!(report.only_in_a.contains("scientificName"));
        assert!(report.only_in_b.contains("unitID"));
    }

    #[tokio::test]
    async fn unknown_schema_name_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SchemaManager::new(
            Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap(),
            Vec::new(),
            30,
        )
        .unwrap();
        assert!(manager.compatibility_report("dwc", "abcd").is_err());
    }

    #[tokio::test]
    async fn suggest_mapping_finds_the_closest_term_above_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SchemaManager::new(
            Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap(),
            Vec::new(),
            30,
        )
        .unwrap();
        {
            let mut schemas = manager.schemas.write().unwrap();
            schemas.insert(
                "dwc".to_string(),
                ParsedSchema {
                    name: "dwc".to_string(),
                    namespace: None,
                    terms: ["catalogNumber", "scientificName"].into_iter().map(String::from).collect(),
                    deprecated_terms: Default::default(),
                },
            );
        }

        let suggestion = manager.suggest_mapping("catalog_num", None).unwrap();
        assert_eq!(suggestion.suggested_term, "catalogNumber");
    }

    #[tokio::test]
    async fn corrupt_metadata_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("metadata.json"), b"not json").unwrap();
        let manager = SchemaManager::new(
            Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap(),
            Vec::new(),
            30,
        )
        .unwrap();
        assert!(manager.available_schemas().is_empty());
    }
}
