use std::sync::Mutex;
use std::time::Duration;

use camino::Utf8PathBuf;
use dwc_config::GbifConfig;
use dwc_retry::{Outcome, RetryPolicy};
use tracing::warn;

use crate::error::GbifCallError;
use crate::haversine::haversine_km;
use crate::model::{
    GeocodeReverseEntry, LocalityOutcome, LocalityVerification, MatchType, OccurrenceSearchResponse,
    OccurrenceValidation, SpeciesMatchResponse, SpeciesSuggestEntry, SpeciesSuggestion,
    TaxonomyInput, TaxonomyMatch,
};
use crate::persistent_cache::PersistentCache;
use crate::url_cache::UrlCache;

const PERSISTENT_CACHE_TTL_DAYS: i64 = 30;
/// How far below `min_confidence_score` a verified match still earns a
/// `low_confidence:` issue, to flag borderline matches for review.
const LOW_CONFIDENCE_MARGIN: f32 = 0.1;

/// GBIF taxonomy/locality/occurrence verification client (§4.9). Retry and
/// 4xx/5xx classification follow the same shape as the teacher's
/// `HttpClient::execute_with_retry`, generalized from LLM calls to GBIF
/// calls: timeouts, transport errors, malformed JSON, and non-2xx statuses
/// are all retryable, and final failure degrades to a logged sentinel
/// rather than propagating an error.
pub struct GbifClient {
    config: GbifConfig,
    http: reqwest::Client,
    url_cache: Mutex<UrlCache>,
    persistent: Mutex<PersistentCache>,
}

impl GbifClient {
    pub fn new(config: GbifConfig, cache_dir: impl Into<Utf8PathBuf>) -> Self {
        let cache_dir = cache_dir.into();
        std::fs::create_dir_all(&cache_dir).ok();
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .unwrap_or_default();
        let persistent = PersistentCache::open(cache_dir.join("gbif_cache.json"), PERSISTENT_CACHE_TTL_DAYS);
        let url_cache = UrlCache::new(config.cache_size);
        Self {
            config,
            http,
            url_cache: Mutex::new(url_cache),
            persistent: Mutex::new(persistent),
        }
    }

    fn cache_key(url: &str, query: &[(&str, String)]) -> String {
        let mut sorted = query.to_vec();
        sorted.sort_by(|a, b| a.0.cmp(b.0));
        let joined = sorted
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        format!("{url}?{joined}")
    }

    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<serde_json::Value, GbifCallError> {
        let key = Self::cache_key(url, query);
        if let Some(cached) = self.url_cache.lock().expect("gbif url cache lock poisoned").get(&key) {
            return Ok(cached);
        }

        let policy = RetryPolicy::new(self.config.retry_attempts, self.config.backoff_factor);
        let value = dwc_retry::run(policy, url, |_attempt| async {
            match self.http.get(url).query(query).send().await {
                Ok(response) => {
                    if !response.status().is_success() {
                        return Outcome::Retryable(GbifCallError::BadStatus {
                            url: url.to_string(),
                            status: response.status().as_u16(),
                        });
                    }
                    match response.text().await {
                        Ok(text) => match serde_json::from_str::<serde_json::Value>(&text) {
                            Ok(value) => Outcome::Done(value),
                            Err(source) => Outcome::Retryable(GbifCallError::Malformed {
                                url: url.to_string(),
                                source,
                            }),
                        },
                        Err(source) => Outcome::Retryable(GbifCallError::Transport {
                            url: url.to_string(),
                            source,
                        }),
                    }
                }
                Err(source) => Outcome::Retryable(GbifCallError::Transport {
                    url: url.to_string(),
                    source,
                }),
            }
        })
        .await?;

        self.url_cache
            .lock()
            .expect("gbif url cache lock poisoned")
            .put(key, value.clone());
        Ok(value)
    }

    /// Taxonomy verification via `species/match` (§4.9).
    pub async fn verify_taxonomy(&self, input: &TaxonomyInput) -> Option<TaxonomyMatch> {
        let mut query = Vec::new();
        push(&mut query, "scientificName", &input.scientific_name);
        push(&mut query, "kingdom", &input.kingdom);
        push(&mut query, "phylum", &input.phylum);
        push(&mut query, "class", &input.class);
        push(&mut query, "order", &input.order);
        push(&mut query, "family", &input.family);
        push(&mut query, "genus", &input.genus);
        push(&mut query, "specificEpithet", &input.specific_epithet);

        if let Some(name) = &input.scientific_name {
            if let Some(cached) = self.persistent.lock().expect("gbif persistent cache lock poisoned").get(name) {
                if let Ok(parsed) = serde_json::from_value::<SpeciesMatchResponse>(cached) {
                    return build_taxonomy_match(parsed, &self.config);
                }
            }
        }

        let value = match self.get_json(&self.config.species_match_endpoint, &query).await {
            Ok(value) => value,
            Err(err) => {
                warn!(error = %err, "GBIF species/match failed after retries");
                return None;
            }
        };

        if let Some(name) = &input.scientific_name {
            let _ = self
                .persistent
                .lock()
                .expect("gbif persistent cache lock poisoned")
                .put(name, value.clone());
        }

        let parsed: SpeciesMatchResponse = match serde_json::from_value(value) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(error = %err, "GBIF species/match returned an unexpected shape");
                return None;
            }
        };

        build_taxonomy_match(parsed, &self.config)
    }

    /// Locality verification via `geocode/reverse` (§4.9).
    pub async fn verify_locality(&self, lat: f64, lon: f64) -> LocalityOutcome {
        if !(-90.0..=90.0).contains(&lat) {
            return LocalityOutcome::InvalidInput("invalid_latitude".to_string());
        }
        if !(-180.0..=180.0).contains(&lon) {
            return LocalityOutcome::InvalidInput("invalid_longitude".to_string());
        }

        let query = [("lat", lat.to_string()), ("lng", lon.to_string())];
        let value = match self.get_json(&self.config.geocode_endpoint, &query).await {
            Ok(value) => value,
            Err(err) => {
                warn!(error = %err, "GBIF geocode/reverse failed after retries");
                return LocalityOutcome::Unavailable;
            }
        };

        let entries: Vec<GeocodeReverseEntry> = match serde_json::from_value(value) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(error = %err, "GBIF geocode/reverse returned an unexpected shape");
                return LocalityOutcome::Unavailable;
            }
        };

        let Some(entry) = entries.into_iter().next() else {
            return LocalityOutcome::Unavailable;
        };

        LocalityOutcome::Verified(build_locality_verification(lat, lon, entry))
    }

    /// Free-text species suggestions via `species/suggest` (§4.9).
    pub async fn suggest_species(&self, query: &str) -> Option<Vec<SpeciesSuggestion>> {
        let params = [("q", query.to_string())];
        let value = match self.get_json(&self.config.species_suggest_endpoint, &params).await {
            Ok(value) => value,
            Err(err) => {
                warn!(error = %err, "GBIF species/suggest failed after retries");
                return None;
            }
        };
        let entries: Vec<SpeciesSuggestEntry> = match serde_json::from_value(value) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(error = %err, "GBIF species/suggest returned an unexpected shape");
                return None;
            }
        };
        Some(
            entries
                .into_iter()
                .map(|entry| SpeciesSuggestion {
                    key: entry.key,
                    scientific_name: entry.scientific_name,
                    rank: entry.rank,
                })
                .collect(),
        )
    }

    /// Optional occurrence validation via `occurrence/search`, within
    /// ±0.5° of the input coordinate, limit 20 (§4.9).
    pub async fn validate_occurrence(&self, lat: f64, lon: f64) -> Option<OccurrenceValidation> {
        if !self.config.enable_occurrence_validation {
            return None;
        }
        let params = [
            ("decimalLatitude", format!("{},{}", lat - 0.5, lat + 0.5)),
            ("decimalLongitude", format!("{},{}", lon - 0.5, lon + 0.5)),
            ("limit", "20".to_string()),
        ];
        let value = match self.get_json(&self.config.occurrence_search_endpoint, &params).await {
            Ok(value) => value,
            Err(err) => {
                warn!(error = %err, "GBIF occurrence/search failed after retries");
                return None;
            }
        };
        let parsed: OccurrenceSearchResponse = match serde_json::from_value(value) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(error = %err, "GBIF occurrence/search returned an unexpected shape");
                return None;
            }
        };
        let verified = !parsed.results.is_empty();
        let mut issues = Vec::new();
        if !verified {
            issues.push("no_similar_occurrences".to_string());
        }
        Some(OccurrenceValidation { verified, issues })
    }
}

fn build_locality_verification(lat: f64, lon: f64, entry: GeocodeReverseEntry) -> LocalityVerification {
    let returned_lat = entry.latitude.unwrap_or(lat);
    let returned_lon = entry.longitude.unwrap_or(lon);
    let distance = haversine_km(lat, lon, returned_lat, returned_lon);

    let mut issues = Vec::new();
    if distance > 10.0 {
        issues.push(format!("coordinate_discrepancy_{distance:.1}km"));
    }

    LocalityVerification {
        gbif_coordinate_valid: true,
        gbif_locality_verified: true,
        country: entry.country,
        state_province: entry.state_province,
        country_code: entry.country_code,
        decimal_latitude: returned_lat,
        decimal_longitude: returned_lon,
        distance_km: Some(distance),
        issues,
    }
}

fn push(query: &mut Vec<(&'static str, String)>, key: &'static str, value: &Option<String>) {
    if let Some(value) = value {
        query.push((key, value.clone()));
    }
}

fn build_taxonomy_match(parsed: SpeciesMatchResponse, config: &GbifConfig) -> Option<TaxonomyMatch> {
    let match_type = parsed.match_type.unwrap_or(MatchType::None);
    let confidence = parsed.confidence.unwrap_or(0.0);
    let confidence_ratio = confidence / 100.0;

    let rank_ok = matches!(match_type, MatchType::Exact | MatchType::Fuzzy | MatchType::Higherrank);
    let fuzzy_ok = match_type != MatchType::Fuzzy || config.enable_fuzzy_matching;
    let verified = rank_ok && confidence_ratio >= config.min_confidence_score && fuzzy_ok;

    if !verified {
        return None;
    }

    let mut issues = Vec::new();
    if match_type == MatchType::Fuzzy {
        issues.push("fuzzy_match".to_string());
    }
    if match_type == MatchType::Higherrank {
        issues.push("higher_rank_match".to_string());
    }
    if parsed.synonym == Some(true) {
        issues.push("synonym".to_string());
    }
    if confidence_ratio < config.min_confidence_score + LOW_CONFIDENCE_MARGIN {
        issues.push(format!("low_confidence:{confidence_ratio:.2}"));
    }

    Some(TaxonomyMatch {
        match_type,
        confidence,
        taxon_key: parsed.taxon_key,
        accepted_taxon_key: parsed.accepted_taxon_key,
        accepted_scientific_name: parsed.accepted_scientific_name,
        rank: parsed.rank,
        kingdom: parsed.kingdom,
        phylum: parsed.phylum,
        class: parsed.class,
        order: parsed.order,
        family: parsed.family,
        genus: parsed.genus,
        species: parsed.species,
        issues,
    })
}
