use thiserror::Error;

/// Internal retry-classification error for a single GBIF HTTP call.
/// Never escapes the client: every public verification method collapses
/// this into a sentinel `None` plus a `tracing::warn!` on final failure
/// (§4.9).
#[derive(Debug, Error)]
pub(crate) enum GbifCallError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned status {status}")]
    BadStatus { url: String, status: u16 },
    #[error("malformed JSON from {url}: {source}")]
    Malformed {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum GbifError {
    #[error(transparent)]
    AtomicWrite(#[from] dwc_fsutil::AtomicWriteError),
    #[error("failed to serialize persistent GBIF cache: {0}")]
    Serialize(#[from] serde_json::Error),
}
