use camino::Utf8PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageSourceError {
    #[error("no image with sha256 {0} found in this source")]
    NotFound(String),
    #[error("io error at {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("download transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("download failed with status {status} for {url}")]
    BadStatus { status: u16, url: String },
    #[error("unknown image source kind {0:?}")]
    UnknownKind(String),
    #[error("multi source has no configured members")]
    EmptyMulti,
    #[error(transparent)]
    AtomicWrite(#[from] dwc_fsutil::AtomicWriteError),
    #[error("corrupt cache metadata at {path}: {source}")]
    CorruptMetadata {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("out-of-process object store client failed: {0}")]
    ObjectStoreClient(String),
}
