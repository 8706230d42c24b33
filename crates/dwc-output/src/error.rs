use camino::Utf8PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to build zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("failed to write meta.xml: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("failed to (de)serialize JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to write file atomically: {0}")]
    AtomicWrite(#[from] dwc_fsutil::AtomicWriteError),
    #[error("version {0:?} does not match the required ^\\d+\\.\\d+\\.\\d+$ pattern")]
    InvalidVersion(String),
}
