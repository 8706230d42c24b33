use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("unknown schema {0:?}")]
    UnknownSchema(String),
    #[error("failed to fetch schema {name} from {url}: {source}")]
    Fetch {
        name: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("schema {name} returned status {status}")]
    BadStatus { name: String, status: u16 },
    #[error("failed to parse schema XML for {name}: {source}")]
    Xml {
        name: String,
        #[source]
        source: quick_xml::Error,
    },
    #[error(transparent)]
    AtomicWrite(#[from] dwc_fsutil::AtomicWriteError),
}
