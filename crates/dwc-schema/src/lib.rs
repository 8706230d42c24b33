mod error;
mod manager;
mod model;
mod similarity;
mod xml_parse;

pub use error::SchemaError;
pub use manager::SchemaManager;
pub use model::{
    CacheMetadata, CompatibilityReport, MappingSuggestion, ParsedSchema, SchemaMetadataEntry,
    SchemaSource,
};
pub use similarity::similarity_ratio;
pub use xml_parse::parse_schema_xml;
