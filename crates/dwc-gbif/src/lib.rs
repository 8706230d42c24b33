mod client;
mod error;
mod haversine;
mod model;
mod persistent_cache;
mod url_cache;

pub use client::GbifClient;
pub use error::GbifError;
pub use haversine::haversine_km;
pub use model::{
    LocalityOutcome, LocalityVerification, MatchType, OccurrenceValidation, SpeciesSuggestion,
    TaxonomyInput, TaxonomyMatch,
};
