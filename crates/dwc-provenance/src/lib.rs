//! Append-only, chained provenance fragment log (§4.10). [`ProvenanceChain`]
//! tracks the `prev` pointer within one specimen's pipeline run;
//! [`ProvenanceLog`] appends the resulting fragments to `provenance.jsonl`.

mod chain;
mod error;
mod log;

pub use chain::ProvenanceChain;
pub use error::ProvenanceError;
pub use log::ProvenanceLog;
