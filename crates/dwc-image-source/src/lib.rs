//! Polymorphic image sources (§4.4): `Local`/`S3`/`HTTP`/`Multi` variants
//! behind one `ImageSource` trait, a TTL- and size-bounded JIT cache, and a
//! `CachedSource` wrapper that ties a source, the cache, and an identity
//! registry together into a single `get(sha)` call.

mod cached;
mod error;
mod factory;
mod http;
mod jit_cache;
mod local;
mod multi;
mod registry;
mod s3;
mod source_trait;
mod warmup;

pub use cached::CachedSource;
pub use error::ImageSourceError;
pub use factory::build_source;
pub use http::HttpSource;
pub use jit_cache::JitCache;
pub use local::LocalSource;
pub use multi::MultiSource;
pub use registry::{NullRegistry, SourceRegistry};
pub use s3::S3Source;
pub use source_trait::ImageSource;
pub use warmup::{warmup, WarmupResult};
