//! Atomic filesystem writes and content-addressed sharded paths shared
//! across the caches and output writers.

pub mod atomic_write;
pub mod shard;

pub use atomic_write::{append_line, write_file_atomic, AtomicWriteError};
pub use shard::shard_path;
