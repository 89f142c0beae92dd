//! Modification-time cache for incremental formatting
//!
//! The cache remembers, per source path, the instant its last successful
//! format finished. Comparing that instant against the modification times of
//! the source and everything it depends on decides whether the file has to be
//! formatted again.

mod error;
mod invalidation;
mod mtime;
mod store;

pub use error::{CacheError, Result};
pub use invalidation::{Staleness, StalenessEvaluator};
pub use mtime::{modified_secs, now_secs, to_epoch_secs};
pub use store::{CacheStore, Timestamp};

/// Default cache directory name, relative to the project root
pub const CACHE_DIR_NAME: &str = ".cache";

/// Cache file name inside the cache directory
pub const CACHE_FILE_NAME: &str = "format.json";
