use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupted cache file {path}: {reason}")]
    CorruptedFile { path: PathBuf, reason: String },
}

pub type Result<T> = std::result::Result<T, CacheError>;
