use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by the KV layer and the script store.
///
/// A missing script is not an error for get/update/delete/run; those are
/// silent no-ops. Only operations that must produce output (export) report it.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The storage directory could not be created.
    #[error("open store at {}: {source}", path.display())]
    Open {
        /// Directory that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// A persisted blob did not parse.
    #[error("corrupt snapshot at key {key}: {source}")]
    Corrupt {
        /// Key of the blob.
        key: String,
        /// Parse error.
        #[source]
        source: serde_json::Error,
    },
    /// A value could not be serialized.
    #[error("encode value: {0}")]
    Encode(#[source] serde_json::Error),
    /// Writing a blob failed (disk full, permissions, ...).
    #[error("write key {key}: {source}")]
    Write {
        /// Key of the blob.
        key: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// No script with this id.
    #[error("script {0} not found")]
    NotFound(String),
}
