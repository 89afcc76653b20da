//! Unified error types for canned.
//!
//! The display strings carry a stable code prefix so log lines can be grepped
//! by failure kind.

use std::io;
use std::path::PathBuf;

/// Unified error types for the canned server and tooling.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., a malformed base URL).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// The index document exists but could not be parsed.
    #[error("MALFORMED_INDEX: {}: {reason}", path.display())]
    MalformedIndex { path: PathBuf, reason: String },

    /// No captured response exists for the query.
    #[error("KEY_NOT_FOUND: {0}")]
    KeyNotFound(String),

    /// The live backend could not be reached or answered with an error.
    #[error("LIVE_FETCH_FAILED: {0}")]
    LiveFetchFailure(String),

    /// A stored response or the index could not be written.
    #[error("STORAGE_WRITE_FAILED: {}: {source}", path.display())]
    StorageWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A stored response could not be read.
    #[error("STORAGE_READ_FAILED: {}: {source}", path.display())]
    StorageRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Message used for the replay-mode miss payload.
    pub fn not_found_message(raw_query: &str) -> String {
        format!("Query string \"{raw_query}\" not found in index")
    }

    /// Whether the error means the requested entry simply does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::KeyNotFound(_) => true,
            Error::StorageRead { source, .. } => source.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
