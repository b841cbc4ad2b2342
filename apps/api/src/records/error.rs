use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the record store.
///
/// Validation failures reject a whole batch without touching the store.
/// `NotFound` rejects a single update item. `Persistence` means the
/// in-memory store changed but the backing file was not written.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("No record with index {index}")]
    NotFound { index: usize },

    #[error("Record store I/O error at {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Record store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
