use thiserror::Error;

/// Failures writing to (or administering) the cache.
///
/// None of these are fatal to a load: the loader logs them and keeps
/// serving whatever it has.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to encode cache entry for {key}: {source}")]
    Encoding {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Storage quota exceeded: {needed} bytes needed, {available} available")]
    QuotaExceeded { needed: usize, available: usize },

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl CacheError {
    /// True when the backend itself failed, as opposed to the value being unencodable.
    pub fn is_storage(&self) -> bool {
        !matches!(self, CacheError::Encoding { .. })
    }
}
