/// Errors from the local persistence layer.
///
/// Callers treat these as best-effort failures: a failed write is logged,
/// a failed read means "no saved job".
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Reading or writing the backing storage failed.
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The snapshot could not be serialized.
    #[error("Snapshot serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The key contains characters the backend cannot store.
    #[error("Invalid storage key '{0}'")]
    InvalidKey(String),

    /// Backend-specific failure (e.g. a poisoned lock).
    #[error("Storage backend error: {0}")]
    Backend(String),
}
