use crush_core::CoreError;
use crush_store::PersistenceError;

/// Why a generation job ended in the `error` state.
///
/// The `Display` text becomes the job's progress line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Submission failed: {0}")]
    Submission(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Could not prepare photo: {0}")]
    Encode(String),

    #[error("Generation cancelled")]
    Cancelled,
}

/// Errors returned by [`UploadSession`](crate::session::UploadSession)
/// operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Select the required photos before generating")]
    NotReady,

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
