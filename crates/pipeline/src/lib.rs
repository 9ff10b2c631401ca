//! Generation job lifecycle and the upload session built on it.

pub mod error;
pub mod generator;
pub mod session;

pub use error::{GenerationError, SessionError};
pub use generator::{Generator, JobHandle, Resumed};
pub use session::{SessionConfig, SessionState, UploadSession};
