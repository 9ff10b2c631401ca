//! Local key-value persistence for the in-flight generation job.
//!
//! - [`KeyValueStore`]: minimal string store (file-backed or in-memory).
//! - [`JobStore`]: checksummed snapshot of the single active
//!   [`GenerationJob`](crush_core::GenerationJob) under a well-known key.

pub mod error;
pub mod job_store;
pub mod kv;

pub use error::PersistenceError;
pub use job_store::{JobStore, JOB_KEY};
pub use kv::{FileStore, KeyValueStore, MemoryStore};
