//! Domain types and pure logic for the photo-to-video flow.
//!
//! - [`slot`] / [`ingest`]: user-selected photos per upload mode.
//! - [`compositor`]: side-by-side stitching of two solo photos.
//! - [`job`]: the generation job record and its lifecycle.

pub mod compositor;
pub mod error;
pub mod hashing;
pub mod ingest;
pub mod job;
pub mod mode;
pub mod prompt;
pub mod slot;
pub mod types;

pub use compositor::CompositeImage;
pub use error::CoreError;
pub use ingest::MediaIngest;
pub use job::{GenerationJob, JobStatus, SourceImages, UploadPayload};
pub use mode::{SlotRole, UploadMode};
pub use slot::ImageSlot;
