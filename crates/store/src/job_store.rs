//! Snapshot persistence for the single active generation job.
//!
//! The job is stored as a JSON envelope under [`JOB_KEY`]:
//!
//! ```json
//! {"version": 1, "checksum": "<sha256 of job>", "job": "<job json>"}
//! ```
//!
//! Anything that does not decode cleanly (missing, unparsable, unknown
//! version, checksum mismatch) loads as `None`.

use std::sync::Arc;

use crush_core::hashing::sha256_hex;
use crush_core::GenerationJob;
use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;
use crate::kv::KeyValueStore;

/// Well-known key holding the active job snapshot.
pub const JOB_KEY: &str = "crush.generation_job";

/// Current envelope format version.
const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEnvelope {
    version: u32,
    checksum: String,
    job: String,
}

/// Reads and writes the active [`GenerationJob`] snapshot.
#[derive(Clone)]
pub struct JobStore {
    kv: Arc<dyn KeyValueStore>,
}

impl JobStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Overwrite the stored snapshot with `job`.
    pub fn save(&self, job: &GenerationJob) -> Result<(), PersistenceError> {
        let job_json = serde_json::to_string(job)?;
        let envelope = SnapshotEnvelope {
            version: SNAPSHOT_VERSION,
            checksum: sha256_hex(job_json.as_bytes()),
            job: job_json,
        };
        self.kv.set(JOB_KEY, &serde_json::to_string(&envelope)?)?;

        tracing::trace!(job_id = %job.id, status = ?job.status, "Job snapshot saved");
        Ok(())
    }

    /// Load the stored snapshot. Absent or corrupt data yields `None`.
    pub fn load(&self) -> Option<GenerationJob> {
        let raw = match self.kv.get(JOB_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read job snapshot");
                return None;
            }
        };

        match decode_snapshot(&raw) {
            Ok(job) => Some(job),
            Err(reason) => {
                tracing::warn!(reason = %reason, "Ignoring corrupt job snapshot");
                None
            }
        }
    }

    /// Remove the stored snapshot.
    pub fn clear(&self) -> Result<(), PersistenceError> {
        self.kv.remove(JOB_KEY)
    }
}

fn decode_snapshot(raw: &str) -> Result<GenerationJob, String> {
    let envelope: SnapshotEnvelope =
        serde_json::from_str(raw).map_err(|e| format!("envelope: {e}"))?;
    if envelope.version != SNAPSHOT_VERSION {
        return Err(format!("unsupported version {}", envelope.version));
    }
    if sha256_hex(envelope.job.as_bytes()) != envelope.checksum {
        return Err("checksum mismatch".into());
    }
    serde_json::from_str(&envelope.job).map_err(|e| format!("job: {e}"))
}
