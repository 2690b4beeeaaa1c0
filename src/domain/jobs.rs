use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Work item handed from ingestion to the worker pool. Lives only in memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscodeTask {
    /// Fingerprint directory holding the upload and all generated output
    pub asset_dir: PathBuf,
    /// Repository id of the video being transcoded
    pub video_id: i64,
    /// Persisted upload inside `asset_dir`
    pub source_path: PathBuf,
    /// Public segment-directory name
    pub fingerprint: String,
}
