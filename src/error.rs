//! Error types shared by the ingestion and transcode pipeline.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

/// Failure of the external media probe.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    #[error("{tool} exited with {status}: {stderr}")]
    Failed {
        tool: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("unusable probe output: {0}")]
    Parse(String),

    #[error("no video stream in {0}")]
    NoVideoStream(PathBuf),

    #[error("probe reported no duration for {0}")]
    MissingDuration(PathBuf),
}

/// Failure of the external encoder (codec normalization, rendition or frame grab).
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    #[error("{step} failed with {status}: {stderr}")]
    Failed {
        step: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("{step} produced no output at {path}")]
    MissingOutput { step: String, path: PathBuf },
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("video {0} not found")]
    NotFound(i64),

    #[error("repository backend error: {0}")]
    Backend(String),

    #[error("failed to (de)serialize video row: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("transcode queue is closed")]
    Closed,
}

/// Synchronous-phase failures of an upload. None of them leave a repository row behind.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("a playable video with fingerprint {fingerprint} already exists")]
    DuplicateAsset { fingerprint: String },

    #[error("invalid upload file name: {0:?}")]
    InvalidFileName(String),

    #[error("storage error: {0}")]
    Storage(#[from] io::Error),

    #[error("probe error: {0}")]
    Probe(#[from] ProbeError),

    #[error("poster error: {0}")]
    Poster(#[source] EncodeError),

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("queue error: {0}")]
    Queue(#[from] QueueError),
}

/// Asynchronous-phase failures. Any of them turns the asset into `Failed`.
#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    #[error("probe error: {0}")]
    Probe(#[from] ProbeError),

    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("storage error: {0}")]
    Storage(#[from] io::Error),

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, thiserror::Error)]
pub enum PosterError {
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("storage error: {0}")]
    Storage(#[from] io::Error),

    #[error("invalid playlist {path}: {reason}")]
    Playlist { path: PathBuf, reason: String },

    #[error("no segment in {path} covers {timestamp}s")]
    SegmentNotFound { path: PathBuf, timestamp: f64 },

    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("{failed} of {total} posters could not be created")]
    Backfill { failed: usize, total: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("video not found")]
    NotFound,

    #[error("invalid stream path: {0:?}")]
    InvalidPath(String),

    #[error("storage error: {0}")]
    Storage(#[from] io::Error),

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid resolution {0:?} in ladder")]
    InvalidResolution(String),

    #[error("resolution ladder is empty")]
    EmptyLadder,

    #[error("invalid value {value:?} for {key}")]
    InvalidNumber { key: &'static str, value: String },
}
