use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lifecycle of a video. `Processing` is set at ingestion, the transcode engine
/// moves it to `Processed` or `Failed` exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    Processing,
    Processed,
    Failed,
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VideoStatus::Processing => "processing",
            VideoStatus::Processed => "processed",
            VideoStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A video row as stored by the repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoAsset {
    pub id: i64,
    pub public_id: Uuid,
    /// Directory name under the storage root and dedup key
    pub fingerprint: String,
    /// Container duration in seconds
    pub duration: f64,
    /// Poster file name inside the fingerprint directory
    pub poster: Option<String>,
    pub status: VideoStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Values supplied by the ingestion service when creating a row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewVideoAsset {
    pub fingerprint: String,
    pub duration: f64,
    pub poster: Option<String>,
    pub status: VideoStatus,
}

/// Listing filter. An empty filter matches every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoFilter {
    pub status: Option<VideoStatus>,
    pub fingerprint: Option<String>,
}

impl VideoFilter {
    pub fn matches(&self, video: &VideoAsset) -> bool {
        self.status.map_or(true, |s| s == video.status)
            && self
                .fingerprint
                .as_deref()
                .map_or(true, |fp| fp == video.fingerprint)
    }
}
