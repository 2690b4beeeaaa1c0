use crate::domain::av::VideoStream;
use crate::domain::ladder::Rendition;
use crate::error::{EncodeError, ProbeError};
use async_trait::async_trait;
use std::path::Path;

/// External media probe.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaProbe: Send + Sync {
    /// Container duration in seconds.
    async fn probe_duration(&self, media_path: &Path) -> Result<f64, ProbeError>;

    /// Codec and pixel dimensions of the first video stream.
    async fn probe_video_stream(&self, media_path: &Path) -> Result<VideoStream, ProbeError>;
}

/// External encoder.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Re-encode `source` to the baseline codec at `output`.
    async fn normalize_codec(&self, source: &Path, output: &Path) -> Result<(), EncodeError>;

    /// Write `<resolution>.m3u8` and its `<resolution>_NNN.ts` segments into `output_dir`.
    async fn encode_rendition(
        &self,
        source: &Path,
        output_dir: &Path,
        rendition: &Rendition,
    ) -> Result<(), EncodeError>;

    /// Grab a single still frame `timestamp` seconds into `source`.
    async fn extract_frame(
        &self,
        source: &Path,
        timestamp: f64,
        output: &Path,
    ) -> Result<(), EncodeError>;
}
