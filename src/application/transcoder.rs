use crate::adapters::local::fs::{remove_dir_if_exists, MASTER_PLAYLIST};
use crate::domain::hls::{MasterPlaylist, VariantStream};
use crate::domain::jobs::TranscodeTask;
use crate::domain::ladder::{Rendition, ResolutionLadder};
use crate::domain::video::VideoStatus;
use crate::error::TranscodeError;
use crate::ports::media::{Encoder, MediaProbe};
use crate::ports::repository::VideoRepository;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// File name of the baseline-codec copy made from high-efficiency uploads.
const NORMALIZED_SOURCE: &str = "h264.mp4";

#[derive(Debug, Clone)]
pub struct TranscodeSettings {
    pub ladder: ResolutionLadder,
    pub segment_seconds: u32,
}

/// Something the worker pool can hand a task to.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(&self, task: &TranscodeTask) -> Result<(), TranscodeError>;
}

/// Turns a persisted upload into an HLS ladder plus master playlist and records
/// the outcome. Every failure marks the video `Failed` and removes its directory.
pub struct TranscodeService<P, E, R> {
    probe: P,
    encoder: E,
    repo: R,
    settings: TranscodeSettings,
}

impl<P, E, R> TranscodeService<P, E, R>
where
    P: MediaProbe,
    E: Encoder,
    R: VideoRepository,
{
    pub fn new(probe: P, encoder: E, repo: R, settings: TranscodeSettings) -> Self {
        Self {
            probe,
            encoder,
            repo,
            settings,
        }
    }

    async fn run(&self, task: &TranscodeTask) -> Result<(), TranscodeError> {
        let stream = self.probe.probe_video_stream(&task.source_path).await?;
        let orientation = stream.orientation();
        tracing::info!(
            codec = %stream.codec,
            width = stream.width,
            height = stream.height,
            ?orientation,
            "probed source"
        );

        let mut source = task.source_path.clone();
        if stream.needs_codec_normalization() {
            let normalized = normalized_path(&task.asset_dir, &source);
            tracing::info!(codec = %stream.codec, "re-encoding to baseline codec");
            self.encoder.normalize_codec(&source, &normalized).await?;
            tokio::fs::remove_file(&source).await?;
            source = normalized;
        }

        let resolutions = self.settings.ladder.ascending();
        for &resolution in &resolutions {
            let rendition = Rendition {
                resolution,
                orientation,
                segment_seconds: self.settings.segment_seconds,
            };
            tracing::info!(resolution, scale = %rendition.scale_filter(), "encoding rendition");
            self.encoder
                .encode_rendition(&source, &task.asset_dir, &rendition)
                .await?;
            tracing::info!(resolution, "rendition done");
        }

        tokio::spawn(async move {
            if let Err(e) = tokio::fs::remove_file(&source).await {
                tracing::warn!(path = %source.display(), error = %e, "failed to remove transcoded source");
            }
        });

        let variants = resolutions
            .iter()
            .map(|&r| VariantStream::for_rendition(&task.fingerprint, r, orientation))
            .collect();
        MasterPlaylist::new(variants)
            .write_to(&task.asset_dir.join(MASTER_PLAYLIST))
            .await?;

        self.repo
            .update_status(task.video_id, VideoStatus::Processed)
            .await?;
        Ok(())
    }

    /// Best effort: neither step is retried if it fails.
    async fn mark_failed(&self, task: &TranscodeTask) {
        if let Err(e) = self
            .repo
            .update_status(task.video_id, VideoStatus::Failed)
            .await
        {
            tracing::error!(error = %e, "failed to update video status to failed");
        }

        if let Err(e) = remove_dir_if_exists(&task.asset_dir).await {
            tracing::error!(
                path = %task.asset_dir.display(),
                error = %e,
                "failed to remove video directory"
            );
        }
    }
}

#[async_trait]
impl<P, E, R> Transcoder for TranscodeService<P, E, R>
where
    P: MediaProbe,
    E: Encoder,
    R: VideoRepository,
{
    #[tracing::instrument(skip(self, task), fields(video_id = task.video_id, fingerprint = %task.fingerprint))]
    async fn transcode(&self, task: &TranscodeTask) -> Result<(), TranscodeError> {
        match self.run(task).await {
            Ok(()) => {
                tracing::info!("video processed");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "transcode failed");
                self.mark_failed(task).await;
                Err(e)
            }
        }
    }
}

fn normalized_path(asset_dir: &Path, source: &Path) -> PathBuf {
    let candidate = asset_dir.join(NORMALIZED_SOURCE);
    if candidate == source {
        asset_dir.join(format!("normalized.{}", NORMALIZED_SOURCE))
    } else {
        candidate
    }
}
