//! `ffprobe`/`ffmpeg` subprocess adapter.

use crate::domain::av::{parse_duration, parse_streams, FromStream, VideoStream};
use crate::domain::ladder::Rendition;
use crate::error::{EncodeError, ProbeError};
use crate::ports::media::{Encoder, MediaProbe};
use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::process::Command;

#[derive(Debug, Clone)]
pub struct FfmpegCli {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl FfmpegCli {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    async fn run_ffprobe<I, S>(&self, args: I) -> Result<Output, ProbeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let tool = self.ffprobe.display().to_string();
        let output = Command::new(&self.ffprobe)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| ProbeError::Spawn {
                tool: tool.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::error!(tool = %tool, status = %output.status, stderr = %stderr, "probe failed");
            return Err(ProbeError::Failed {
                tool,
                status: output.status,
                stderr,
            });
        }
        Ok(output)
    }

    async fn run_ffmpeg(&self, step: &str, command: &mut Command) -> Result<(), EncodeError> {
        tracing::debug!(step, command = ?command.as_std(), "running encoder");
        let output = command
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| EncodeError::Spawn {
                tool: self.ffmpeg.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::error!(
                step,
                status = %output.status,
                stdout = %String::from_utf8_lossy(&output.stdout),
                stderr = %stderr,
                "encoder failed"
            );
            return Err(EncodeError::Failed {
                step: step.to_string(),
                status: output.status,
                stderr,
            });
        }
        Ok(())
    }

    fn ffmpeg(&self) -> Command {
        let mut command = Command::new(&self.ffmpeg);
        command.arg("-y").arg("-hide_banner").arg("-loglevel").arg("error");
        command
    }
}

fn ensure_output(step: &str, path: &Path) -> Result<(), EncodeError> {
    if path.exists() {
        Ok(())
    } else {
        Err(EncodeError::MissingOutput {
            step: step.to_string(),
            path: path.to_path_buf(),
        })
    }
}

#[async_trait]
impl MediaProbe for FfmpegCli {
    async fn probe_duration(&self, media_path: &Path) -> Result<f64, ProbeError> {
        let output = self
            .run_ffprobe([
                OsStr::new("-v"),
                OsStr::new("error"),
                OsStr::new("-show_entries"),
                OsStr::new("format=duration"),
                OsStr::new("-of"),
                OsStr::new("default=noprint_wrappers=1:nokey=1"),
                media_path.as_os_str(),
            ])
            .await?;

        parse_duration(&output.stdout)?
            .ok_or_else(|| ProbeError::MissingDuration(media_path.to_path_buf()))
    }

    async fn probe_video_stream(&self, media_path: &Path) -> Result<VideoStream, ProbeError> {
        let output = self
            .run_ffprobe([
                OsStr::new("-v"),
                OsStr::new("error"),
                OsStr::new("-select_streams"),
                OsStr::new("v:0"),
                OsStr::new("-show_entries"),
                OsStr::new("stream=codec_type,codec_name,width,height"),
                OsStr::new("-of"),
                OsStr::new("json"),
                media_path.as_os_str(),
            ])
            .await?;

        parse_streams(&output.stdout)?
            .iter()
            .find_map(VideoStream::from_stream)
            .ok_or_else(|| ProbeError::NoVideoStream(media_path.to_path_buf()))
    }
}

#[async_trait]
impl Encoder for FfmpegCli {
    async fn normalize_codec(&self, source: &Path, output: &Path) -> Result<(), EncodeError> {
        let mut command = self.ffmpeg();
        command
            .arg("-i")
            .arg(source)
            .args(["-c:v", "libx264", "-preset", "ultrafast", "-crf", "23"])
            .args(["-c:a", "aac", "-b:a", "128k"])
            .arg(output);
        self.run_ffmpeg("codec normalization", &mut command).await?;
        ensure_output("codec normalization", output)
    }

    async fn encode_rendition(
        &self,
        source: &Path,
        output_dir: &Path,
        rendition: &Rendition,
    ) -> Result<(), EncodeError> {
        let playlist = output_dir.join(rendition.playlist_name());
        let step = format!("rendition {}", rendition.resolution);

        let mut command = self.ffmpeg();
        command
            .arg("-i")
            .arg(source)
            // 8-bit output for player compatibility
            .args(["-pix_fmt", "yuv420p"])
            .args(["-profile:v", "main", "-level", "3.1", "-preset", "veryfast"])
            .arg("-vf")
            .arg(rendition.scale_filter())
            .args(["-start_number", "0"])
            .arg("-hls_time")
            .arg(rendition.segment_seconds.to_string())
            .args(["-hls_list_size", "0", "-f", "hls"])
            .arg("-hls_segment_filename")
            .arg(output_dir.join(rendition.segment_pattern()))
            .arg(&playlist);
        self.run_ffmpeg(&step, &mut command).await?;
        ensure_output(&step, &playlist)
    }

    async fn extract_frame(
        &self,
        source: &Path,
        timestamp: f64,
        output: &Path,
    ) -> Result<(), EncodeError> {
        let mut command = self.ffmpeg();
        command
            .arg("-i")
            .arg(source)
            .arg("-vf")
            .arg(format!("trim=start={:.2}", timestamp))
            .args(["-vframes", "1", "-f", "image2", "-vcodec", "mjpeg"])
            .arg(output);
        self.run_ffmpeg("frame grab", &mut command).await?;
        ensure_output("frame grab", output)
    }
}
