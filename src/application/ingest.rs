use crate::adapters::local::fs::{AssetStore, MASTER_PLAYLIST};
use crate::domain::fingerprint::fingerprint;
use crate::domain::jobs::TranscodeTask;
use crate::domain::poster::{poster_file_name, poster_timestamp};
use crate::domain::video::{NewVideoAsset, VideoStatus};
use crate::error::IngestError;
use crate::ports::media::{Encoder, MediaProbe};
use crate::ports::queue::JobQueuePort;
use crate::ports::repository::VideoRepository;
use regex::Regex;
use std::path::{Component, Path};
use std::sync::OnceLock;
use tempfile::TempPath;

/// An upload already written to the staging area. The staged file is deleted on
/// drop unless ingestion moves it into the asset tree.
#[derive(Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub size: u64,
    pub staged: TempPath,
}

/// Synchronous half of an upload: dedup, persist, probe, poster, row, enqueue.
pub struct IngestService<P, E, R, Q> {
    store: AssetStore,
    probe: P,
    encoder: E,
    repo: R,
    queue: Q,
}

impl<P, E, R, Q> IngestService<P, E, R, Q>
where
    P: MediaProbe,
    E: Encoder,
    R: VideoRepository,
    Q: JobQueuePort,
{
    pub fn new(store: AssetStore, probe: P, encoder: E, repo: R, queue: Q) -> Self {
        Self {
            store,
            probe,
            encoder,
            repo,
            queue,
        }
    }

    pub fn store(&self) -> &AssetStore {
        &self.store
    }

    /// A fingerprint is a duplicate only when a row exists AND its master
    /// playlist is on disk. Rows of failed or in-flight uploads do not block.
    pub async fn is_duplicate(&self, fingerprint: &str) -> Result<bool, IngestError> {
        if !self.repo.exists_by_fingerprint(fingerprint).await? {
            return Ok(false);
        }
        Ok(self.store.has_master_playlist(fingerprint).await)
    }

    /// Returns the id of the new `Processing` row. Transcoding happens later on
    /// the worker pool.
    #[tracing::instrument(skip(self, upload), fields(file_name = %upload.file_name, size = upload.size))]
    pub async fn upload(&self, upload: UploadedFile) -> Result<i64, IngestError> {
        if !file_name_is_valid(&upload.file_name) {
            return Err(IngestError::InvalidFileName(upload.file_name));
        }

        let fingerprint = fingerprint(&upload.file_name, upload.size);
        if self.is_duplicate(&fingerprint).await? {
            tracing::info!(%fingerprint, "duplicate upload rejected");
            return Err(IngestError::DuplicateAsset { fingerprint });
        }

        let asset_dir = self.store.asset_dir(&fingerprint);
        let source_path = self
            .store
            .persist_upload(&fingerprint, &upload.file_name, &upload.staged)
            .await?;
        tracing::debug!(path = %source_path.display(), "upload persisted");

        let duration = self.probe.probe_duration(&source_path).await?;
        let timestamp = poster_timestamp(duration);
        let poster = poster_file_name(timestamp);
        self.encoder
            .extract_frame(&source_path, timestamp, &asset_dir.join(&poster))
            .await
            .map_err(IngestError::Poster)?;

        let video_id = self
            .repo
            .create(NewVideoAsset {
                fingerprint: fingerprint.clone(),
                duration,
                poster: Some(poster),
                status: VideoStatus::Processing,
            })
            .await?;

        self.queue
            .enqueue_job(TranscodeTask {
                asset_dir,
                video_id,
                source_path,
                fingerprint: fingerprint.clone(),
            })
            .await?;

        tracing::info!(video_id, %fingerprint, duration, "upload accepted");
        Ok(video_id)
    }
}

/// Names the pipeline writes next to the upload: sub-playlists, segments and
/// posters.
fn generated_file_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d+\.m3u8|\d+_\d+\.ts|\d+\.\d+\.jpg)$").expect("valid pattern")
    })
}

/// A bare file name: one normal path component, and not a name the pipeline
/// writes itself.
fn file_name_is_valid(file_name: &str) -> bool {
    let mut components = Path::new(file_name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !file_name.contains('\\')
        && file_name != MASTER_PLAYLIST
        && !generated_file_pattern().is_match(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::local::channel::ChannelQueue;
    use crate::adapters::local::memory::InMemoryVideoRepository;
    use crate::error::{EncodeError, ProbeError};
    use crate::ports::media::{MockEncoder, MockMediaProbe};
    use mockall::predicate::{always, eq};
    use std::path::PathBuf;
    use std::process::ExitStatus;
    use std::os::unix::process::ExitStatusExt;
    use tempfile::{tempdir, NamedTempFile, TempDir};

    struct Fixture {
        temp_dir: TempDir,
        store: AssetStore,
        repo: InMemoryVideoRepository,
        queue: ChannelQueue,
    }

    fn fixture() -> Fixture {
        let temp_dir = tempdir().unwrap();
        let store = AssetStore::new(temp_dir.path(), "videos");
        std::fs::create_dir_all(store.staging_dir()).unwrap();
        Fixture {
            temp_dir,
            store,
            repo: InMemoryVideoRepository::new(),
            queue: ChannelQueue::bounded(4),
        }
    }

    fn stage(store: &AssetStore, file_name: &str, content: &[u8]) -> UploadedFile {
        let file = NamedTempFile::new_in(store.staging_dir()).unwrap();
        std::fs::write(file.path(), content).unwrap();
        UploadedFile {
            file_name: file_name.to_string(),
            size: content.len() as u64,
            staged: file.into_temp_path(),
        }
    }

    fn probe_with_duration(duration: f64) -> MockMediaProbe {
        let mut probe = MockMediaProbe::new();
        probe
            .expect_probe_duration()
            .returning(move |_| Ok(duration));
        probe
    }

    fn encoder_writing_frames() -> MockEncoder {
        let mut encoder = MockEncoder::new();
        encoder.expect_extract_frame().returning(|_, _, output| {
            std::fs::write(output, b"jpeg").unwrap();
            Ok(())
        });
        encoder
    }

    fn service(
        f: &Fixture,
        probe: MockMediaProbe,
        encoder: MockEncoder,
    ) -> IngestService<MockMediaProbe, MockEncoder, InMemoryVideoRepository, ChannelQueue> {
        IngestService::new(
            f.store.clone(),
            probe,
            encoder,
            f.repo.clone(),
            f.queue.clone(),
        )
    }

    #[tokio::test]
    async fn test_upload_persists_posters_and_enqueues() {
        let f = fixture();
        let upload = stage(&f.store, "holiday.mp4", b"0123456789");
        let fp = fingerprint("holiday.mp4", 10);
        let source = f.store.asset_dir(&fp).join("holiday.mp4");
        let poster = f.store.asset_dir(&fp).join("15.000000.jpg");

        let mut encoder = MockEncoder::new();
        encoder
            .expect_extract_frame()
            .with(eq(source.clone()), eq(15.0), eq(poster.clone()))
            .times(1)
            .returning(|_, _, output| {
                std::fs::write(output, b"jpeg").unwrap();
                Ok(())
            });

        let svc = service(&f, probe_with_duration(30.0), encoder);
        let id = svc.upload(upload).await.unwrap();

        let video = f.repo.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(video.fingerprint, fp);
        assert_eq!(video.status, VideoStatus::Processing);
        assert_eq!(video.duration, 30.0);
        assert_eq!(video.poster.as_deref(), Some("15.000000.jpg"));
        assert!(source.exists());
        assert!(poster.exists());

        let task = f.queue.dequeue_job().await.unwrap().unwrap();
        assert_eq!(task.video_id, id);
        assert_eq!(task.fingerprint, fp);
        assert_eq!(task.source_path, source);
        assert_eq!(task.asset_dir, f.store.asset_dir(&fp));
    }

    #[tokio::test]
    async fn test_long_video_poster_at_ten_percent() {
        let f = fixture();
        let upload = stage(&f.store, "long.mp4", b"abc");
        let mut encoder = MockEncoder::new();
        encoder
            .expect_extract_frame()
            .with(always(), eq(12.0), always())
            .returning(|_, _, output| {
                std::fs::write(output, b"jpeg").unwrap();
                Ok(())
            });

        let svc = service(&f, probe_with_duration(120.0), encoder);
        let id = svc.upload(upload).await.unwrap();
        let video = f.repo.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(video.poster.as_deref(), Some("12.000000.jpg"));
    }

    #[tokio::test]
    async fn test_duplicate_with_master_playlist_is_rejected() {
        let f = fixture();
        let fp = fingerprint("clip.mp4", 3);
        f.repo
            .create(NewVideoAsset {
                fingerprint: fp.clone(),
                duration: 10.0,
                poster: None,
                status: VideoStatus::Processed,
            })
            .await
            .unwrap();
        std::fs::create_dir_all(f.store.asset_dir(&fp)).unwrap();
        std::fs::write(f.store.master_playlist_path(&fp), "#EXTM3U\n").unwrap();

        let mut probe = MockMediaProbe::new();
        probe.expect_probe_duration().never();
        let svc = service(&f, probe, MockEncoder::new());

        let upload = stage(&f.store, "clip.mp4", b"abc");
        let staged: PathBuf = upload.staged.to_path_buf();
        let err = svc.upload(upload).await.unwrap_err();

        assert!(matches!(err, IngestError::DuplicateAsset { fingerprint } if fingerprint == fp));
        assert_eq!(f.repo.list(Default::default()).await.unwrap().len(), 1);
        assert!(!f.store.asset_dir(&fp).join("clip.mp4").exists());
        assert!(!staged.exists());
        assert!(f.queue.is_empty());
    }

    #[tokio::test]
    async fn test_row_without_playlist_is_not_a_duplicate() {
        let f = fixture();
        let fp = fingerprint("retry.mp4", 3);
        f.repo
            .create(NewVideoAsset {
                fingerprint: fp.clone(),
                duration: 10.0,
                poster: None,
                status: VideoStatus::Failed,
            })
            .await
            .unwrap();

        let svc = service(&f, probe_with_duration(10.0), encoder_writing_frames());
        assert!(!svc.is_duplicate(&fp).await.unwrap());
        svc.upload(stage(&f.store, "retry.mp4", b"abc")).await.unwrap();
        assert_eq!(f.queue.len(), 1);
    }

    #[tokio::test]
    async fn test_probe_failure_creates_no_row() {
        let f = fixture();
        let mut probe = MockMediaProbe::new();
        probe
            .expect_probe_duration()
            .returning(|path| Err(ProbeError::MissingDuration(path.to_path_buf())));
        let mut encoder = MockEncoder::new();
        encoder.expect_extract_frame().never();

        let svc = service(&f, probe, encoder);
        let err = svc
            .upload(stage(&f.store, "broken.mp4", b"xyz"))
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::Probe(_)));
        assert!(f.repo.list(Default::default()).await.unwrap().is_empty());
        assert!(f.queue.is_empty());
    }

    #[tokio::test]
    async fn test_poster_failure_creates_no_row() {
        let f = fixture();
        let mut encoder = MockEncoder::new();
        encoder.expect_extract_frame().returning(|_, _, _| {
            Err(EncodeError::Failed {
                step: "frame grab".to_string(),
                status: ExitStatus::from_raw(256),
                stderr: "no frame".to_string(),
            })
        });

        let svc = service(&f, probe_with_duration(8.0), encoder);
        let err = svc
            .upload(stage(&f.store, "short.mp4", b"xyz"))
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::Poster(_)));
        assert!(f.repo.list(Default::default()).await.unwrap().is_empty());
        assert!(f.queue.is_empty());
    }

    #[tokio::test]
    async fn test_unsafe_file_names_are_rejected() {
        let f = fixture();
        let svc = service(&f, MockMediaProbe::new(), MockEncoder::new());

        for name in ["../escape.mp4", "nested/clip.mp4", "/abs.mp4", "", "..", MASTER_PLAYLIST] {
            let err = svc.upload(stage(&f.store, name, b"x")).await.unwrap_err();
            assert!(matches!(err, IngestError::InvalidFileName(_)), "{name:?}");
        }
        assert!(!f.temp_dir.path().join("escape.mp4").exists());
        assert!(f.store.list_asset_dirs().await.unwrap().is_empty());
    }

    #[test]
    fn test_file_name_is_valid() {
        assert!(file_name_is_valid("clip.mp4"));
        assert!(file_name_is_valid("my holiday (1).mov"));
        assert!(!file_name_is_valid("a\\b.mp4"));
        assert!(!file_name_is_valid("./clip.mp4"));
    }

    #[test]
    fn test_generated_output_names_are_reserved() {
        for name in ["360.m3u8", "1080_000.ts", "720_12.ts", "15.000000.jpg", "2.5.jpg"] {
            assert!(!file_name_is_valid(name), "{name:?}");
        }
        for name in ["360.mp4", "clip_000.ts", "holiday.m3u8", "15.jpg", "h264.mp4"] {
            assert!(file_name_is_valid(name), "{name:?}");
        }
    }

    #[tokio::test]
    async fn test_upload_named_like_a_segment_is_rejected() {
        let f = fixture();
        let mut probe = MockMediaProbe::new();
        probe.expect_probe_duration().never();
        let svc = service(&f, probe, MockEncoder::new());

        let err = svc
            .upload(stage(&f.store, "360_000.ts", b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::InvalidFileName(name) if name == "360_000.ts"));
        assert!(f.store.list_asset_dirs().await.unwrap().is_empty());
    }
}
