use crate::adapters::local::fs::{remove_dir_if_exists, AssetStore, MASTER_PLAYLIST};
use crate::domain::fingerprint::is_fingerprint;
use crate::domain::video::{VideoAsset, VideoFilter, VideoStatus};
use crate::error::PlaybackError;
use crate::ports::repository::VideoRepository;
use bytes::Bytes;
use regex::Regex;
use std::collections::HashSet;
use std::io;
use std::path::PathBuf;
use std::sync::OnceLock;
use uuid::Uuid;

pub const PLAYLIST_CONTENT_TYPE: &str = "application/x-mpegURL";
pub const SEGMENT_CONTENT_TYPE: &str = "video/mp2ts";

fn stream_file_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_]+\.(m3u8|ts)$").expect("valid pattern"))
}

/// A playlist or segment read from a fingerprint directory.
#[derive(Debug, Clone)]
pub struct StreamFile {
    pub content_type: &'static str,
    pub bytes: Bytes,
}

/// Outcome of an orphan sweep, as fingerprint directory names.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub removed: Vec<String>,
    pub retained: Vec<String>,
}

pub struct PlaybackService<R> {
    store: AssetStore,
    repo: R,
}

impl<R> PlaybackService<R>
where
    R: VideoRepository,
{
    pub fn new(store: AssetStore, repo: R) -> Self {
        Self { store, repo }
    }

    async fn processed(&self, public_id: Uuid) -> Result<VideoAsset, PlaybackError> {
        match self.repo.get_by_public_id(public_id).await? {
            Some(video) if video.status == VideoStatus::Processed => Ok(video),
            _ => Err(PlaybackError::NotFound),
        }
    }

    /// Master playlist of a processed video. Variant URIs are relative to the
    /// master URL, as `<fingerprint>/<resolution>.m3u8`.
    pub async fn master_playlist(&self, public_id: Uuid) -> Result<Bytes, PlaybackError> {
        let video = self.processed(public_id).await?;
        self.store
            .read_asset_file(&video.fingerprint, MASTER_PLAYLIST)
            .await
            .map_err(not_found_or_storage)
    }

    /// Serves `<fingerprint>/<file>` where file is a sub-playlist or segment.
    pub async fn rendition_file(&self, path: &str) -> Result<StreamFile, PlaybackError> {
        let (fingerprint, file_name) = path
            .trim_start_matches('/')
            .split_once('/')
            .ok_or_else(|| PlaybackError::InvalidPath(path.to_string()))?;

        let captures = stream_file_pattern()
            .captures(file_name)
            .filter(|_| is_fingerprint(fingerprint))
            .ok_or_else(|| PlaybackError::InvalidPath(path.to_string()))?;
        let content_type = match &captures[1] {
            "m3u8" => PLAYLIST_CONTENT_TYPE,
            _ => SEGMENT_CONTENT_TYPE,
        };

        let bytes = self
            .store
            .read_asset_file(fingerprint, file_name)
            .await
            .map_err(not_found_or_storage)?;
        Ok(StreamFile {
            content_type,
            bytes,
        })
    }

    /// Any status: the poster grabbed at upload exists before transcoding ends.
    pub async fn poster_path(&self, public_id: Uuid) -> Result<PathBuf, PlaybackError> {
        let video = self
            .repo
            .get_by_public_id(public_id)
            .await?
            .ok_or(PlaybackError::NotFound)?;
        let poster = video.poster.ok_or(PlaybackError::NotFound)?;
        Ok(self.store.asset_dir(&video.fingerprint).join(poster))
    }

    /// Removes fingerprint directories no repository row refers to. Rows in any
    /// status keep their directory.
    #[tracing::instrument(skip(self))]
    pub async fn prune_orphans(&self) -> Result<PruneReport, PlaybackError> {
        let known: HashSet<String> = self
            .repo
            .list(VideoFilter::default())
            .await?
            .into_iter()
            .map(|video| video.fingerprint)
            .collect();

        let mut report = PruneReport::default();
        for dir in self.store.list_asset_dirs().await? {
            if known.contains(&dir) {
                report.retained.push(dir);
                continue;
            }
            match remove_dir_if_exists(&self.store.asset_dir(&dir)).await {
                Ok(()) => {
                    tracing::info!(fingerprint = %dir, "removed orphan directory");
                    report.removed.push(dir);
                }
                Err(e) => {
                    tracing::error!(fingerprint = %dir, error = %e, "failed to remove orphan directory");
                    report.retained.push(dir);
                }
            }
        }

        tracing::info!(
            removed = report.removed.len(),
            retained = report.retained.len(),
            "orphan sweep done"
        );
        Ok(report)
    }
}

fn not_found_or_storage(e: io::Error) -> PlaybackError {
    if e.kind() == io::ErrorKind::NotFound {
        PlaybackError::NotFound
    } else {
        PlaybackError::Storage(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::local::memory::InMemoryVideoRepository;
    use crate::domain::fingerprint::fingerprint;
    use crate::domain::video::NewVideoAsset;
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        _temp_dir: TempDir,
        store: AssetStore,
        repo: InMemoryVideoRepository,
    }

    fn fixture() -> Fixture {
        let temp_dir = tempdir().unwrap();
        let store = AssetStore::new(temp_dir.path(), "videos");
        Fixture {
            _temp_dir: temp_dir,
            store,
            repo: InMemoryVideoRepository::new(),
        }
    }

    async fn add_video(f: &Fixture, fp: &str, status: VideoStatus) -> Uuid {
        let id = f
            .repo
            .create(NewVideoAsset {
                fingerprint: fp.to_string(),
                duration: 20.0,
                poster: Some("10.000000.jpg".to_string()),
                status,
            })
            .await
            .unwrap();
        let dir = f.store.asset_dir(fp);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(MASTER_PLAYLIST), "#EXTM3U\n#EXT-X-VERSION:3\n").unwrap();
        std::fs::write(dir.join("360.m3u8"), "#EXTM3U\n").unwrap();
        std::fs::write(dir.join("360_000.ts"), b"ts").unwrap();
        f.repo.get_by_id(id).await.unwrap().unwrap().public_id
    }

    #[tokio::test]
    async fn test_master_playlist_requires_processed() {
        let f = fixture();
        let service = PlaybackService::new(f.store.clone(), f.repo.clone());
        let ready = add_video(&f, &fingerprint("a.mp4", 1), VideoStatus::Processed).await;
        let pending = add_video(&f, &fingerprint("b.mp4", 1), VideoStatus::Processing).await;
        let failed = add_video(&f, &fingerprint("c.mp4", 1), VideoStatus::Failed).await;

        let bytes = service.master_playlist(ready).await.unwrap();
        assert!(bytes.starts_with(b"#EXTM3U"));

        for id in [pending, failed, Uuid::new_v4()] {
            assert!(matches!(
                service.master_playlist(id).await,
                Err(PlaybackError::NotFound)
            ));
        }
    }

    #[tokio::test]
    async fn test_rendition_file_content_types() {
        let f = fixture();
        let fp = fingerprint("a.mp4", 1);
        add_video(&f, &fp, VideoStatus::Processed).await;
        let service = PlaybackService::new(f.store.clone(), f.repo.clone());

        let playlist = service
            .rendition_file(&format!("{}/360.m3u8", fp))
            .await
            .unwrap();
        assert_eq!(playlist.content_type, PLAYLIST_CONTENT_TYPE);

        let segment = service
            .rendition_file(&format!("/{}/360_000.ts", fp))
            .await
            .unwrap();
        assert_eq!(segment.content_type, SEGMENT_CONTENT_TYPE);
        assert_eq!(&segment.bytes[..], b"ts");

        assert!(matches!(
            service.rendition_file(&format!("{}/720.m3u8", fp)).await,
            Err(PlaybackError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_rendition_file_rejects_traversal() {
        let f = fixture();
        let service = PlaybackService::new(f.store.clone(), f.repo.clone());
        let fp = fingerprint("a.mp4", 1);

        for path in [
            "../../etc/passwd".to_string(),
            format!("{}/../other/360.m3u8", fp),
            format!("{}/poster.jpg", fp),
            format!("{}/360.m3u8.bak", fp),
            "notafingerprint/360.m3u8".to_string(),
            fp.clone(),
        ] {
            assert!(
                matches!(
                    service.rendition_file(&path).await,
                    Err(PlaybackError::InvalidPath(_))
                ),
                "{path}"
            );
        }
    }

    #[tokio::test]
    async fn test_poster_path() {
        let f = fixture();
        let fp = fingerprint("a.mp4", 1);
        let id = add_video(&f, &fp, VideoStatus::Processed).await;
        let service = PlaybackService::new(f.store.clone(), f.repo.clone());

        assert_eq!(
            service.poster_path(id).await.unwrap(),
            f.store.asset_dir(&fp).join("10.000000.jpg")
        );
        let pending = add_video(&f, &fingerprint("b.mp4", 1), VideoStatus::Processing).await;
        assert_eq!(
            service.poster_path(pending).await.unwrap(),
            f.store
                .asset_dir(&fingerprint("b.mp4", 1))
                .join("10.000000.jpg")
        );
        assert!(matches!(
            service.poster_path(Uuid::new_v4()).await,
            Err(PlaybackError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_prune_removes_only_unreferenced_directories() {
        let f = fixture();
        let kept = fingerprint("kept.mp4", 1);
        let failed = fingerprint("failed.mp4", 1);
        add_video(&f, &kept, VideoStatus::Processed).await;
        add_video(&f, &failed, VideoStatus::Failed).await;
        std::fs::create_dir_all(f.store.asset_dir("orphan")).unwrap();
        std::fs::write(f.store.asset_dir("orphan").join("360_000.ts"), b"x").unwrap();
        std::fs::create_dir_all(f.store.staging_dir()).unwrap();

        let service = PlaybackService::new(f.store.clone(), f.repo.clone());
        let report = service.prune_orphans().await.unwrap();

        assert_eq!(report.removed, vec!["orphan".to_string()]);
        assert_eq!(report.retained.len(), 2);
        assert!(!f.store.asset_dir("orphan").exists());
        assert!(f.store.asset_dir(&kept).exists());
        assert!(f.store.asset_dir(&failed).exists());
        assert!(f.store.staging_dir().exists());
    }
}
