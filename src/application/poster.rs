use crate::adapters::local::fs::AssetStore;
use crate::domain::hls::MediaPlaylist;
use crate::domain::ladder::ResolutionLadder;
use crate::domain::poster::{poster_file_name, poster_timestamp};
use crate::domain::video::VideoAsset;
use crate::error::PosterError;
use crate::ports::media::Encoder;
use crate::ports::repository::VideoRepository;

/// Creates posters for processed videos that have none, grabbing the frame from
/// the highest rendition's segments since the original upload is gone by then.
pub struct PosterService<E, R> {
    store: AssetStore,
    encoder: E,
    repo: R,
    ladder: ResolutionLadder,
}

impl<E, R> PosterService<E, R>
where
    E: Encoder,
    R: VideoRepository,
{
    pub fn new(store: AssetStore, encoder: E, repo: R, ladder: ResolutionLadder) -> Self {
        Self {
            store,
            encoder,
            repo,
            ladder,
        }
    }

    /// Returns how many posters were created. A failing video does not stop the
    /// run; the error at the end counts them.
    #[tracing::instrument(skip(self))]
    pub async fn backfill_posters(&self) -> Result<usize, PosterError> {
        let videos = self.repo.list_processed_without_poster().await?;
        let total = videos.len();
        tracing::info!(total, "backfilling posters");

        let mut failed = 0;
        for video in &videos {
            match self.backfill_one(video).await {
                Ok(poster) => tracing::info!(video_id = video.id, %poster, "poster created"),
                Err(e) => {
                    failed += 1;
                    tracing::error!(video_id = video.id, error = %e, "poster backfill failed");
                }
            }
        }

        if failed > 0 {
            return Err(PosterError::Backfill { failed, total });
        }
        Ok(total)
    }

    async fn backfill_one(&self, video: &VideoAsset) -> Result<String, PosterError> {
        let timestamp = poster_timestamp(video.duration);
        let asset_dir = self.store.asset_dir(&video.fingerprint);
        let playlist_path = asset_dir.join(format!("{}.m3u8", self.ladder.highest()));

        let content = tokio::fs::read_to_string(&playlist_path).await?;
        let playlist =
            MediaPlaylist::parse(&content).map_err(|reason| PosterError::Playlist {
                path: playlist_path.clone(),
                reason,
            })?;
        let (segment, offset) =
            playlist
                .locate(timestamp)
                .ok_or_else(|| PosterError::SegmentNotFound {
                    path: playlist_path.clone(),
                    timestamp,
                })?;

        let poster = poster_file_name(timestamp);
        tracing::debug!(segment = %segment.uri, offset, "grabbing poster frame");
        self.encoder
            .extract_frame(&asset_dir.join(&segment.uri), offset, &asset_dir.join(&poster))
            .await?;
        self.repo.update_poster(video.id, &poster).await?;
        Ok(poster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::local::memory::InMemoryVideoRepository;
    use crate::domain::video::{NewVideoAsset, VideoStatus};
    use crate::ports::media::MockEncoder;
    use crate::ports::repository::MockVideoRepository;
    use mockall::predicate::eq;
    use tempfile::{tempdir, TempDir};

    fn ladder() -> ResolutionLadder {
        ResolutionLadder::parse(["360", "1080"]).unwrap()
    }

    fn write_playlist(store: &AssetStore, fingerprint: &str, durations: &[f64]) {
        let mut playlist = MediaPlaylist::default();
        for (i, duration) in durations.iter().enumerate() {
            playlist.add_segment(*duration, format!("1080_{:03}.ts", i));
        }
        let dir = store.asset_dir(fingerprint);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("1080.m3u8"), playlist.render()).unwrap();
    }

    async fn processed(repo: &InMemoryVideoRepository, fingerprint: &str, duration: f64) -> i64 {
        repo.create(NewVideoAsset {
            fingerprint: fingerprint.to_string(),
            duration,
            poster: None,
            status: VideoStatus::Processed,
        })
        .await
        .unwrap()
    }

    fn store() -> (TempDir, AssetStore) {
        let temp_dir = tempdir().unwrap();
        let store = AssetStore::new(temp_dir.path(), "videos");
        (temp_dir, store)
    }

    #[tokio::test]
    async fn test_backfill_uses_segment_covering_timestamp() {
        let (_temp_dir, store) = store();
        let repo = InMemoryVideoRepository::new();
        let id = processed(&repo, "fp", 30.0).await;
        write_playlist(&store, "fp", &[10.0, 10.0, 10.0]);

        let segment = store.asset_dir("fp").join("1080_001.ts");
        let poster = store.asset_dir("fp").join("15.000000.jpg");
        let mut encoder = MockEncoder::new();
        encoder
            .expect_extract_frame()
            .with(eq(segment), eq(5.0), eq(poster))
            .times(1)
            .returning(|_, _, _| Ok(()));

        let service = PosterService::new(store, encoder, repo.clone(), ladder());
        assert_eq!(service.backfill_posters().await.unwrap(), 1);

        let video = repo.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(video.poster.as_deref(), Some("15.000000.jpg"));
    }

    #[tokio::test]
    async fn test_backfill_continues_past_failures() {
        let (_temp_dir, store) = store();
        let repo = InMemoryVideoRepository::new();
        let missing = processed(&repo, "missing", 30.0).await;
        let past_end = processed(&repo, "short", 120.0).await;
        let ok = processed(&repo, "ok", 20.0).await;
        write_playlist(&store, "short", &[4.0]);
        write_playlist(&store, "ok", &[10.0, 10.0]);

        let mut encoder = MockEncoder::new();
        encoder
            .expect_extract_frame()
            .times(1)
            .returning(|_, _, _| Ok(()));

        let service = PosterService::new(store, encoder, repo.clone(), ladder());
        let err = service.backfill_posters().await.unwrap_err();
        assert!(matches!(err, PosterError::Backfill { failed: 2, total: 3 }));

        for id in [missing, past_end] {
            assert!(repo.get_by_id(id).await.unwrap().unwrap().poster.is_none());
        }
        let video = repo.get_by_id(ok).await.unwrap().unwrap();
        assert_eq!(video.poster.as_deref(), Some("10.000000.jpg"));
    }

    #[tokio::test]
    async fn test_backfill_with_nothing_to_do() {
        let (_temp_dir, store) = store();
        let mut repo = MockVideoRepository::new();
        repo.expect_list_processed_without_poster()
            .times(1)
            .returning(|| Ok(Vec::new()));
        repo.expect_update_poster().never();

        let service = PosterService::new(store, MockEncoder::new(), repo, ladder());
        assert_eq!(service.backfill_posters().await.unwrap(), 0);
    }
}
