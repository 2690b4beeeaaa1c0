//! Process-local repository, used when no Redis URL is configured.

use crate::domain::video::{NewVideoAsset, VideoAsset, VideoFilter, VideoStatus};
use crate::error::RepositoryError;
use crate::ports::repository::VideoRepository;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Rows {
    last_id: i64,
    videos: BTreeMap<i64, VideoAsset>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryVideoRepository {
    rows: Arc<RwLock<Rows>>,
}

impl InMemoryVideoRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn modify<F>(&self, id: i64, f: F) -> Result<(), RepositoryError>
    where
        F: FnOnce(&mut VideoAsset) + Send,
    {
        let mut rows = self.rows.write().await;
        let video = rows
            .videos
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound(id))?;
        f(video);
        video.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl VideoRepository for InMemoryVideoRepository {
    async fn create(&self, video: NewVideoAsset) -> Result<i64, RepositoryError> {
        let mut rows = self.rows.write().await;
        rows.last_id += 1;
        let id = rows.last_id;
        let now = Utc::now();
        rows.videos.insert(
            id,
            VideoAsset {
                id,
                public_id: Uuid::new_v4(),
                fingerprint: video.fingerprint,
                duration: video.duration,
                poster: video.poster,
                status: video.status,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<VideoAsset>, RepositoryError> {
        Ok(self.rows.read().await.videos.get(&id).cloned())
    }

    async fn get_by_public_id(
        &self,
        public_id: Uuid,
    ) -> Result<Option<VideoAsset>, RepositoryError> {
        let rows = self.rows.read().await;
        Ok(rows
            .videos
            .values()
            .find(|v| v.public_id == public_id)
            .cloned())
    }

    async fn update_status(&self, id: i64, status: VideoStatus) -> Result<(), RepositoryError> {
        self.modify(id, |video| video.status = status).await
    }

    async fn update_poster(&self, id: i64, poster: &str) -> Result<(), RepositoryError> {
        let poster = poster.to_string();
        self.modify(id, move |video| video.poster = Some(poster)).await
    }

    async fn exists_by_fingerprint(&self, fingerprint: &str) -> Result<bool, RepositoryError> {
        let rows = self.rows.read().await;
        Ok(rows.videos.values().any(|v| v.fingerprint == fingerprint))
    }

    async fn list_processed_without_poster(&self) -> Result<Vec<VideoAsset>, RepositoryError> {
        let rows = self.rows.read().await;
        Ok(rows
            .videos
            .values()
            .filter(|v| v.status == VideoStatus::Processed && v.poster.is_none())
            .cloned()
            .collect())
    }

    async fn list(&self, filter: VideoFilter) -> Result<Vec<VideoAsset>, RepositoryError> {
        let rows = self.rows.read().await;
        Ok(rows
            .videos
            .values()
            .filter(|v| filter.matches(v))
            .cloned()
            .collect())
    }

    async fn delete(&self, id: i64) -> Result<(), RepositoryError> {
        self.rows.write().await.videos.remove(&id);
        Ok(())
    }
}
