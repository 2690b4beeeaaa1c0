//! Redis VideoRepository implementation.

use super::pool::RedisPool;
use super::{
    VIDEO_FINGERPRINT_PREFIX, VIDEO_IDS, VIDEO_ID_COUNTER, VIDEO_PREFIX, VIDEO_PUBLIC_ID_PREFIX,
};
use crate::domain::video::{NewVideoAsset, VideoAsset, VideoFilter, VideoStatus};
use crate::error::RepositoryError;
use crate::ports::repository::VideoRepository;
use async_trait::async_trait;
use chrono::Utc;
use deadpool_redis::redis::AsyncCommands;
use deadpool_redis::Connection;
use uuid::Uuid;

fn video_key(id: i64) -> String {
    format!("{}{}", VIDEO_PREFIX, id)
}

fn public_id_key(public_id: Uuid) -> String {
    format!("{}{}", VIDEO_PUBLIC_ID_PREFIX, public_id)
}

fn fingerprint_key(fingerprint: &str) -> String {
    format!("{}{}", VIDEO_FINGERPRINT_PREFIX, fingerprint)
}

impl RedisPool {
    async fn load(
        conn: &mut Connection,
        id: i64,
    ) -> Result<Option<VideoAsset>, RepositoryError> {
        let json: Option<String> = conn.get(video_key(id)).await?;
        match json {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    async fn store(conn: &mut Connection, video: &VideoAsset) -> Result<(), RepositoryError> {
        let json = serde_json::to_string(video)?;
        conn.set::<_, _, ()>(video_key(video.id), json).await?;
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<VideoAsset>, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let mut ids: Vec<i64> = conn.smembers(VIDEO_IDS).await?;
        ids.sort_unstable();

        let mut videos = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(video) = Self::load(&mut conn, id).await? {
                videos.push(video);
            }
        }
        Ok(videos)
    }

    async fn modify<F>(&self, id: i64, f: F) -> Result<(), RepositoryError>
    where
        F: FnOnce(&mut VideoAsset) + Send,
    {
        let mut conn = self.pool.get().await?;
        let mut video = Self::load(&mut conn, id)
            .await?
            .ok_or(RepositoryError::NotFound(id))?;
        f(&mut video);
        video.updated_at = Utc::now();
        Self::store(&mut conn, &video).await
    }
}

#[async_trait]
impl VideoRepository for RedisPool {
    async fn create(&self, video: NewVideoAsset) -> Result<i64, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let id: i64 = conn.incr(VIDEO_ID_COUNTER, 1i64).await?;
        let now = Utc::now();
        let row = VideoAsset {
            id,
            public_id: Uuid::new_v4(),
            fingerprint: video.fingerprint,
            duration: video.duration,
            poster: video.poster,
            status: video.status,
            created_at: now,
            updated_at: now,
        };

        Self::store(&mut conn, &row).await?;
        conn.set::<_, _, ()>(public_id_key(row.public_id), id).await?;
        conn.sadd::<_, _, ()>(fingerprint_key(&row.fingerprint), id).await?;
        conn.sadd::<_, _, ()>(VIDEO_IDS, id).await?;
        Ok(id)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<VideoAsset>, RepositoryError> {
        let mut conn = self.pool.get().await?;
        Self::load(&mut conn, id).await
    }

    async fn get_by_public_id(
        &self,
        public_id: Uuid,
    ) -> Result<Option<VideoAsset>, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let id: Option<i64> = conn.get(public_id_key(public_id)).await?;
        match id {
            Some(id) => Self::load(&mut conn, id).await,
            None => Ok(None),
        }
    }

    async fn update_status(&self, id: i64, status: VideoStatus) -> Result<(), RepositoryError> {
        self.modify(id, |video| video.status = status).await
    }

    async fn update_poster(&self, id: i64, poster: &str) -> Result<(), RepositoryError> {
        let poster = poster.to_string();
        self.modify(id, move |video| video.poster = Some(poster)).await
    }

    async fn exists_by_fingerprint(&self, fingerprint: &str) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let rows: usize = conn.scard(fingerprint_key(fingerprint)).await?;
        Ok(rows > 0)
    }

    async fn list_processed_without_poster(&self) -> Result<Vec<VideoAsset>, RepositoryError> {
        Ok(self
            .load_all()
            .await?
            .into_iter()
            .filter(|v| v.status == VideoStatus::Processed && v.poster.is_none())
            .collect())
    }

    async fn list(&self, filter: VideoFilter) -> Result<Vec<VideoAsset>, RepositoryError> {
        Ok(self
            .load_all()
            .await?
            .into_iter()
            .filter(|v| filter.matches(v))
            .collect())
    }

    async fn delete(&self, id: i64) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await?;
        if let Some(video) = Self::load(&mut conn, id).await? {
            conn.del::<_, ()>(&[video_key(id), public_id_key(video.public_id)])
                .await?;
            // Other rows may share the fingerprint
            conn.srem::<_, _, ()>(fingerprint_key(&video.fingerprint), id)
                .await?;
        }
        conn.srem::<_, _, ()>(VIDEO_IDS, id).await?;
        Ok(())
    }
}
