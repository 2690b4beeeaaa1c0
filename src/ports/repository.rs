use crate::domain::video::{NewVideoAsset, VideoAsset, VideoFilter, VideoStatus};
use crate::error::RepositoryError;
use async_trait::async_trait;
use uuid::Uuid;

/// Persistence of video rows. The repository is the single source of truth for
/// status transitions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoRepository: Send + Sync {
    /// Insert a row, assigning its id, public id and timestamps. Returns the id.
    async fn create(&self, video: NewVideoAsset) -> Result<i64, RepositoryError>;

    async fn get_by_id(&self, id: i64) -> Result<Option<VideoAsset>, RepositoryError>;

    async fn get_by_public_id(&self, public_id: Uuid)
        -> Result<Option<VideoAsset>, RepositoryError>;

    async fn update_status(&self, id: i64, status: VideoStatus) -> Result<(), RepositoryError>;

    async fn update_poster(&self, id: i64, poster: &str) -> Result<(), RepositoryError>;

    async fn exists_by_fingerprint(&self, fingerprint: &str) -> Result<bool, RepositoryError>;

    async fn list_processed_without_poster(&self) -> Result<Vec<VideoAsset>, RepositoryError>;

    async fn list(&self, filter: VideoFilter) -> Result<Vec<VideoAsset>, RepositoryError>;

    async fn delete(&self, id: i64) -> Result<(), RepositoryError>;
}
