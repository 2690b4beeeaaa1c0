//! Redis error types for the local adapter.

use crate::error::RepositoryError;
use deadpool_redis::CreatePoolError;

pub type RedisError = deadpool_redis::redis::RedisError;
pub type PoolError = deadpool_redis::PoolError;

#[derive(Debug, thiserror::Error)]
pub enum RedisRepositoryError {
    #[error("Redis error: {0}")]
    Redis(#[from] RedisError),

    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("Create pool error: {0}")]
    CreatePool(#[from] CreatePoolError),
}

impl From<RedisRepositoryError> for RepositoryError {
    fn from(err: RedisRepositoryError) -> Self {
        RepositoryError::Backend(err.to_string())
    }
}

impl From<RedisError> for RepositoryError {
    fn from(err: RedisError) -> Self {
        RedisRepositoryError::from(err).into()
    }
}

impl From<PoolError> for RepositoryError {
    fn from(err: PoolError) -> Self {
        RedisRepositoryError::from(err).into()
    }
}
