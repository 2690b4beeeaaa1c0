//! Redis adapter for local deployment.
//!
//! Provides a Redis-backed `VideoRepository`. Rows are stored as JSON under
//! `strata:video:<id>`. The public id key holds one id; the fingerprint key is a
//! set of ids, since a failed upload can be retried under the same fingerprint.

mod error;
mod pool;
mod repository;

pub use error::RedisRepositoryError;
pub use pool::RedisPool;

/// Redis key constants
const VIDEO_ID_COUNTER: &str = "strata:video_last_id";
const VIDEO_IDS: &str = "strata:videos";
const VIDEO_PREFIX: &str = "strata:video:";
const VIDEO_PUBLIC_ID_PREFIX: &str = "strata:video_public_id:";
const VIDEO_FINGERPRINT_PREFIX: &str = "strata:video_fingerprint:";
