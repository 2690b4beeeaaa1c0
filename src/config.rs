//! Configuration for the monolith deployment.

use crate::adapters::local::channel::DEFAULT_QUEUE_CAPACITY;
use crate::adapters::local::fs::AssetStore;
use crate::application::transcoder::TranscodeSettings;
use crate::application::worker::DEFAULT_WORKER_COUNT;
use crate::domain::ladder::ResolutionLadder;
use crate::error::ConfigError;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

const DEFAULT_RESOLUTIONS: &str = "360,480,720,1080";
const DEFAULT_SEGMENT_SECONDS: u32 = 10;

#[derive(Clone, Debug)]
pub struct LocalConfig {
    /// HTTP server bind address
    pub addr: String,
    /// HTTP server port
    pub port: String,
    /// Redis connection URL. Rows are kept in memory when unset.
    pub redis_url: Option<String>,
    /// Root of all stored media
    pub storage_path: PathBuf,
    /// Sub-directory of `storage_path` holding one directory per fingerprint
    pub video_path: String,
    pub resolutions: ResolutionLadder,
    pub worker_count: usize,
    pub queue_capacity: usize,
    pub segment_seconds: u32,
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
}

impl LocalConfig {
    /// Load configuration from environment variables, reading `.env` first.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let resolutions = var("RESOLUTIONS", DEFAULT_RESOLUTIONS);

        Ok(Self {
            addr: var("ADDR", "127.0.0.1"),
            port: var("PORT", "3000"),
            redis_url: lookup("REDIS_URL").filter(|url| !url.trim().is_empty()),
            storage_path: PathBuf::from(var("STORAGE_PATH", "./storage")),
            video_path: var("VIDEO_PATH", "videos"),
            resolutions: ResolutionLadder::parse(resolutions.split(','))?,
            worker_count: parse_var(&lookup, "TRANSCODE_WORKER_COUNT", DEFAULT_WORKER_COUNT)?,
            queue_capacity: parse_var(&lookup, "TRANSCODE_QUEUE_CAPACITY", DEFAULT_QUEUE_CAPACITY)?,
            segment_seconds: parse_var(&lookup, "HLS_SEGMENT_SECONDS", DEFAULT_SEGMENT_SECONDS)?,
            ffmpeg_path: PathBuf::from(var("FFMPEG_PATH", "ffmpeg")),
            ffprobe_path: PathBuf::from(var("FFPROBE_PATH", "ffprobe")),
        })
    }

    pub fn asset_store(&self) -> AssetStore {
        AssetStore::new(&self.storage_path, &self.video_path)
    }

    pub fn transcode_settings(&self) -> TranscodeSettings {
        TranscodeSettings {
            ladder: self.resolutions.clone(),
            segment_seconds: self.segment_seconds,
        }
    }
}

/// Positive number from `key`, or `default` when unset.
fn parse_var<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + PartialOrd + Default,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse::<T>()
            .ok()
            .filter(|n| *n > T::default())
            .ok_or(ConfigError::InvalidNumber { key, value }),
    }
}
