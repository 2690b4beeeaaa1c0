//! Monolith Binary - single-server deployment
//!
//! Wires up:
//! - Local adapters (filesystem, ffmpeg, Redis or in-memory rows, channel queue)
//! - Transcode worker pool
//! - HTTP inbound adapter

use std::sync::Arc;
use strata::adapters::local::http::{self, AppState};
use strata::adapters::local::{
    AssetStore, ChannelQueue, FfmpegCli, InMemoryVideoRepository, RedisPool,
};
use strata::application::ingest::IngestService;
use strata::application::playback::PlaybackService;
use strata::application::poster::PosterService;
use strata::application::transcoder::TranscodeService;
use strata::application::worker::WorkerService;
use strata::config::LocalConfig;
use strata::ports::repository::VideoRepository;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match LocalConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    match config.redis_url.clone() {
        Some(url) => match RedisPool::new(&url) {
            Ok(pool) => run(config, pool).await,
            Err(e) => {
                tracing::error!(error = %e, "failed to create Redis pool");
                std::process::exit(1);
            }
        },
        None => {
            tracing::warn!("REDIS_URL not set, video rows are kept in memory");
            run(config, InMemoryVideoRepository::new()).await
        }
    }
}

async fn run<R>(config: LocalConfig, repo: R)
where
    R: VideoRepository + Clone + 'static,
{
    // 1. Adapters
    let store = config.asset_store();
    if let Err(e) = prepare_dirs(&store).await {
        tracing::error!(error = %e, root = %store.root().display(), "failed to create storage directories");
        std::process::exit(1);
    }
    let ffmpeg = FfmpegCli::new(&config.ffmpeg_path, &config.ffprobe_path);
    let queue = ChannelQueue::bounded(config.queue_capacity);

    // 2. Application Services
    let transcoder = TranscodeService::new(
        ffmpeg.clone(),
        ffmpeg.clone(),
        repo.clone(),
        config.transcode_settings(),
    );
    let ingest = IngestService::new(
        store.clone(),
        ffmpeg.clone(),
        ffmpeg.clone(),
        repo.clone(),
        queue.clone(),
    );
    let posters = PosterService::new(
        store.clone(),
        ffmpeg,
        repo.clone(),
        config.resolutions.clone(),
    );
    let playback = PlaybackService::new(store, repo);

    // 3. Start Workers
    Arc::new(WorkerService::new(queue, transcoder)).start(config.worker_count);

    // 4. HTTP Layer
    let app = http::router(AppState {
        ingest: Arc::new(ingest),
        posters: Arc::new(posters),
        playback: Arc::new(playback),
    });

    // 5. Start Server
    let listener = tokio::net::TcpListener::bind(format!("{}:{}", config.addr, config.port))
        .await
        .expect("Failed to bind TCP listener");
    tracing::info!(addr = %config.addr, port = %config.port, "listening");
    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}

async fn prepare_dirs(store: &AssetStore) -> std::io::Result<()> {
    tokio::fs::create_dir_all(store.root()).await?;
    tokio::fs::create_dir_all(store.staging_dir()).await
}
