//! HTTP inbound adapter: uploads, playback and maintenance triggers.

mod error;
mod handlers;

pub use error::ApiError;
pub use handlers::{FailedUpload, UploadResponse};

use crate::adapters::local::channel::ChannelQueue;
use crate::application::ingest::IngestService;
use crate::application::playback::PlaybackService;
use crate::application::poster::PosterService;
use crate::ports::media::{Encoder, MediaProbe};
use crate::ports::repository::VideoRepository;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

pub struct AppState<P, E, R> {
    pub ingest: Arc<IngestService<P, E, R, ChannelQueue>>,
    pub posters: Arc<PosterService<E, R>>,
    pub playback: Arc<PlaybackService<R>>,
}

impl<P, E, R> Clone for AppState<P, E, R> {
    fn clone(&self) -> Self {
        Self {
            ingest: self.ingest.clone(),
            posters: self.posters.clone(),
            playback: self.playback.clone(),
        }
    }
}

/// The master playlist lives at `/videos/:id` and lists its variants as
/// `<fingerprint>/<resolution>.m3u8`. Relative resolution lands those, and the
/// segments they list, on `/videos/:id/:file` with the fingerprint as `:id`.
pub fn router<P, E, R>(state: AppState<P, E, R>) -> Router
where
    P: MediaProbe + 'static,
    E: Encoder + 'static,
    R: VideoRepository + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/videos", post(handlers::upload_media::<P, E, R>))
        .route("/videos/:id", get(handlers::master_playlist::<P, E, R>))
        .route("/videos/:id/:file", get(handlers::stream_file::<P, E, R>))
        .route("/posters/:id", get(handlers::poster::<P, E, R>))
        .route(
            "/maintenance/posters",
            post(handlers::backfill_posters::<P, E, R>),
        )
        .route(
            "/maintenance/prune",
            post(handlers::prune_orphans::<P, E, R>),
        )
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .with_state(state)
}
