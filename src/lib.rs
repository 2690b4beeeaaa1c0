//! Strata - Video ingestion and HLS transcode pipeline
//!
//! Hexagonal Architecture:
//! - domain/: Pure business logic (fingerprints, ladder, playlists, posters, video rows)
//! - ports/: Trait definitions (media tools, repository, queue)
//! - adapters/: Concrete implementations (ffmpeg, filesystem, Redis, in-memory, HTTP)
//! - application/: Generic services (ingest, transcode, posters, playback, workers)
//! - config: Environment configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;

pub use config::LocalConfig;
pub use domain::hls;
