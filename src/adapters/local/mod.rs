//! Local adapters for monolith deployment.

pub mod channel;
pub mod ffmpeg;
pub mod fs;
pub mod http;
pub mod memory;
pub mod redis;

pub use channel::ChannelQueue;
pub use ffmpeg::FfmpegCli;
pub use fs::AssetStore;
pub use memory::InMemoryVideoRepository;
pub use redis::RedisPool;
