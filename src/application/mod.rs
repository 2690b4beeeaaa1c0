//! Application layer - Generic services that use ports.

pub mod ingest;
pub mod playback;
pub mod poster;
pub mod transcoder;
pub mod worker;
