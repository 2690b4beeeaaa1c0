//! Parsing of media-probe output.

pub mod stream;
pub mod video_stream;

pub use stream::{parse_duration, parse_streams, FromStream};
pub use video_stream::VideoStream;
