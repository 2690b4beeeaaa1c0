use super::stream::FromStream;
use crate::domain::ladder::Orientation;
use serde_json::Value;

/// Codec names of the high-efficiency family that gets re-encoded before segmenting.
const HIGH_EFFICIENCY_CODECS: [&str; 2] = ["hevc", "h265"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoStream {
    pub codec: String,
    pub width: u32,
    pub height: u32,
}

impl VideoStream {
    pub fn orientation(&self) -> Orientation {
        Orientation::from_dimensions(self.width, self.height)
    }

    pub fn needs_codec_normalization(&self) -> bool {
        HIGH_EFFICIENCY_CODECS.contains(&self.codec.to_ascii_lowercase().as_str())
    }
}

impl FromStream for VideoStream {
    /// Accepts entries with `codec_type == "video"`, or without `codec_type` at all
    /// (reports restricted with `-show_entries` omit it).
    fn from_stream(stream_data: &Value) -> Option<Self> {
        match stream_data.get("codec_type").and_then(Value::as_str) {
            Some("video") | None => {}
            Some(_) => return None,
        }

        let width = stream_data.get("width")?.as_u64()?;
        let height = stream_data.get("height")?.as_u64()?;
        if width == 0 || height == 0 {
            return None;
        }

        Some(VideoStream {
            codec: stream_data.get("codec_name")?.as_str()?.trim().to_string(),
            width: u32::try_from(width).ok()?,
            height: u32::try_from(height).ok()?,
        })
    }
}
