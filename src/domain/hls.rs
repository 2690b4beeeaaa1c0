use crate::domain::ladder::Orientation;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

const MASTER_VERSION: u8 = 3;

/// Quality tiers with fixed stream-info tags: (height, width, bandwidth).
const CANONICAL_TIERS: [(u32, u32, u64); 4] = [
    (360, 640, 800_000),
    (480, 854, 1_400_000),
    (720, 1280, 2_800_000),
    (1080, 1920, 5_000_000),
];

#[derive(Debug, Clone, PartialEq)]
pub struct MediaSegment {
    pub duration: f64,
    pub uri: String,
}

/// A per-resolution playlist as written by the encoder. Only the segment list is
/// kept; other tags are skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaPlaylist {
    pub segments: Vec<MediaSegment>,
}

impl MediaPlaylist {
    pub fn parse(content: &str) -> Result<Self, String> {
        let mut lines = content.lines().map(str::trim).filter(|l| !l.is_empty());
        if lines.next() != Some("#EXTM3U") {
            return Err("missing #EXTM3U header".to_string());
        }

        let mut playlist = MediaPlaylist::default();
        let mut pending: Option<f64> = None;

        for line in lines {
            if let Some(value) = line.strip_prefix("#EXTINF:") {
                let duration = value.split(',').next().unwrap_or_default().trim();
                let duration = duration
                    .parse::<f64>()
                    .map_err(|_| format!("invalid segment duration {:?}", duration))?;
                pending = Some(duration);
            } else if line.starts_with('#') {
                continue;
            } else if let Some(duration) = pending.take() {
                playlist.segments.push(MediaSegment {
                    duration,
                    uri: line.to_string(),
                });
            } else {
                return Err(format!("segment {:?} has no #EXTINF", line));
            }
        }

        Ok(playlist)
    }

    /// Segment covering `timestamp` and the offset of `timestamp` inside it.
    pub fn locate(&self, timestamp: f64) -> Option<(&MediaSegment, f64)> {
        let mut elapsed = 0.0;
        for segment in &self.segments {
            if elapsed + segment.duration >= timestamp {
                return Some((segment, timestamp - elapsed));
            }
            elapsed += segment.duration;
        }
        None
    }
}

#[cfg(test)]
impl MediaPlaylist {
    pub fn add_segment(&mut self, duration: f64, uri: String) {
        self.segments.push(MediaSegment { duration, uri });
    }

    /// Same shape as the encoder's VOD output.
    pub fn render(&self) -> String {
        let target = self
            .segments
            .iter()
            .map(|s| s.duration.ceil() as u64)
            .max()
            .unwrap_or_default();
        let mut out = format!(
            "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:{}\n#EXT-X-MEDIA-SEQUENCE:0\n",
            target
        );
        for segment in &self.segments {
            out.push_str(&format!("#EXTINF:{:.6},\n{}\n", segment.duration, segment.uri));
        }
        out.push_str("#EXT-X-ENDLIST\n");
        out
    }
}

/// One `#EXT-X-STREAM-INF` entry of the master playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantStream {
    pub bandwidth: u64,
    pub width: u32,
    pub height: u32,
    pub uri: String,
}

impl VariantStream {
    /// Entry for a produced rendition, referenced as `<fingerprint>/<resolution>.m3u8`.
    ///
    /// The four canonical tiers keep their fixed tags. Other sizes get a 16:9 frame
    /// and a bandwidth proportional to the pixel count of the 1080 tier.
    pub fn for_rendition(fingerprint: &str, resolution: u32, orientation: Orientation) -> Self {
        let (long_side, bandwidth) = CANONICAL_TIERS
            .iter()
            .find(|(h, _, _)| *h == resolution)
            .map(|(_, w, b)| (*w, *b))
            .unwrap_or_else(|| {
                let long_side = even(resolution as u64 * 16 / 9) as u32;
                let pixels = long_side as u64 * resolution as u64;
                (long_side, pixels * 5_000_000 / (1920 * 1080))
            });

        let (width, height) = match orientation {
            Orientation::Landscape => (long_side, resolution),
            Orientation::Portrait => (resolution, long_side),
        };

        Self {
            bandwidth,
            width,
            height,
            uri: format!("{}/{}.m3u8", fingerprint, resolution),
        }
    }
}

fn even(value: u64) -> u64 {
    value + value % 2
}

/// Top-level manifest listing every rendition.
#[derive(Debug, Clone, PartialEq)]
pub struct MasterPlaylist {
    pub version: u8,
    pub variants: Vec<VariantStream>,
}

impl MasterPlaylist {
    pub fn new(variants: Vec<VariantStream>) -> Self {
        Self {
            version: MASTER_VERSION,
            variants,
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::from("#EXTM3U\n");
        out.push_str(&format!("#EXT-X-VERSION:{}\n", self.version));
        for variant in &self.variants {
            out.push_str(&format!(
                "#EXT-X-STREAM-INF:BANDWIDTH={},RESOLUTION={}x{}\n",
                variant.bandwidth, variant.width, variant.height
            ));
            out.push_str(&variant.uri);
            out.push('\n');
        }
        out
    }

    pub async fn write_to(&self, path: &Path) -> Result<(), std::io::Error> {
        let mut file = File::create(path).await?;
        file.write_all(self.render().as_bytes()).await?;
        file.flush().await
    }
}
