//! Resolution ladder and per-rendition encoder parameters.

use crate::error::ConfigError;

/// Configured target sizes, kept in configuration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionLadder(Vec<u32>);

impl ResolutionLadder {
    /// Parse entries such as `["360", "720"]`. Blank entries are skipped.
    pub fn parse<I, S>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut sizes = Vec::new();
        for entry in entries {
            let entry = entry.as_ref().trim();
            if entry.is_empty() {
                continue;
            }
            let size = entry
                .parse::<u32>()
                .ok()
                .filter(|size| *size > 0)
                .ok_or_else(|| ConfigError::InvalidResolution(entry.to_string()))?;
            sizes.push(size);
        }
        if sizes.is_empty() {
            return Err(ConfigError::EmptyLadder);
        }
        Ok(Self(sizes))
    }

    /// Sizes in ascending numeric order, whatever the configured order was.
    pub fn ascending(&self) -> Vec<u32> {
        let mut sizes = self.0.clone();
        sizes.sort_unstable();
        sizes.dedup();
        sizes
    }

    pub fn highest(&self) -> u32 {
        self.0.iter().copied().max().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Landscape,
    Portrait,
}

impl Orientation {
    /// Portrait only when strictly taller than wide.
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        if height > width {
            Orientation::Portrait
        } else {
            Orientation::Landscape
        }
    }
}

/// One rung of the ladder as handed to the encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendition {
    pub resolution: u32,
    pub orientation: Orientation,
    pub segment_seconds: u32,
}

impl Rendition {
    /// Landscape constrains height, portrait constrains width.
    pub fn scale_filter(&self) -> String {
        match self.orientation {
            Orientation::Landscape => format!("scale=-2:{}", self.resolution),
            Orientation::Portrait => format!("scale={}:-2", self.resolution),
        }
    }

    pub fn playlist_name(&self) -> String {
        format!("{}.m3u8", self.resolution)
    }

    /// Segment file pattern understood by the encoder (`360_%03d.ts`).
    pub fn segment_pattern(&self) -> String {
        format!("{}_%03d.ts", self.resolution)
    }
}
