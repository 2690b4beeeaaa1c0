/// Videos longer than this get their poster at 10% instead of the midpoint.
const LONG_VIDEO_SECONDS: f64 = 60.0;

/// Timestamp, in seconds, of the frame used as poster.
pub fn poster_timestamp(duration: f64) -> f64 {
    if duration > LONG_VIDEO_SECONDS {
        duration * 10.0 / 100.0
    } else {
        duration / 2.0
    }
}

/// File name of a poster grabbed at `timestamp`.
pub fn poster_file_name(timestamp: f64) -> String {
    format!("{:.6}.jpg", timestamp)
}
