use crate::error::ProbeError;
use serde_json::Value;

pub trait FromStream {
    fn from_stream(stream_data: &Value) -> Option<Self>
    where
        Self: Sized;
}

/// Extracts the `streams` array of a JSON probe report.
pub fn parse_streams(report: &[u8]) -> Result<Vec<Value>, ProbeError> {
    let v: Value = serde_json::from_slice(report)
        .map_err(|e| ProbeError::Parse(format!("invalid probe json: {}", e)))?;

    match v.get("streams").and_then(Value::as_array) {
        Some(streams) => Ok(streams.clone()),
        None => Err(ProbeError::Parse("probe report has no streams".to_string())),
    }
}

/// Parses a bare duration line such as `12.345000`. `N/A` and empty output yield `None`.
pub fn parse_duration(output: &[u8]) -> Result<Option<f64>, ProbeError> {
    let text = String::from_utf8_lossy(output);
    let text = text.trim();
    if text.is_empty() || text == "N/A" {
        return Ok(None);
    }
    let duration = text
        .parse::<f64>()
        .map_err(|_| ProbeError::Parse(format!("invalid duration {:?}", text)))?;
    if !duration.is_finite() || duration < 0.0 {
        return Err(ProbeError::Parse(format!("invalid duration {:?}", text)));
    }
    Ok(Some(duration))
}
