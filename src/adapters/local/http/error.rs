use crate::error::{IngestError, PlaybackError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Status code plus message, as returned to HTTP clients.
#[derive(Debug, PartialEq, Eq)]
pub struct ApiError(pub StatusCode, pub String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        let status = match &err {
            IngestError::DuplicateAsset { .. } => StatusCode::CONFLICT,
            IngestError::InvalidFileName(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError(status, err.to_string())
    }
}

impl From<PlaybackError> for ApiError {
    fn from(err: PlaybackError) -> Self {
        let status = match &err {
            PlaybackError::NotFound => StatusCode::NOT_FOUND,
            PlaybackError::InvalidPath(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError(status, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let duplicate = ApiError::from(IngestError::DuplicateAsset {
            fingerprint: "fp".to_string(),
        });
        assert_eq!(duplicate.0, StatusCode::CONFLICT);

        let invalid = ApiError::from(IngestError::InvalidFileName("../x".to_string()));
        assert_eq!(invalid.0, StatusCode::BAD_REQUEST);

        let storage = ApiError::from(IngestError::Storage(std::io::Error::other("disk")));
        assert_eq!(storage.0, StatusCode::INTERNAL_SERVER_ERROR);

        assert_eq!(ApiError::from(PlaybackError::NotFound).0, StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(PlaybackError::InvalidPath("..".to_string())).0,
            StatusCode::BAD_REQUEST
        );
    }
}
