use super::{ApiError, AppState};
use crate::application::ingest::UploadedFile;
use crate::application::playback::PLAYLIST_CONTENT_TYPE;
use crate::ports::media::{Encoder, MediaProbe};
use crate::ports::repository::VideoRepository;
use axum::{
    body::Bytes,
    extract::{multipart::Field, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    BoxError, Json,
};
use futures::{Stream, TryStreamExt};
use serde::Serialize;
use std::io;
use tempfile::TempPath;
use tokio::{fs::File, io::AsyncWriteExt, io::BufWriter};
use tokio_util::io::StreamReader;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub ids: Vec<i64>,
    pub failed: Vec<FailedUpload>,
}

/// A file of a multi-file upload that was not ingested.
#[derive(Debug, Serialize)]
pub struct FailedUpload {
    pub file_name: Option<String>,
    pub status: u16,
    pub error: String,
}

/// Each file field is staged, then ingested synchronously. Transcoding is queued.
///
/// Files are independent: the ids already created are returned next to the
/// files that failed. When nothing was created the first error is the response.
pub async fn upload_media<P, E, R>(
    State(state): State<AppState<P, E, R>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError>
where
    P: MediaProbe + 'static,
    E: Encoder + 'static,
    R: VideoRepository + 'static,
{
    let mut ids = Vec::new();
    let mut errors = Vec::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                // the rest of the body cannot be read
                errors.push((None, ApiError(StatusCode::BAD_REQUEST, e.to_string())));
                break;
            }
        };
        let file_name = if let Some(file_name) = field.file_name() {
            file_name.to_owned()
        } else {
            continue;
        };

        match ingest_field(&state, file_name.clone(), field).await {
            Ok(id) => ids.push(id),
            Err(err) => {
                tracing::warn!(%file_name, status = %err.0, error = %err.1, "upload rejected");
                errors.push((Some(file_name), err));
            }
        }
    }

    if ids.is_empty() {
        return Err(errors.into_iter().next().map(|(_, err)| err).unwrap_or_else(|| {
            ApiError(StatusCode::BAD_REQUEST, "no file in upload".to_owned())
        }));
    }
    let failed = errors
        .into_iter()
        .map(|(file_name, ApiError(status, error))| FailedUpload {
            file_name,
            status: status.as_u16(),
            error,
        })
        .collect();
    Ok(Json(UploadResponse { ids, failed }))
}

async fn ingest_field<P, E, R>(
    state: &AppState<P, E, R>,
    file_name: String,
    field: Field<'_>,
) -> Result<i64, ApiError>
where
    P: MediaProbe + 'static,
    E: Encoder + 'static,
    R: VideoRepository + 'static,
{
    let staged = stage_file(state.ingest.store().staging_dir()).await?;
    let size = stream_to_file(&staged, field).await?;
    tracing::debug!(%file_name, size, "upload staged");

    let id = state
        .ingest
        .upload(UploadedFile {
            file_name,
            size,
            staged,
        })
        .await?;
    Ok(id)
}

pub async fn master_playlist<P, E, R>(
    State(state): State<AppState<P, E, R>>,
    Path(public_id): Path<Uuid>,
) -> Result<Response, ApiError>
where
    P: MediaProbe + 'static,
    E: Encoder + 'static,
    R: VideoRepository + 'static,
{
    let bytes = state.playback.master_playlist(public_id).await?;
    Ok(([(header::CONTENT_TYPE, PLAYLIST_CONTENT_TYPE)], bytes).into_response())
}

/// A sub-playlist or segment, addressed as `<fingerprint>/<file>`.
pub async fn stream_file<P, E, R>(
    State(state): State<AppState<P, E, R>>,
    Path((fingerprint, file_name)): Path<(String, String)>,
) -> Result<Response, ApiError>
where
    P: MediaProbe + 'static,
    E: Encoder + 'static,
    R: VideoRepository + 'static,
{
    let file = state
        .playback
        .rendition_file(&format!("{fingerprint}/{file_name}"))
        .await?;
    Ok(([(header::CONTENT_TYPE, file.content_type)], file.bytes).into_response())
}

pub async fn poster<P, E, R>(
    State(state): State<AppState<P, E, R>>,
    Path(public_id): Path<Uuid>,
) -> Result<Response, ApiError>
where
    P: MediaProbe + 'static,
    E: Encoder + 'static,
    R: VideoRepository + 'static,
{
    let path = state.playback.poster_path(public_id).await?;
    let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ApiError(StatusCode::NOT_FOUND, "poster not found".to_owned()),
        _ => ApiError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    })?;
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes).into_response())
}

/// Starts a poster backfill in the background and returns immediately.
pub async fn backfill_posters<P, E, R>(State(state): State<AppState<P, E, R>>) -> impl IntoResponse
where
    P: MediaProbe + 'static,
    E: Encoder + 'static,
    R: VideoRepository + 'static,
{
    let posters = state.posters.clone();
    tokio::spawn(async move {
        if let Err(e) = posters.backfill_posters().await {
            tracing::error!(error = %e, "poster backfill finished with errors");
        }
    });
    (StatusCode::ACCEPTED, "poster backfill started")
}

pub async fn prune_orphans<P, E, R>(State(state): State<AppState<P, E, R>>) -> impl IntoResponse
where
    P: MediaProbe + 'static,
    E: Encoder + 'static,
    R: VideoRepository + 'static,
{
    let playback = state.playback.clone();
    tokio::spawn(async move {
        if let Err(e) = playback.prune_orphans().await {
            tracing::error!(error = %e, "orphan sweep failed");
        }
    });
    (StatusCode::ACCEPTED, "orphan sweep started")
}

/// Fresh staging file, removed on drop unless ingestion moves it.
async fn stage_file(staging_dir: &std::path::Path) -> Result<TempPath, ApiError> {
    let internal = |e: io::Error| ApiError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
    tokio::fs::create_dir_all(staging_dir).await.map_err(internal)?;
    tempfile::Builder::new()
        .prefix("upload-")
        .tempfile_in(staging_dir)
        .map(|file| file.into_temp_path())
        .map_err(internal)
}

// Save a `Stream` to a file, returning the number of bytes written
async fn stream_to_file<S, E>(path: &std::path::Path, stream: S) -> Result<u64, ApiError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<BoxError>,
{
    async {
        let body_with_io_error = stream.map_err(io::Error::other);
        let body_reader = StreamReader::new(body_with_io_error);
        futures::pin_mut!(body_reader);

        let mut file = BufWriter::new(File::create(path).await?);
        let size = tokio::io::copy(&mut body_reader, &mut file).await?;
        file.flush().await?;

        Ok::<_, io::Error>(size)
    }
    .await
    .map_err(|err| ApiError(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))
}
