//! Bulk complaint upload

use axum::{
    body::{Body, Bytes},
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::Response,
};
use futures::StreamExt;
use tokio_util::io::ReaderStream;

use super::{ApiError, ApiResult};
use crate::triage::{process_upload, package::ARCHIVE_NAME, Bundle};
use crate::AppState;

/// POST /analyze-complaints
///
/// Takes the first multipart field that carries a filename, runs the
/// bulk pipeline on the blocking pool and streams back the zip.
pub async fn analyze_complaints(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Response> {
    let (filename, bytes) = read_upload(&mut multipart).await?;
    tracing::info!(filename = %filename, bytes = bytes.len(), "received complaint upload");

    let engine = state.engine.clone();
    let limits = state.limits;
    let bundle = tokio::task::spawn_blocking(move || {
        process_upload(engine.as_ref(), &filename, &bytes, &limits)
    })
    .await??;

    archive_response(bundle).await
}

async fn read_upload(multipart: &mut Multipart) -> ApiResult<(String, Bytes)> {
    while let Some(field) = multipart.next_field().await? {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field.bytes().await?;
        return Ok((filename, bytes));
    }
    Err(ApiError::MissingFile)
}

/// Stream the archive file. The scratch directory travels inside the body
/// stream and is released once the last chunk is read, or when the stream
/// is dropped early.
async fn archive_response(bundle: Bundle) -> ApiResult<Response> {
    let size = bundle.size();
    let (archive_path, scratch) = bundle.into_parts();
    let file = tokio::fs::File::open(&archive_path).await?;

    let stream = async_stream::stream! {
        let mut scratch = scratch;
        let mut chunks = ReaderStream::new(file);
        while let Some(chunk) = chunks.next().await {
            yield chunk;
        }
        scratch.release();
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/zip")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{ARCHIVE_NAME}\""),
        )
        .header(header::CONTENT_LENGTH, size)
        .body(Body::from_stream(stream))
        .map_err(|e| ApiError::Internal(e.to_string()))
}
