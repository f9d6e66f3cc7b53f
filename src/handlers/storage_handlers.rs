//! Serves stored photo objects at their public URLs.
//! Streams payloads from disk rather than buffering them.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use tokio_util::io::ReaderStream;

use crate::errors::AppError;
use crate::state::AppState;

/// `GET /storage/{bucket}/{*path}` — stream an object's bytes.
pub async fn get_object(
    State(state): State<AppState>,
    Path((bucket, path)): Path<(String, String)>,
) -> Result<Response, AppError> {
    if bucket != state.storage.bucket {
        return Err(AppError::not_found(format!("no such bucket `{bucket}`")));
    }

    let (file, len) = state.storage.open_object(&path).await?;
    let stream = ReaderStream::new(file);
    let body = Body::from_stream(stream);

    let content_type = mime_guess::from_path(&path).first_or_octet_stream();

    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(content_type.as_ref())
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from_str(&len.to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("0")),
    );
    Ok(response)
}
