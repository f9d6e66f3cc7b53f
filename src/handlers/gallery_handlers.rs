//! Public, client-facing handlers: gallery discovery, the unlock gate, and
//! the whole-gallery archive download. The gallery secret never appears in
//! any response from this module.

use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{gallery::GallerySummary, photo::Photo};
use crate::services::access;
use crate::state::AppState;

const WRONG_SECRET_MESSAGE: &str = "Incorrect password. Please try again.";

#[derive(Debug, Deserialize)]
pub struct UnlockRequest {
    pub secret: String,
}

#[derive(Debug, Serialize)]
pub struct UnlockResponse {
    pub gallery: GallerySummary,
    pub photos: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
pub struct ArchiveQuery {
    pub secret: String,
}

/// `GET /api/galleries` — active galleries, reduced fields, newest first.
pub async fn list_active_galleries(
    State(state): State<AppState>,
) -> Result<Json<Vec<GallerySummary>>, AppError> {
    let galleries = state.repo.list_active().await?;
    Ok(Json(galleries))
}

/// `GET /api/galleries/{slug}` — public metadata for one gallery.
pub async fn get_gallery(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<GallerySummary>, AppError> {
    let gallery = state.repo.get_by_slug(&slug).await?;
    Ok(Json(gallery.into()))
}

/// `POST /api/galleries/{slug}/unlock` — verify the submitted secret.
///
/// On success the response carries the photo list; a listing failure after a
/// successful verification degrades to an empty list rather than an error.
pub async fn unlock_gallery(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(request): Json<UnlockRequest>,
) -> Result<Json<UnlockResponse>, AppError> {
    let gallery = state.repo.get_by_slug(&slug).await?;

    if !access::verify_secret(&gallery, &request.secret) {
        return Err(AppError::unauthorized(WRONG_SECRET_MESSAGE));
    }

    let photos = match state.repo.list_by_gallery(gallery.id).await {
        Ok(photos) => photos,
        Err(err) => {
            tracing::error!(gallery_id = %gallery.id, error = %err, "failed to load photos");
            Vec::new()
        }
    };

    Ok(Json(UnlockResponse {
        gallery: gallery.into(),
        photos,
    }))
}

/// `GET /api/galleries/{slug}/archive?secret=…` — build and return the ZIP.
///
/// The count of photos that failed to fetch (and were omitted) is exposed in
/// the `x-archive-skipped` header.
pub async fn download_archive(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<ArchiveQuery>,
) -> Result<Response, AppError> {
    let gallery = state.repo.get_by_slug(&slug).await?;

    if !access::verify_secret(&gallery, &query.secret) {
        return Err(AppError::unauthorized(WRONG_SECRET_MESSAGE));
    }

    let photos = state.repo.list_by_gallery(gallery.id).await?;
    if photos.is_empty() {
        return Err(AppError::not_found("gallery has no photos"));
    }

    let bundle = state
        .archive
        .build_archive(&photos, &gallery.name, |p| {
            tracing::debug!(slug = %slug, progress = p, "archive build progress");
        })
        .await?;

    let disposition = format!("attachment; filename=\"{}\"", bundle.file_name);
    let skipped = bundle.skipped.len().to_string();

    let mut response = Response::new(Body::from(bundle.bytes));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/zip"),
    );
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    if let Ok(value) = HeaderValue::from_str(&skipped) {
        headers.insert("x-archive-skipped", value);
    }
    Ok(response)
}
