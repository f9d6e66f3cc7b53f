//! Admin console handlers: gallery CRUD, multipart batch photo upload,
//! photo edits/removal, cover selection, and secret regeneration. Every
//! handler requires an admin session via the [`AdminAuth`] extractor.

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::handlers::auth_handlers::AdminAuth;
use crate::models::{
    gallery::{Gallery, GalleryDraft, GalleryUpdate},
    photo::{Photo, PhotoUpdate},
};
use crate::services::{
    access,
    photo_service::{UploadBatchOutcome, UploadFile},
};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SetCoverRequest {
    pub photo_url: String,
}

/// `POST /api/admin/galleries`
pub async fn create_gallery(
    _auth: AdminAuth,
    State(state): State<AppState>,
    Json(draft): Json<GalleryDraft>,
) -> Result<(StatusCode, Json<Gallery>), AppError> {
    if draft.name.trim().is_empty() {
        return Err(AppError::bad_request("gallery name must not be empty"));
    }
    let gallery = state.repo.create(draft).await?;
    Ok((StatusCode::CREATED, Json(gallery)))
}

/// `GET /api/admin/galleries` — every gallery, secrets included.
pub async fn list_galleries(
    _auth: AdminAuth,
    State(state): State<AppState>,
) -> Result<Json<Vec<Gallery>>, AppError> {
    let galleries = state.repo.list().await?;
    Ok(Json(galleries))
}

/// `GET /api/admin/galleries/{id}`
pub async fn get_gallery(
    _auth: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Gallery>, AppError> {
    let gallery = state.repo.get_by_id(id).await?;
    Ok(Json(gallery))
}

/// `PATCH /api/admin/galleries/{id}`
pub async fn update_gallery(
    _auth: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(changes): Json<GalleryUpdate>,
) -> Result<Json<Gallery>, AppError> {
    let gallery = state.repo.update(id, changes).await?;
    Ok(Json(gallery))
}

/// `DELETE /api/admin/galleries/{id}` — storage objects first (best-effort),
/// then the record, which cascades photo rows.
pub async fn delete_gallery(
    _auth: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.photos.delete_gallery(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/admin/galleries/{id}/photos`
pub async fn list_gallery_photos(
    _auth: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Photo>>, AppError> {
    // Surface a 404 for an unknown gallery rather than an empty list.
    state.repo.get_by_id(id).await?;
    let photos = state.repo.list_by_gallery(id).await?;
    Ok(Json(photos))
}

/// `POST /api/admin/galleries/{id}/photos` — multipart batch upload.
///
/// Always responds 200 with a partition into uploaded photos and per-file
/// errors; individual file failures never fail the batch.
pub async fn upload_photos(
    _auth: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<UploadBatchOutcome>, AppError> {
    state.repo.get_by_id(id).await?;

    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(format!("malformed multipart body: {err}")))?
    {
        let filename = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| "photo.jpg".to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|err| AppError::bad_request(format!("failed to read `{filename}`: {err}")))?;
        files.push(UploadFile { filename, bytes });
    }

    if files.is_empty() {
        return Err(AppError::bad_request("no files in upload"));
    }

    let outcome = state
        .photos
        .upload_batch(id, files, |p| {
            tracing::debug!(gallery_id = %id, progress = p, "upload batch progress");
        })
        .await;
    Ok(Json(outcome))
}

/// `POST /api/admin/galleries/{id}/cover` — direct field write, not
/// validated against current photo membership.
pub async fn set_cover(
    _auth: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SetCoverRequest>,
) -> Result<Json<Gallery>, AppError> {
    let gallery = state
        .repo
        .update(
            id,
            GalleryUpdate {
                cover_photo: Some(request.photo_url),
                ..Default::default()
            },
        )
        .await?;
    Ok(Json(gallery))
}

/// `POST /api/admin/galleries/{id}/secret` — generate and commit a fresh
/// secret, returning the updated gallery.
pub async fn regenerate_secret(
    _auth: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Gallery>, AppError> {
    let secret = access::generate_secret(access::DEFAULT_SECRET_LENGTH);
    let gallery = state
        .repo
        .update(
            id,
            GalleryUpdate {
                secret: Some(secret),
                ..Default::default()
            },
        )
        .await?;
    Ok(Json(gallery))
}

/// `PATCH /api/admin/photos/{id}` — caption and sort order only.
pub async fn update_photo(
    _auth: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(changes): Json<PhotoUpdate>,
) -> Result<Json<Photo>, AppError> {
    let photo = state.repo.update_photo(id, changes).await?;
    Ok(Json(photo))
}

/// `DELETE /api/admin/photos/{id}` — storage object (best-effort), record,
/// then the counter decrement.
pub async fn delete_photo(
    _auth: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.photos.delete_photo(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
