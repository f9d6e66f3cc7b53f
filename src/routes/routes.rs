//! Defines routes for the public gallery API, the admin console API, and
//! object serving.
//!
//! ## Structure
//! - **Public endpoints**
//!   - `GET  /api/galleries` — active galleries, reduced fields
//!   - `GET  /api/galleries/{slug}` — one gallery's public metadata
//!   - `POST /api/galleries/{slug}/unlock` — secret check, returns photos
//!   - `GET  /api/galleries/{slug}/archive` — ZIP of every photo
//!   - `GET  /storage/{bucket}/{*path}` — stored object bytes
//!
//! - **Admin endpoints** (bearer session required)
//!   - gallery CRUD under `/api/admin/galleries`
//!   - multipart photo upload, cover selection, secret regeneration
//!   - photo caption/order edits and deletion under `/api/admin/photos`
//!
//! The wildcard `*path` allows nested object paths like `g1/123-abc.jpg`.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::handlers::{
    admin_handlers,
    auth_handlers::{login, logout, session},
    gallery_handlers::{download_archive, get_gallery, list_active_galleries, unlock_gallery},
    health_handlers::{healthz, readyz},
    storage_handlers::get_object,
};
use crate::state::AppState;

/// Uploads carry whole photo batches; allow well beyond the axum default.
const MAX_BODY_BYTES: usize = 100 * 1024 * 1024;

/// Build and return the router for all routes.
///
/// The router carries shared state (`AppState`) to all handlers.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // admin session endpoints
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/session", get(session))
        // public gallery endpoints
        .route("/api/galleries", get(list_active_galleries))
        .route("/api/galleries/{slug}", get(get_gallery))
        .route("/api/galleries/{slug}/unlock", post(unlock_gallery))
        .route("/api/galleries/{slug}/archive", get(download_archive))
        // admin console endpoints
        .route(
            "/api/admin/galleries",
            get(admin_handlers::list_galleries).post(admin_handlers::create_gallery),
        )
        .route(
            "/api/admin/galleries/{id}",
            get(admin_handlers::get_gallery)
                .patch(admin_handlers::update_gallery)
                .delete(admin_handlers::delete_gallery),
        )
        .route(
            "/api/admin/galleries/{id}/photos",
            get(admin_handlers::list_gallery_photos).post(admin_handlers::upload_photos),
        )
        .route(
            "/api/admin/galleries/{id}/cover",
            post(admin_handlers::set_cover),
        )
        .route(
            "/api/admin/galleries/{id}/secret",
            post(admin_handlers::regenerate_secret),
        )
        .route(
            "/api/admin/photos/{id}",
            axum::routing::patch(admin_handlers::update_photo).delete(admin_handlers::delete_photo),
        )
        // object serving
        .route("/storage/{bucket}/{*path}", get(get_object))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}
