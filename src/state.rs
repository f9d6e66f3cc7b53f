//! Shared application state: explicitly constructed service handles, built
//! once at startup and injected into every handler. No service is reachable
//! through a global.

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::{
    archive_builder::ArchiveBuilder, auth_service::AuthService,
    gallery_repository::GalleryRepository, photo_service::PhotoService,
    storage_service::StorageService,
};

#[derive(Clone)]
pub struct AppState {
    pub repo: GalleryRepository,
    pub storage: StorageService,
    pub photos: PhotoService,
    pub archive: ArchiveBuilder,
    pub auth: AuthService,
}

impl AppState {
    pub fn new(db: Arc<SqlitePool>, cfg: &AppConfig) -> Self {
        let repo = GalleryRepository::new(db);
        let storage = StorageService::new(
            cfg.storage_bucket.clone(),
            cfg.storage_dir.clone(),
            cfg.public_base_url.clone(),
        );
        let photos = PhotoService::new(repo.clone(), Arc::new(storage.clone()));
        let archive = ArchiveBuilder::new(cfg.downloads_dir.clone());
        let auth = AuthService::new(cfg.admin_email.clone(), cfg.admin_password.clone());

        Self {
            repo,
            storage,
            photos,
            archive,
            auth,
        }
    }
}
