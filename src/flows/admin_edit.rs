//! The authoring flow: load a gallery, buffer field edits until an explicit
//! save, upload and delete photos, set the cover.
//!
//! The edit buffer mirrors the gallery on load; nothing is persisted until
//! `save` commits it through the repository. Photo operations refresh the
//! gallery record afterwards so the denormalized counters stay visible.

use uuid::Uuid;

use crate::models::{
    gallery::{Gallery, GalleryUpdate, SessionType},
    photo::Photo,
};
use crate::services::{
    access,
    gallery_repository::{GalleryRepository, RepoError, RepoResult},
    photo_service::{PhotoService, UploadBatchOutcome, UploadFile},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminState {
    Loading,
    NotFound,
    Loaded,
}

/// Pending gallery field values, committed on save.
#[derive(Debug, Clone, Default)]
pub struct GalleryEdits {
    pub name: String,
    pub secret: String,
    pub client_email: Option<String>,
    pub session_type: SessionType,
    pub date_label: String,
    pub is_active: bool,
}

impl From<&Gallery> for GalleryEdits {
    fn from(gallery: &Gallery) -> Self {
        Self {
            name: gallery.name.clone(),
            secret: gallery.secret.clone(),
            client_email: gallery.client_email.clone(),
            session_type: gallery.session_type,
            date_label: gallery.date_label.clone(),
            is_active: gallery.is_active,
        }
    }
}

pub struct AdminEditFlow {
    repo: GalleryRepository,
    photo_service: PhotoService,
    state: AdminState,
    gallery: Option<Gallery>,
    photos: Vec<Photo>,
    pub edits: GalleryEdits,
}

impl AdminEditFlow {
    pub fn new(repo: GalleryRepository, photo_service: PhotoService) -> Self {
        Self {
            repo,
            photo_service,
            state: AdminState::Loading,
            gallery: None,
            photos: Vec::new(),
            edits: GalleryEdits::default(),
        }
    }

    pub fn state(&self) -> &AdminState {
        &self.state
    }

    pub fn gallery(&self) -> Option<&Gallery> {
        self.gallery.as_ref()
    }

    pub fn photos(&self) -> &[Photo] {
        &self.photos
    }

    /// Load the gallery and its photos. A missing gallery lands in NotFound;
    /// backend failures bubble to the caller.
    pub async fn load(&mut self, id: Uuid) -> RepoResult<()> {
        match self.repo.get_by_id(id).await {
            Ok(gallery) => {
                self.photos = self.repo.list_by_gallery(gallery.id).await?;
                self.edits = GalleryEdits::from(&gallery);
                self.gallery = Some(gallery);
                self.state = AdminState::Loaded;
                Ok(())
            }
            Err(RepoError::GalleryNotFound(_)) => {
                self.state = AdminState::NotFound;
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Commit the edit buffer.
    pub async fn save(&mut self) -> RepoResult<()> {
        let Some(gallery) = &self.gallery else {
            return Ok(());
        };
        let updated = self
            .repo
            .update(
                gallery.id,
                GalleryUpdate {
                    name: Some(self.edits.name.clone()),
                    secret: Some(self.edits.secret.clone()),
                    client_email: Some(self.edits.client_email.clone().unwrap_or_default()),
                    session_type: Some(self.edits.session_type),
                    date_label: Some(self.edits.date_label.clone()),
                    cover_photo: None,
                    is_active: Some(self.edits.is_active),
                },
            )
            .await?;
        self.gallery = Some(updated);
        Ok(())
    }

    /// Replace the buffered secret with a freshly generated one. Takes
    /// effect on the next save.
    pub fn regenerate_secret(&mut self) -> &str {
        self.edits.secret = access::generate_secret(access::DEFAULT_SECRET_LENGTH);
        &self.edits.secret
    }

    /// Upload a batch through the pipeline and refresh the gallery record
    /// for the updated count and cover.
    pub async fn upload_photos<F>(
        &mut self,
        files: Vec<UploadFile>,
        on_progress: F,
    ) -> RepoResult<UploadBatchOutcome>
    where
        F: FnMut(u8),
    {
        let Some(gallery) = &self.gallery else {
            return Ok(UploadBatchOutcome::default());
        };
        let outcome = self
            .photo_service
            .upload_batch(gallery.id, files, on_progress)
            .await;
        self.photos.extend(outcome.uploaded.iter().cloned());
        self.refresh_gallery().await?;
        Ok(outcome)
    }

    pub async fn delete_photo(&mut self, photo_id: Uuid) -> RepoResult<()> {
        self.photo_service.delete_photo(photo_id).await?;
        self.photos.retain(|photo| photo.id != photo_id);
        self.refresh_gallery().await
    }

    /// Point the cover at a photo URL. Deliberately not validated against
    /// current photo membership.
    pub async fn set_cover(&mut self, photo_url: &str) -> RepoResult<()> {
        let Some(gallery) = &self.gallery else {
            return Ok(());
        };
        let updated = self
            .repo
            .update(
                gallery.id,
                GalleryUpdate {
                    cover_photo: Some(photo_url.to_string()),
                    ..Default::default()
                },
            )
            .await?;
        self.gallery = Some(updated);
        Ok(())
    }

    /// Delete the gallery, its photo records, and its storage objects.
    /// Consumes the flow; there is nothing left to edit.
    pub async fn delete_gallery(self) -> RepoResult<()> {
        let Some(gallery) = self.gallery else {
            return Ok(());
        };
        self.photo_service.delete_gallery(gallery.id).await
    }

    async fn refresh_gallery(&mut self) -> RepoResult<()> {
        if let Some(gallery) = &self.gallery {
            self.gallery = Some(self.repo.get_by_id(gallery.id).await?);
        }
        Ok(())
    }
}
