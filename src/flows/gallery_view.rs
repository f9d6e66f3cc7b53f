//! The client-facing gallery flow.
//!
//! A viewing session moves Loading → {NotFound | Locked}, unlocks on a
//! correct secret, and stays Unlocked across download actions. A failed
//! verification keeps the session Locked with an error message; a failed
//! photo fetch after unlocking degrades to an empty list rather than
//! regressing the state.

use std::path::PathBuf;
use std::sync::{
    Arc,
    atomic::{AtomicU8, Ordering},
};

use crate::models::{gallery::Gallery, photo::Photo};
use crate::services::{
    access,
    archive_builder::{ArchiveBuilder, ArchiveError, ArchiveOutcome, sanitize_archive_name},
    gallery_repository::{GalleryRepository, RepoError},
};

const WRONG_SECRET_MESSAGE: &str = "Incorrect password. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    Loading,
    NotFound,
    Locked { error: Option<String> },
    Unlocked,
}

pub struct GalleryViewFlow {
    repo: GalleryRepository,
    archive: ArchiveBuilder,
    state: ViewState,
    gallery: Option<Gallery>,
    photos: Vec<Photo>,
    archive_in_flight: bool,
    archive_progress: Arc<AtomicU8>,
}

impl GalleryViewFlow {
    pub fn new(repo: GalleryRepository, archive: ArchiveBuilder) -> Self {
        Self {
            repo,
            archive,
            state: ViewState::Loading,
            gallery: None,
            photos: Vec::new(),
            archive_in_flight: false,
            archive_progress: Arc::new(AtomicU8::new(0)),
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn gallery(&self) -> Option<&Gallery> {
        self.gallery.as_ref()
    }

    pub fn photos(&self) -> &[Photo] {
        &self.photos
    }

    /// Fetch the gallery by slug. Any failure — missing or otherwise —
    /// presents as NotFound.
    pub async fn load(&mut self, slug: &str) {
        match self.repo.get_by_slug(slug).await {
            Ok(gallery) => {
                self.gallery = Some(gallery);
                self.state = ViewState::Locked { error: None };
            }
            Err(RepoError::GalleryNotFound(_)) => {
                self.state = ViewState::NotFound;
            }
            Err(err) => {
                tracing::error!(slug, error = %err, "failed to load gallery");
                self.state = ViewState::NotFound;
            }
        }
    }

    /// Check a submitted secret. Only meaningful while Locked.
    pub async fn submit_secret(&mut self, supplied: &str) {
        if !matches!(self.state, ViewState::Locked { .. }) {
            return;
        }
        let Some(gallery) = self.gallery.clone() else {
            return;
        };

        if access::verify_secret(&gallery, supplied) {
            self.photos = match self.repo.list_by_gallery(gallery.id).await {
                Ok(photos) => photos,
                Err(err) => {
                    tracing::error!(gallery_id = %gallery.id, error = %err, "failed to load photos");
                    Vec::new()
                }
            };
            self.state = ViewState::Unlocked;
        } else {
            self.state = ViewState::Locked {
                error: Some(WRONG_SECRET_MESSAGE.to_string()),
            };
        }
    }

    /// Save a single photo locally, named after the gallery and photo id.
    pub async fn download_photo(
        &self,
        photo: &Photo,
    ) -> Result<Option<PathBuf>, ArchiveError> {
        let Some(gallery) = &self.gallery else {
            return Ok(None);
        };
        let filename = format!("{}-{}.jpg", sanitize_archive_name(&gallery.name), photo.id);
        let path = self.archive.download_single(&photo.url, &filename).await?;
        Ok(Some(path))
    }

    /// Live percentage of an in-flight archive build, 0 when idle.
    pub fn archive_progress(&self) -> u8 {
        self.archive_progress.load(Ordering::Relaxed)
    }

    pub fn archive_in_flight(&self) -> bool {
        self.archive_in_flight
    }

    /// Build and save the whole-gallery archive. Returns `Ok(None)` when
    /// there is nothing to download or a build is already in flight.
    pub async fn download_all(&mut self) -> Result<Option<ArchiveOutcome>, ArchiveError> {
        if self.archive_in_flight || self.photos.is_empty() {
            return Ok(None);
        }
        let Some(gallery) = self.gallery.clone() else {
            return Ok(None);
        };

        self.archive_in_flight = true;
        self.archive_progress.store(0, Ordering::Relaxed);
        let progress = Arc::clone(&self.archive_progress);

        let result = self
            .archive
            .download_all_as_zip(&self.photos, &gallery.name, move |p| {
                progress.store(p, Ordering::Relaxed)
            })
            .await;

        self.archive_in_flight = false;
        self.archive_progress.store(0, Ordering::Relaxed);
        result.map(Some)
    }
}
