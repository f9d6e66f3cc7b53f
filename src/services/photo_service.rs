//! Photo ingest and removal, orchestrating storage writes and repository
//! records.
//!
//! Upload batches run strictly one file at a time so progress is
//! deterministic and the gallery's denormalized counters see at most one
//! writer per batch. The batch itself never fails: every file is attempted
//! and the result is a partition into uploaded photos and per-file errors.

use bytes::Bytes;
use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::models::photo::{Photo, PhotoDraft};
use crate::services::{
    gallery_repository::{GalleryRepository, RepoError, RepoResult},
    progress_percentage,
    storage_service::{ObjectStore, StorageError},
};

/// One file handed to [`PhotoService::upload_batch`].
#[derive(Clone, Debug)]
pub struct UploadFile {
    pub filename: String,
    pub bytes: Bytes,
}

/// Why a single file in a batch failed.
#[derive(Debug, Error)]
enum UploadError {
    #[error("upload failed: {0}")]
    Storage(#[from] StorageError),
    #[error("failed to save photo record: {0}")]
    Record(#[from] RepoError),
}

#[derive(Clone, Debug, Serialize)]
pub struct UploadFailure {
    pub filename: String,
    pub error: String,
}

/// Outcome of a batch: exactly one entry across the two lists per input file.
#[derive(Debug, Default, Serialize)]
pub struct UploadBatchOutcome {
    pub uploaded: Vec<Photo>,
    pub failed: Vec<UploadFailure>,
}

const PATH_TOKEN_LEN: usize = 9;
const PATH_TOKEN_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Clone)]
pub struct PhotoService {
    repo: GalleryRepository,
    storage: Arc<dyn ObjectStore>,
}

impl PhotoService {
    pub fn new(repo: GalleryRepository, storage: Arc<dyn ObjectStore>) -> Self {
        Self { repo, storage }
    }

    /// Upload a batch of files into a gallery, sequentially.
    ///
    /// `on_progress` receives round(100 * completed / total) after every file,
    /// success or failure, so it is non-decreasing and hits 100 exactly when
    /// the last file has been attempted.
    pub async fn upload_batch<F>(
        &self,
        gallery_id: Uuid,
        files: Vec<UploadFile>,
        mut on_progress: F,
    ) -> UploadBatchOutcome
    where
        F: FnMut(u8),
    {
        let total = files.len();
        let mut outcome = UploadBatchOutcome::default();

        for (completed, file) in files.into_iter().enumerate() {
            match self.upload_one(gallery_id, &file).await {
                Ok(photo) => outcome.uploaded.push(photo),
                Err(err) => {
                    tracing::warn!(filename = %file.filename, error = %err, "file upload failed");
                    outcome.failed.push(UploadFailure {
                        filename: file.filename,
                        error: err.to_string(),
                    });
                }
            }
            on_progress(progress_percentage(completed + 1, total));
        }

        outcome
    }

    async fn upload_one(&self, gallery_id: Uuid, file: &UploadFile) -> Result<Photo, UploadError> {
        let path = object_path(gallery_id, &file.filename);
        let stored = self.storage.put_object(&path, file.bytes.clone()).await?;

        let draft = PhotoDraft {
            gallery_id,
            url: stored.public_url.clone(),
            storage_path: Some(stored.path.clone()),
            filename: file.filename.clone(),
            caption: None,
            sort_order: 0,
        };

        let photo = match self.repo.insert_photo(draft).await {
            Ok(photo) => photo,
            Err(err) => {
                // The object landed in storage but has no record; compensate.
                let removed = self.storage.remove_objects(&[stored.path.clone()]).await;
                if removed == 0 {
                    tracing::warn!(path = %stored.path, "compensating storage delete failed");
                }
                return Err(UploadError::Record(err));
            }
        };

        if let Err(err) = self.repo.record_photo_added(gallery_id, &photo.url).await {
            tracing::warn!(
                gallery_id = %gallery_id,
                error = %err,
                "failed to update gallery photo count"
            );
        }

        Ok(photo)
    }

    /// Remove a photo: best-effort storage delete, authoritative record
    /// delete, then the counter decrement.
    pub async fn delete_photo(&self, photo_id: Uuid) -> RepoResult<()> {
        let photo = self.repo.get_photo(photo_id).await?;

        match self.storage_path_for(&photo) {
            Some(path) => {
                self.storage.remove_objects(&[path]).await;
            }
            None => {
                tracing::warn!(photo_id = %photo.id, url = %photo.url, "could not resolve storage path");
            }
        }

        self.repo.delete_photo(photo_id).await?;

        if let Err(err) = self.repo.record_photo_removed(photo.gallery_id).await {
            tracing::warn!(
                gallery_id = %photo.gallery_id,
                error = %err,
                "failed to update gallery photo count"
            );
        }
        Ok(())
    }

    /// Remove a gallery and everything it owns: resolve every photo to a
    /// storage path (unresolvable entries are skipped), batch-remove the
    /// objects (failures logged, non-fatal), then delete the record, which
    /// cascades the photo rows.
    pub async fn delete_gallery(&self, gallery_id: Uuid) -> RepoResult<()> {
        let photos = self.repo.list_by_gallery(gallery_id).await?;
        let paths: Vec<String> = photos
            .iter()
            .filter_map(|photo| self.storage_path_for(photo))
            .collect();

        if !paths.is_empty() {
            let removed = self.storage.remove_objects(&paths).await;
            tracing::debug!(
                gallery_id = %gallery_id,
                removed,
                resolved = paths.len(),
                total = photos.len(),
                "removed gallery objects from storage"
            );
        }

        self.repo.delete(gallery_id).await
    }

    fn storage_path_for(&self, photo: &Photo) -> Option<String> {
        photo
            .storage_path
            .clone()
            .or_else(|| self.storage.resolve_public_url(&photo.url))
    }
}

/// Storage path for an upload: gallery id, upload instant, and a random
/// disambiguator, keeping the (lowercased) file extension.
fn object_path(gallery_id: Uuid, filename: &str) -> String {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| "jpg".to_string());
    format!(
        "{}/{}-{}.{}",
        gallery_id,
        Utc::now().timestamp_millis(),
        path_token(),
        ext
    )
}

fn path_token() -> String {
    let mut rng = rand::rng();
    (0..PATH_TOKEN_LEN)
        .map(|_| PATH_TOKEN_ALPHABET[rng.random_range(0..PATH_TOKEN_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::gallery::GalleryDraft;
    use crate::services::storage_service::{StorageResult, StoredObject};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::io;
    use std::str::FromStr;
    use std::sync::Mutex;

    /// Store whose per-call outcomes are scripted up front. Every successful
    /// put is remembered; removals are recorded for assertions.
    #[derive(Default)]
    struct ScriptedStore {
        put_failures: Mutex<VecDeque<bool>>,
        removed: Mutex<Vec<String>>,
    }

    impl ScriptedStore {
        fn failing_on(script: &[bool]) -> Self {
            Self {
                put_failures: Mutex::new(script.to_vec().into()),
                removed: Mutex::new(Vec::new()),
            }
        }

        fn removed_paths(&self) -> Vec<String> {
            self.removed.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ObjectStore for ScriptedStore {
        async fn put_object(&self, path: &str, bytes: Bytes) -> StorageResult<StoredObject> {
            let fail = self
                .put_failures
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(false);
            if fail {
                return Err(StorageError::Io(io::Error::other("disk full")));
            }
            Ok(StoredObject {
                path: path.to_string(),
                public_url: self.public_url(path),
                size_bytes: bytes.len() as i64,
                etag: format!("{:x}", md5::compute(&bytes)),
            })
        }

        async fn remove_objects(&self, paths: &[String]) -> usize {
            self.removed.lock().unwrap().extend_from_slice(paths);
            paths.len()
        }

        fn public_url(&self, path: &str) -> String {
            format!("http://store.test/storage/photos/{path}")
        }

        fn resolve_public_url(&self, url: &str) -> Option<String> {
            url.strip_prefix("http://store.test/storage/photos/")
                .map(str::to_string)
        }
    }

    async fn test_service(store: Arc<ScriptedStore>) -> (PhotoService, GalleryRepository) {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(
                sqlx::sqlite::SqliteConnectOptions::from_str("sqlite::memory:")
                    .unwrap()
                    .foreign_keys(true),
            )
            .await
            .unwrap();
        crate::db::run_migrations(&pool).await.unwrap();
        let repo = GalleryRepository::new(Arc::new(pool));
        (PhotoService::new(repo.clone(), store), repo)
    }

    fn files(names: &[&str]) -> Vec<UploadFile> {
        names
            .iter()
            .map(|name| UploadFile {
                filename: name.to_string(),
                bytes: Bytes::from_static(b"image bytes"),
            })
            .collect()
    }

    async fn make_gallery(repo: &GalleryRepository, name: &str) -> Uuid {
        repo.create(GalleryDraft {
            name: name.to_string(),
            ..Default::default()
        })
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn batch_yields_one_outcome_per_file_with_deterministic_progress() {
        let store = Arc::new(ScriptedStore::failing_on(&[false, true, false, true]));
        let (service, repo) = test_service(store).await;
        let gallery_id = make_gallery(&repo, "Mixed Batch").await;

        let mut progress = Vec::new();
        let outcome = service
            .upload_batch(
                gallery_id,
                files(&["a.jpg", "b.jpg", "c.png", "d.jpg"]),
                |p| progress.push(p),
            )
            .await;

        assert_eq!(outcome.uploaded.len(), 2);
        assert_eq!(outcome.failed.len(), 2);
        assert_eq!(outcome.failed[0].filename, "b.jpg");
        assert!(outcome.failed[0].error.contains("upload failed"));
        assert_eq!(progress, vec![25, 50, 75, 100]);

        let gallery = repo.get_by_id(gallery_id).await.unwrap();
        assert_eq!(gallery.photo_count, 2);
    }

    #[tokio::test]
    async fn first_successful_upload_claims_the_cover() {
        let store = Arc::new(ScriptedStore::default());
        let (service, repo) = test_service(store).await;
        let gallery_id = make_gallery(&repo, "Cover").await;

        let outcome = service
            .upload_batch(gallery_id, files(&["first.jpg", "second.jpg"]), |_| {})
            .await;
        assert_eq!(outcome.uploaded.len(), 2);

        let gallery = repo.get_by_id(gallery_id).await.unwrap();
        assert_eq!(gallery.photo_count, 2);
        assert_eq!(
            gallery.cover_photo.as_deref(),
            Some(outcome.uploaded[0].url.as_str())
        );
    }

    #[tokio::test]
    async fn upload_records_storage_path_and_extension() {
        let store = Arc::new(ScriptedStore::default());
        let (service, repo) = test_service(store).await;
        let gallery_id = make_gallery(&repo, "Paths").await;

        let outcome = service
            .upload_batch(gallery_id, files(&["IMG_0001.JPG", "noext"]), |_| {})
            .await;
        assert_eq!(outcome.uploaded.len(), 2);

        let first_path = outcome.uploaded[0].storage_path.as_deref().unwrap();
        assert!(first_path.starts_with(&format!("{gallery_id}/")));
        assert!(first_path.ends_with(".jpg"));
        let second_path = outcome.uploaded[1].storage_path.as_deref().unwrap();
        assert!(second_path.ends_with(".jpg"));
    }

    #[tokio::test]
    async fn record_insert_failure_compensates_with_storage_delete() {
        let store = Arc::new(ScriptedStore::default());
        let (service, _repo) = test_service(Arc::clone(&store)).await;

        // No such gallery: the storage write succeeds, the insert violates
        // the foreign key, and the orphaned object must be removed.
        let outcome = service
            .upload_batch(Uuid::new_v4(), files(&["orphan.jpg"]), |_| {})
            .await;

        assert!(outcome.uploaded.is_empty());
        assert_eq!(outcome.failed.len(), 1);
        assert!(outcome.failed[0].error.contains("failed to save photo record"));
        assert_eq!(store.removed_paths().len(), 1);
        assert!(store.removed_paths()[0].ends_with(".jpg"));
    }

    #[tokio::test]
    async fn empty_batch_reports_nothing() {
        let store = Arc::new(ScriptedStore::default());
        let (service, repo) = test_service(store).await;
        let gallery_id = make_gallery(&repo, "Empty").await;

        let mut calls = 0;
        let outcome = service
            .upload_batch(gallery_id, Vec::new(), |_| calls += 1)
            .await;
        assert!(outcome.uploaded.is_empty());
        assert!(outcome.failed.is_empty());
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn delete_photo_removes_object_record_and_count() {
        let store = Arc::new(ScriptedStore::default());
        let (service, repo) = test_service(Arc::clone(&store)).await;
        let gallery_id = make_gallery(&repo, "Delete One").await;

        let outcome = service
            .upload_batch(gallery_id, files(&["keep.jpg", "drop.jpg"]), |_| {})
            .await;
        let victim = outcome.uploaded[1].clone();

        service.delete_photo(victim.id).await.unwrap();

        assert!(
            store
                .removed_paths()
                .contains(victim.storage_path.as_ref().unwrap())
        );
        let gallery = repo.get_by_id(gallery_id).await.unwrap();
        assert_eq!(gallery.photo_count, 1);
        assert!(matches!(
            repo.get_photo(victim.id).await,
            Err(RepoError::PhotoNotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_photo_resolves_path_from_url_when_unrecorded() {
        let store = Arc::new(ScriptedStore::default());
        let (service, repo) = test_service(Arc::clone(&store)).await;
        let gallery_id = make_gallery(&repo, "Legacy Row").await;

        let photo = repo
            .insert_photo(PhotoDraft {
                gallery_id,
                url: "http://store.test/storage/photos/legacy/old.jpg".to_string(),
                storage_path: None,
                filename: "old.jpg".to_string(),
                caption: None,
                sort_order: 0,
            })
            .await
            .unwrap();

        service.delete_photo(photo.id).await.unwrap();
        assert_eq!(store.removed_paths(), vec!["legacy/old.jpg".to_string()]);
    }

    #[tokio::test]
    async fn delete_gallery_resolves_paths_and_cascades() {
        let store = Arc::new(ScriptedStore::default());
        let (service, repo) = test_service(Arc::clone(&store)).await;
        let gallery_id = make_gallery(&repo, "Full Delete").await;

        service
            .upload_batch(gallery_id, files(&["a.jpg", "b.jpg", "c.jpg"]), |_| {})
            .await;
        // A row whose URL cannot be resolved is excluded from removal.
        repo.insert_photo(PhotoDraft {
            gallery_id,
            url: "unparseable".to_string(),
            storage_path: None,
            filename: "x.jpg".to_string(),
            caption: None,
            sort_order: 0,
        })
        .await
        .unwrap();

        service.delete_gallery(gallery_id).await.unwrap();

        assert_eq!(store.removed_paths().len(), 3);
        assert!(matches!(
            repo.get_by_id(gallery_id).await,
            Err(RepoError::GalleryNotFound(_))
        ));
        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM photos WHERE gallery_id = ?")
            .bind(gallery_id)
            .fetch_one(&*repo.db)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }
}
