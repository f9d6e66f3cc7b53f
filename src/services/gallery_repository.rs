//! src/services/gallery_repository.rs
//!
//! GalleryRepository — data access for galleries and their photos, backed by
//! SQLite. This file is a pure data-access layer: no storage I/O happens
//! here. Photo-object cleanup around deletes is orchestrated by
//! `PhotoService`, which calls back into this repository for the
//! authoritative record operations.

use chrono::Utc;
use sqlx::{QueryBuilder, SqlitePool, sqlite::Sqlite};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    gallery::{Gallery, GalleryDraft, GallerySummary, GalleryUpdate},
    photo::{Photo, PhotoDraft, PhotoUpdate},
};
use crate::services::access;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("gallery `{0}` not found")]
    GalleryNotFound(String),
    #[error("photo `{0}` not found")]
    PhotoNotFound(Uuid),
    #[error("gallery slug `{0}` already exists")]
    SlugConflict(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;

const GALLERY_COLUMNS: &str = "id, name, slug, secret, client_email, session_type, date_label, \
     cover_photo, photo_count, is_active, created_at, updated_at";

const PHOTO_COLUMNS: &str =
    "id, gallery_id, url, storage_path, filename, caption, sort_order, created_at";

/// Repository over the `galleries` and `photos` tables.
///
/// Not-found surfaces as a distinct variant so callers can render a dedicated
/// empty state; every other backend failure wraps the sqlx cause.
#[derive(Clone)]
pub struct GalleryRepository {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
}

impl GalleryRepository {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Create a gallery from a draft.
    ///
    /// The slug is derived from the name once, here, and never changes.
    /// A missing secret is generated at the default length; a missing date
    /// label becomes the "<Month> <Year>" rendering of the creation instant.
    pub async fn create(&self, draft: GalleryDraft) -> RepoResult<Gallery> {
        let now = Utc::now();
        let slug = access::generate_slug(&draft.name);
        let secret = match draft.secret {
            Some(secret) if !secret.is_empty() => secret,
            _ => access::generate_secret(access::DEFAULT_SECRET_LENGTH),
        };
        let date_label = match draft.date_label {
            Some(label) if !label.is_empty() => label,
            _ => now.format("%B %Y").to_string(),
        };

        let insert = sqlx::query_as::<_, Gallery>(
            "INSERT INTO galleries (id, name, slug, secret, client_email, session_type, \
             date_label, cover_photo, photo_count, is_active, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, NULL, 0, 1, ?, ?) \
             RETURNING id, name, slug, secret, client_email, session_type, date_label, \
             cover_photo, photo_count, is_active, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(&draft.name)
        .bind(&slug)
        .bind(&secret)
        .bind(&draft.client_email)
        .bind(draft.session_type.unwrap_or_default())
        .bind(&date_label)
        .bind(now)
        .bind(now)
        .fetch_one(&*self.db)
        .await;

        match insert {
            Ok(gallery) => Ok(gallery),
            Err(err) if is_unique_violation(&err) => Err(RepoError::SlugConflict(slug)),
            Err(err) => Err(RepoError::Sqlx(err)),
        }
    }

    /// All galleries, newest first. Admin-facing: includes secrets.
    pub async fn list(&self) -> RepoResult<Vec<Gallery>> {
        let rows = sqlx::query_as::<_, Gallery>(&format!(
            "SELECT {GALLERY_COLUMNS} FROM galleries ORDER BY created_at DESC"
        ))
        .fetch_all(&*self.db)
        .await?;
        Ok(rows)
    }

    /// Active galleries with a reduced field set, newest first.
    pub async fn list_active(&self) -> RepoResult<Vec<GallerySummary>> {
        let rows = sqlx::query_as::<_, GallerySummary>(
            "SELECT id, name, slug, date_label, session_type, cover_photo, photo_count \
             FROM galleries WHERE is_active = 1 ORDER BY created_at DESC",
        )
        .fetch_all(&*self.db)
        .await?;
        Ok(rows)
    }

    pub async fn get_by_slug(&self, slug: &str) -> RepoResult<Gallery> {
        sqlx::query_as::<_, Gallery>(&format!(
            "SELECT {GALLERY_COLUMNS} FROM galleries WHERE slug = ?"
        ))
        .bind(slug)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => RepoError::GalleryNotFound(slug.to_string()),
            other => RepoError::Sqlx(other),
        })
    }

    pub async fn get_by_id(&self, id: Uuid) -> RepoResult<Gallery> {
        sqlx::query_as::<_, Gallery>(&format!(
            "SELECT {GALLERY_COLUMNS} FROM galleries WHERE id = ?"
        ))
        .bind(id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => RepoError::GalleryNotFound(id.to_string()),
            other => RepoError::Sqlx(other),
        })
    }

    /// Apply a partial update and stamp `updated_at`.
    ///
    /// `None` fields are left untouched. An empty `client_email` clears the
    /// column. The slug is never part of an update.
    pub async fn update(&self, id: Uuid, changes: GalleryUpdate) -> RepoResult<Gallery> {
        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE galleries SET updated_at = ");
        builder.push_bind(Utc::now());
        if let Some(name) = &changes.name {
            builder.push(", name = ");
            builder.push_bind(name);
        }
        if let Some(secret) = &changes.secret {
            builder.push(", secret = ");
            builder.push_bind(secret);
        }
        if let Some(email) = &changes.client_email {
            builder.push(", client_email = ");
            if email.is_empty() {
                builder.push_bind(None::<String>);
            } else {
                builder.push_bind(email);
            }
        }
        if let Some(session_type) = changes.session_type {
            builder.push(", session_type = ");
            builder.push_bind(session_type);
        }
        if let Some(label) = &changes.date_label {
            builder.push(", date_label = ");
            builder.push_bind(label);
        }
        if let Some(cover) = &changes.cover_photo {
            builder.push(", cover_photo = ");
            builder.push_bind(cover);
        }
        if let Some(active) = changes.is_active {
            builder.push(", is_active = ");
            builder.push_bind(active);
        }
        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(" RETURNING ");
        builder.push(GALLERY_COLUMNS);

        builder
            .build_query_as::<Gallery>()
            .fetch_optional(&*self.db)
            .await?
            .ok_or_else(|| RepoError::GalleryNotFound(id.to_string()))
    }

    /// Delete the gallery record. The database cascades photo-row deletion;
    /// storage cleanup is the caller's concern.
    pub async fn delete(&self, id: Uuid) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM galleries WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepoError::GalleryNotFound(id.to_string()));
        }
        Ok(())
    }

    /// Record a successful photo upload against the denormalized gallery
    /// fields: bump the count and claim the cover slot if it is still empty.
    /// A single statement, so overlapping writers cannot lose updates.
    pub async fn record_photo_added(&self, gallery_id: Uuid, photo_url: &str) -> RepoResult<()> {
        let result = sqlx::query(
            "UPDATE galleries SET photo_count = photo_count + 1, \
             cover_photo = COALESCE(cover_photo, ?), updated_at = ? WHERE id = ?",
        )
        .bind(photo_url)
        .bind(Utc::now())
        .bind(gallery_id)
        .execute(&*self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepoError::GalleryNotFound(gallery_id.to_string()));
        }
        Ok(())
    }

    /// Decrement the photo count after a deletion, floored at zero.
    pub async fn record_photo_removed(&self, gallery_id: Uuid) -> RepoResult<()> {
        let result = sqlx::query(
            "UPDATE galleries SET photo_count = MAX(photo_count - 1, 0), updated_at = ? \
             WHERE id = ?",
        )
        .bind(Utc::now())
        .bind(gallery_id)
        .execute(&*self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepoError::GalleryNotFound(gallery_id.to_string()));
        }
        Ok(())
    }

    /// Photos for a gallery, by sort order then creation time ascending.
    pub async fn list_by_gallery(&self, gallery_id: Uuid) -> RepoResult<Vec<Photo>> {
        let rows = sqlx::query_as::<_, Photo>(&format!(
            "SELECT {PHOTO_COLUMNS} FROM photos WHERE gallery_id = ? \
             ORDER BY sort_order ASC, created_at ASC"
        ))
        .bind(gallery_id)
        .fetch_all(&*self.db)
        .await?;
        Ok(rows)
    }

    pub async fn get_photo(&self, photo_id: Uuid) -> RepoResult<Photo> {
        sqlx::query_as::<_, Photo>(&format!("SELECT {PHOTO_COLUMNS} FROM photos WHERE id = ?"))
            .bind(photo_id)
            .fetch_one(&*self.db)
            .await
            .map_err(|err| match err {
                sqlx::Error::RowNotFound => RepoError::PhotoNotFound(photo_id),
                other => RepoError::Sqlx(other),
            })
    }

    pub async fn insert_photo(&self, draft: PhotoDraft) -> RepoResult<Photo> {
        let photo = sqlx::query_as::<_, Photo>(
            "INSERT INTO photos (id, gallery_id, url, storage_path, filename, caption, \
             sort_order, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             RETURNING id, gallery_id, url, storage_path, filename, caption, sort_order, \
             created_at",
        )
        .bind(Uuid::new_v4())
        .bind(draft.gallery_id)
        .bind(&draft.url)
        .bind(&draft.storage_path)
        .bind(&draft.filename)
        .bind(&draft.caption)
        .bind(draft.sort_order)
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await?;
        Ok(photo)
    }

    /// Update caption and/or sort order; nothing else on a photo is mutable.
    pub async fn update_photo(&self, photo_id: Uuid, changes: PhotoUpdate) -> RepoResult<Photo> {
        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE photos SET id = id");
        if let Some(caption) = &changes.caption {
            builder.push(", caption = ");
            builder.push_bind(caption);
        }
        if let Some(sort_order) = changes.sort_order {
            builder.push(", sort_order = ");
            builder.push_bind(sort_order);
        }
        builder.push(" WHERE id = ");
        builder.push_bind(photo_id);
        builder.push(" RETURNING ");
        builder.push(PHOTO_COLUMNS);

        builder
            .build_query_as::<Photo>()
            .fetch_optional(&*self.db)
            .await?
            .ok_or(RepoError::PhotoNotFound(photo_id))
    }

    pub async fn delete_photo(&self, photo_id: Uuid) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM photos WHERE id = ?")
            .bind(photo_id)
            .execute(&*self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepoError::PhotoNotFound(photo_id));
        }
        Ok(())
    }
}

/// Return true if SQLx error indicates a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::gallery::SessionType;
    use std::str::FromStr;

    async fn test_repo() -> GalleryRepository {
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
        GalleryRepository::new(Arc::new(pool))
    }

    fn draft(name: &str) -> GalleryDraft {
        GalleryDraft {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn photo_draft(gallery_id: Uuid, url: &str, filename: &str) -> PhotoDraft {
        PhotoDraft {
            gallery_id,
            url: url.to_string(),
            storage_path: None,
            filename: filename.to_string(),
            caption: None,
            sort_order: 0,
        }
    }

    #[tokio::test]
    async fn create_applies_defaults() {
        let repo = test_repo().await;
        let gallery = repo.create(draft("Kathy & Scotty")).await.unwrap();

        assert!(gallery.slug.starts_with("kathy-scotty-"));
        assert_eq!(gallery.secret.len(), access::DEFAULT_SECRET_LENGTH);
        assert_eq!(gallery.session_type, SessionType::Wedding);
        assert!(!gallery.date_label.is_empty());
        assert_eq!(gallery.photo_count, 0);
        assert!(gallery.cover_photo.is_none());
        assert!(gallery.is_active);
    }

    #[tokio::test]
    async fn get_by_slug_distinguishes_missing_from_failure() {
        let repo = test_repo().await;
        let gallery = repo.create(draft("Jones Family")).await.unwrap();

        let found = repo.get_by_slug(&gallery.slug).await.unwrap();
        assert_eq!(found.id, gallery.id);

        let missing = repo.get_by_slug("no-such-slug").await;
        assert!(matches!(missing, Err(RepoError::GalleryNotFound(_))));

        let missing = repo.get_by_id(Uuid::new_v4()).await;
        assert!(matches!(missing, Err(RepoError::GalleryNotFound(_))));
    }

    #[tokio::test]
    async fn list_returns_newest_first() {
        let repo = test_repo().await;
        let first = repo.create(draft("First")).await.unwrap();
        let second = repo.create(draft("Second")).await.unwrap();

        let all = repo.list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, second.id);
        assert_eq!(all[1].id, first.id);
    }

    #[tokio::test]
    async fn list_active_filters_and_reduces() {
        let repo = test_repo().await;
        let shown = repo.create(draft("Shown")).await.unwrap();
        let hidden = repo.create(draft("Hidden")).await.unwrap();
        repo.update(
            hidden.id,
            GalleryUpdate {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let active = repo.list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, shown.id);
        assert_eq!(active[0].slug, shown.slug);
    }

    #[tokio::test]
    async fn update_is_partial_and_never_touches_slug() {
        let repo = test_repo().await;
        let gallery = repo.create(draft("Original Name")).await.unwrap();

        let updated = repo
            .update(
                gallery.id,
                GalleryUpdate {
                    name: Some("Renamed".to_string()),
                    date_label: Some("July 2026".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.date_label, "July 2026");
        assert_eq!(updated.slug, gallery.slug);
        assert_eq!(updated.secret, gallery.secret);
        assert!(updated.updated_at >= gallery.updated_at);

        let missing = repo.update(Uuid::new_v4(), GalleryUpdate::default()).await;
        assert!(matches!(missing, Err(RepoError::GalleryNotFound(_))));
    }

    #[tokio::test]
    async fn empty_client_email_clears_column() {
        let repo = test_repo().await;
        let gallery = repo
            .create(GalleryDraft {
                name: "With Email".to_string(),
                client_email: Some("client@example.com".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(gallery.client_email.as_deref(), Some("client@example.com"));

        let cleared = repo
            .update(
                gallery.id,
                GalleryUpdate {
                    client_email: Some(String::new()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(cleared.client_email.is_none());
    }

    #[tokio::test]
    async fn counters_bump_and_claim_cover_once() {
        let repo = test_repo().await;
        let gallery = repo.create(draft("Counters")).await.unwrap();

        repo.record_photo_added(gallery.id, "http://s/photos/a.jpg")
            .await
            .unwrap();
        repo.record_photo_added(gallery.id, "http://s/photos/b.jpg")
            .await
            .unwrap();

        let gallery = repo.get_by_id(gallery.id).await.unwrap();
        assert_eq!(gallery.photo_count, 2);
        assert_eq!(gallery.cover_photo.as_deref(), Some("http://s/photos/a.jpg"));
    }

    #[tokio::test]
    async fn counter_decrement_floors_at_zero() {
        let repo = test_repo().await;
        let gallery = repo.create(draft("Floor")).await.unwrap();

        repo.record_photo_removed(gallery.id).await.unwrap();
        let gallery = repo.get_by_id(gallery.id).await.unwrap();
        assert_eq!(gallery.photo_count, 0);
    }

    #[tokio::test]
    async fn photos_order_by_sort_order_then_created_at() {
        let repo = test_repo().await;
        let gallery = repo.create(draft("Ordering")).await.unwrap();

        let a = repo
            .insert_photo(photo_draft(gallery.id, "http://s/photos/a.jpg", "a.jpg"))
            .await
            .unwrap();
        let b = repo
            .insert_photo(photo_draft(gallery.id, "http://s/photos/b.jpg", "b.jpg"))
            .await
            .unwrap();
        // Move b ahead of a.
        repo.update_photo(
            b.id,
            PhotoUpdate {
                caption: None,
                sort_order: Some(-1),
            },
        )
        .await
        .unwrap();

        let photos = repo.list_by_gallery(gallery.id).await.unwrap();
        assert_eq!(photos.len(), 2);
        assert_eq!(photos[0].id, b.id);
        assert_eq!(photos[1].id, a.id);
    }

    #[tokio::test]
    async fn photo_update_changes_caption_only_when_asked() {
        let repo = test_repo().await;
        let gallery = repo.create(draft("Caption")).await.unwrap();
        let photo = repo
            .insert_photo(photo_draft(gallery.id, "http://s/photos/c.jpg", "c.jpg"))
            .await
            .unwrap();

        let updated = repo
            .update_photo(
                photo.id,
                PhotoUpdate {
                    caption: Some("Cake".to_string()),
                    sort_order: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.caption.as_deref(), Some("Cake"));
        assert_eq!(updated.sort_order, photo.sort_order);
        assert_eq!(updated.url, photo.url);
    }

    #[tokio::test]
    async fn deleting_gallery_cascades_photo_rows() {
        let repo = test_repo().await;
        let gallery = repo.create(draft("Cascade")).await.unwrap();
        for i in 0..3 {
            repo.insert_photo(photo_draft(
                gallery.id,
                &format!("http://s/photos/{i}.jpg"),
                &format!("{i}.jpg"),
            ))
            .await
            .unwrap();
        }

        repo.delete(gallery.id).await.unwrap();

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM photos WHERE gallery_id = ?")
            .bind(gallery.id)
            .fetch_one(&*repo.db)
            .await
            .unwrap();
        assert_eq!(remaining, 0);

        let missing = repo.delete(gallery.id).await;
        assert!(matches!(missing, Err(RepoError::GalleryNotFound(_))));
    }

    #[tokio::test]
    async fn delete_photo_not_found_is_distinct() {
        let repo = test_repo().await;
        let missing = repo.delete_photo(Uuid::new_v4()).await;
        assert!(matches!(missing, Err(RepoError::PhotoNotFound(_))));
    }
}
