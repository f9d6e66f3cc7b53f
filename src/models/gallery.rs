//! Represents a client gallery — a password-gated collection of photos.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The kind of photo session a gallery documents.
///
/// Stored as TEXT with the variant name verbatim.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, sqlx::Type)]
pub enum SessionType {
    #[default]
    Wedding,
    Engagement,
    Family,
    Maternity,
    Newborn,
    Portrait,
    Other,
}

/// A client gallery.
///
/// Galleries are unlocked client-side with a shared secret; the secret is
/// stored in plaintext and compared exactly. `photo_count` and `cover_photo`
/// are denormalized and maintained by the upload/delete paths.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Gallery {
    /// Internal UUID for DB indexing.
    pub id: Uuid,

    /// Display name shown to the client.
    pub name: String,

    /// Globally unique, URL-safe identifier. Immutable after creation.
    pub slug: String,

    /// Shared secret ("password") the client uses to unlock the gallery.
    pub secret: String,

    /// Optional contact email of the client the gallery belongs to.
    pub client_email: Option<String>,

    /// What kind of session this gallery documents.
    pub session_type: SessionType,

    /// Free-text date label (e.g. "June 2025").
    pub date_label: String,

    /// Denormalized URL of the cover photo, if one is set.
    pub cover_photo: Option<String>,

    /// Denormalized count of photos currently in the gallery. Never negative.
    pub photo_count: i64,

    /// Whether the gallery is shown on the public galleries page.
    pub is_active: bool,

    /// When this gallery was created.
    pub created_at: DateTime<Utc>,

    /// When this gallery was last modified.
    pub updated_at: DateTime<Utc>,
}

/// Reduced field set used for the public galleries listing. Never carries
/// the secret.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct GallerySummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub date_label: String,
    pub session_type: SessionType,
    pub cover_photo: Option<String>,
    pub photo_count: i64,
}

impl From<Gallery> for GallerySummary {
    fn from(gallery: Gallery) -> Self {
        Self {
            id: gallery.id,
            name: gallery.name,
            slug: gallery.slug,
            date_label: gallery.date_label,
            session_type: gallery.session_type,
            cover_photo: gallery.cover_photo,
            photo_count: gallery.photo_count,
        }
    }
}

/// Input for gallery creation. Missing fields fall back to defaults:
/// a generated secret, session type Wedding, and a "<Month> <Year>" date
/// label for the creation instant.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct GalleryDraft {
    pub name: String,
    pub secret: Option<String>,
    pub client_email: Option<String>,
    pub session_type: Option<SessionType>,
    pub date_label: Option<String>,
}

/// Partial update for a gallery. `None` fields are left untouched; an empty
/// `client_email` clears the column. The slug is never updatable.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct GalleryUpdate {
    pub name: Option<String>,
    pub secret: Option<String>,
    pub client_email: Option<String>,
    pub session_type: Option<SessionType>,
    pub date_label: Option<String>,
    pub cover_photo: Option<String>,
    pub is_active: Option<bool>,
}
