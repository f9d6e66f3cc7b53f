//! Represents a photo belonging to exactly one gallery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A single photo record.
///
/// The `url` is issued by storage at upload time and treated as immutable.
/// `storage_path` records the object path so deletion does not have to
/// reverse-parse the URL; older rows may lack it.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Photo {
    pub id: Uuid,

    /// Owning gallery. Cascade-deleted with it.
    pub gallery_id: Uuid,

    /// Public URL of the stored object.
    pub url: String,

    /// Storage object path recorded at upload time.
    pub storage_path: Option<String>,

    /// Original filename of the uploaded file.
    pub filename: String,

    /// Optional caption, also used for archive entry naming.
    pub caption: Option<String>,

    /// Manual ordering; ties resolved by creation time.
    pub sort_order: i64,

    pub created_at: DateTime<Utc>,
}

/// Input for inserting a photo record after a successful storage write.
#[derive(Clone, Debug)]
pub struct PhotoDraft {
    pub gallery_id: Uuid,
    pub url: String,
    pub storage_path: Option<String>,
    pub filename: String,
    pub caption: Option<String>,
    pub sort_order: i64,
}

/// Partial update for a photo; only caption and sort order are mutable.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct PhotoUpdate {
    pub caption: Option<String>,
    pub sort_order: Option<i64>,
}
