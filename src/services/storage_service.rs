//! src/services/storage_service.rs
//!
//! StorageService — object storage for photo payloads, backed by local disk
//! beneath `base_path/{bucket}/{path}`. Metadata lives in the `photos` table,
//! not here; this service only moves bytes and issues public URLs. Uploads
//! never overwrite an existing object.

use async_trait::async_trait;
use bytes::Bytes;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object `{0}` not found")]
    ObjectNotFound(String),
    #[error("object `{0}` already exists")]
    ObjectAlreadyExists(String),
    #[error("invalid object path")]
    InvalidObjectPath,
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// A freshly stored object: its path within the bucket and the public URL
/// issued for it.
#[derive(Clone, Debug)]
pub struct StoredObject {
    pub path: String,
    pub public_url: String,
    pub size_bytes: i64,
    pub etag: String,
}

/// The slice of storage the upload pipeline consumes. Fronted by a trait so
/// tests can script per-call success and failure.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `bytes` at `path`. Fails if an object already exists there.
    async fn put_object(&self, path: &str, bytes: Bytes) -> StorageResult<StoredObject>;

    /// Best-effort batch removal. Returns how many objects were removed;
    /// failures are logged and never propagate.
    async fn remove_objects(&self, paths: &[String]) -> usize;

    /// The public URL an object at `path` is reachable under.
    fn public_url(&self, path: &str) -> String;

    /// Translate a public URL back to its object path: locate the bucket
    /// segment and take the remainder, falling back to the last two path
    /// segments. `None` when the URL cannot be parsed at all.
    fn resolve_public_url(&self, url: &str) -> Option<String>;
}

const MAX_OBJECT_PATH_LEN: usize = 1024;

/// Disk-backed [`ObjectStore`].
#[derive(Clone)]
pub struct StorageService {
    /// Bucket name; the segment under which objects are addressed publicly.
    pub bucket: String,

    /// Base directory on disk where object payloads are stored.
    pub base_path: PathBuf,

    /// Base URL prefixed onto issued public URLs.
    pub public_base_url: String,
}

impl StorageService {
    pub fn new(
        bucket: impl Into<String>,
        base_path: impl Into<PathBuf>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            base_path: base_path.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Basic path validation to avoid trivial traversal vectors.
    ///
    /// Rejects paths that begin with `/` or contain `..`.
    fn ensure_path_safe(&self, path: &str) -> StorageResult<()> {
        if path.is_empty() || path.len() > MAX_OBJECT_PATH_LEN {
            return Err(StorageError::InvalidObjectPath);
        }
        if path.starts_with('/') || path.contains("..") {
            return Err(StorageError::InvalidObjectPath);
        }
        if path
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
        {
            return Err(StorageError::InvalidObjectPath);
        }
        Ok(())
    }

    fn bucket_root(&self) -> PathBuf {
        self.base_path.join(&self.bucket)
    }

    /// Construct the on-disk payload path for an object.
    fn object_disk_path(&self, path: &str) -> PathBuf {
        self.bucket_root().join(path)
    }

    async fn write_object(&self, path: &str, bytes: Bytes) -> StorageResult<StoredObject> {
        self.ensure_path_safe(path)?;
        let file_path = self.object_disk_path(path);

        if fs::try_exists(&file_path).await? {
            return Err(StorageError::ObjectAlreadyExists(path.to_string()));
        }

        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            StorageError::Io(io::Error::other("object path missing parent directory"))
        })?;
        fs::create_dir_all(&parent).await?;

        // Write to a temp file, fsync, then rename into place so a crashed
        // upload never leaves a half-written object at the final path.
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;
        if let Err(err) = file.write_all(&bytes).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::Io(err));
        }
        if let Err(err) = file.flush().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::Io(err));
        }
        if let Err(err) = file.sync_all().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::Io(err));
        }
        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::Io(err));
        }

        Ok(StoredObject {
            path: path.to_string(),
            public_url: self.issue_public_url(path),
            size_bytes: bytes.len() as i64,
            etag: format!("{:x}", md5::compute(&bytes)),
        })
    }

    fn issue_public_url(&self, path: &str) -> String {
        format!("{}/storage/{}/{}", self.public_base_url, self.bucket, path)
    }

    /// Open an object for reading and report its size, ready for streaming
    /// out of a handler.
    pub async fn open_object(&self, path: &str) -> StorageResult<(File, u64)> {
        self.ensure_path_safe(path)?;
        let file_path = self.object_disk_path(path);
        let file = File::open(&file_path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                StorageError::ObjectNotFound(path.to_string())
            } else {
                StorageError::Io(err)
            }
        })?;
        let len = file.metadata().await?.len();
        Ok((file, len))
    }

    async fn remove_one(&self, path: &str) -> bool {
        if self.ensure_path_safe(path).is_err() {
            warn!(path, "skipping removal of invalid object path");
            return false;
        }
        let file_path = self.object_disk_path(path);
        let removed = match fs::remove_file(&file_path).await {
            Ok(()) => {
                debug!("removed object {}", file_path.display());
                true
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("object {} already missing", file_path.display());
                false
            }
            Err(err) => {
                warn!("failed to remove object {}: {}", file_path.display(), err);
                false
            }
        };

        if let Some(parent) = file_path.parent() {
            self.prune_empty_dirs(parent).await;
        }
        removed
    }

    /// Remove empty directories upward until the bucket root.
    ///
    /// Stops at the first non-empty or missing directory.
    async fn prune_empty_dirs(&self, start: &Path) {
        let stop = self.bucket_root();
        let mut current = start.to_path_buf();
        while current.starts_with(&stop) && current != stop {
            match fs::remove_dir(&current).await {
                Ok(()) => match current.parent() {
                    Some(parent) => current = parent.to_path_buf(),
                    None => break,
                },
                Err(err)
                    if matches!(
                        err.kind(),
                        ErrorKind::NotFound | ErrorKind::DirectoryNotEmpty
                    ) =>
                {
                    break;
                }
                Err(err) => {
                    debug!("failed to prune directory {}: {}", current.display(), err);
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl ObjectStore for StorageService {
    async fn put_object(&self, path: &str, bytes: Bytes) -> StorageResult<StoredObject> {
        self.write_object(path, bytes).await
    }

    async fn remove_objects(&self, paths: &[String]) -> usize {
        let mut removed = 0;
        for path in paths {
            if self.remove_one(path).await {
                removed += 1;
            }
        }
        removed
    }

    fn public_url(&self, path: &str) -> String {
        self.issue_public_url(path)
    }

    fn resolve_public_url(&self, url: &str) -> Option<String> {
        let parsed = Url::parse(url).ok()?;
        let segments: Vec<&str> = parsed.path_segments()?.filter(|s| !s.is_empty()).collect();

        if let Some(idx) = segments.iter().position(|s| *s == self.bucket) {
            let rest = &segments[idx + 1..];
            if rest.is_empty() {
                return None;
            }
            return Some(rest.join("/"));
        }

        // Best-effort guess when the bucket segment is absent.
        if segments.len() >= 2 {
            return Some(segments[segments.len() - 2..].join("/"));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> StorageService {
        StorageService::new("photos", dir.path(), "http://localhost:3000/")
    }

    #[tokio::test]
    async fn put_writes_bytes_and_issues_url() {
        let dir = TempDir::new().unwrap();
        let storage = service(&dir);

        let stored = storage
            .put_object("g1/123-abc.jpg", Bytes::from_static(b"jpeg bytes"))
            .await
            .unwrap();

        assert_eq!(stored.path, "g1/123-abc.jpg");
        assert_eq!(
            stored.public_url,
            "http://localhost:3000/storage/photos/g1/123-abc.jpg"
        );
        assert_eq!(stored.size_bytes, 10);

        let on_disk = tokio::fs::read(dir.path().join("photos/g1/123-abc.jpg"))
            .await
            .unwrap();
        assert_eq!(on_disk, b"jpeg bytes");
    }

    #[tokio::test]
    async fn put_rejects_existing_object() {
        let dir = TempDir::new().unwrap();
        let storage = service(&dir);

        storage
            .put_object("g1/dup.jpg", Bytes::from_static(b"one"))
            .await
            .unwrap();
        let second = storage
            .put_object("g1/dup.jpg", Bytes::from_static(b"two"))
            .await;
        assert!(matches!(second, Err(StorageError::ObjectAlreadyExists(_))));

        let on_disk = tokio::fs::read(dir.path().join("photos/g1/dup.jpg"))
            .await
            .unwrap();
        assert_eq!(on_disk, b"one");
    }

    #[tokio::test]
    async fn put_rejects_unsafe_paths() {
        let dir = TempDir::new().unwrap();
        let storage = service(&dir);

        for path in ["", "/abs.jpg", "../escape.jpg", "g1/../../x.jpg"] {
            let result = storage.put_object(path, Bytes::from_static(b"x")).await;
            assert!(matches!(result, Err(StorageError::InvalidObjectPath)));
        }
    }

    #[tokio::test]
    async fn remove_objects_is_best_effort_and_prunes() {
        let dir = TempDir::new().unwrap();
        let storage = service(&dir);

        storage
            .put_object("g1/a.jpg", Bytes::from_static(b"a"))
            .await
            .unwrap();
        storage
            .put_object("g1/b.jpg", Bytes::from_static(b"b"))
            .await
            .unwrap();

        let removed = storage
            .remove_objects(&[
                "g1/a.jpg".to_string(),
                "g1/missing.jpg".to_string(),
                "g1/b.jpg".to_string(),
            ])
            .await;
        assert_eq!(removed, 2);

        // Gallery directory is pruned once empty; the bucket root stays.
        assert!(!dir.path().join("photos/g1").exists());
        assert!(dir.path().join("photos").exists());
    }

    #[tokio::test]
    async fn open_object_distinguishes_missing() {
        let dir = TempDir::new().unwrap();
        let storage = service(&dir);

        storage
            .put_object("g1/real.jpg", Bytes::from_static(b"real"))
            .await
            .unwrap();

        let (_, len) = storage.open_object("g1/real.jpg").await.unwrap();
        assert_eq!(len, 4);

        let missing = storage.open_object("g1/nope.jpg").await;
        assert!(matches!(missing, Err(StorageError::ObjectNotFound(_))));
    }

    #[test]
    fn resolve_finds_bucket_segment() {
        let dir = TempDir::new().unwrap();
        let storage = service(&dir);

        let path = storage
            .resolve_public_url("http://localhost:3000/storage/photos/g1/123-abc.jpg")
            .unwrap();
        assert_eq!(path, "g1/123-abc.jpg");
    }

    #[test]
    fn resolve_falls_back_to_last_two_segments() {
        let dir = TempDir::new().unwrap();
        let storage = service(&dir);

        let path = storage
            .resolve_public_url("https://cdn.example.com/media/g1/123-abc.jpg")
            .unwrap();
        assert_eq!(path, "g1/123-abc.jpg");
    }

    #[test]
    fn resolve_returns_none_for_garbage() {
        let dir = TempDir::new().unwrap();
        let storage = service(&dir);

        assert!(storage.resolve_public_url("not a url").is_none());
        assert!(storage.resolve_public_url("http://host/only").is_none());
    }
}
