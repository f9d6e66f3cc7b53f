//! Bulk photo delivery: single fetch-and-save and on-the-fly ZIP assembly.
//!
//! Archive fetches fan out concurrently, one request per photo, and are
//! joined only at serialization time. A shared atomic counter drives the
//! progress callback as each fetch settles — success or failure — so the
//! caller always sees 100% once everything has been attempted. Photos whose
//! fetch fails are omitted from the archive and reported back in a skipped
//! list.

use bytes::Bytes;
use futures::future::join_all;
use serde::Serialize;
use std::{
    io::{Cursor, Write},
    path::PathBuf,
    sync::atomic::{AtomicUsize, Ordering},
};
use thiserror::Error;
use tokio::fs;
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use crate::models::photo::Photo;
use crate::services::progress_percentage;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("fetch failed for `{url}`: {source}")]
    Fetch {
        url: String,
        source: reqwest::Error,
    },
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("archive task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A photo left out of an archive because its fetch failed.
#[derive(Clone, Debug, Serialize)]
pub struct SkippedPhoto {
    /// Position in the input photo list.
    pub index: usize,
    /// The entry name the photo would have had.
    pub entry_name: String,
    pub reason: String,
}

/// A serialized archive ready to be saved or served.
#[derive(Debug)]
pub struct ArchiveBundle {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub entry_count: usize,
    pub skipped: Vec<SkippedPhoto>,
}

/// Where a saved archive (or single download) landed on disk.
#[derive(Debug)]
pub struct ArchiveOutcome {
    pub path: PathBuf,
    pub entry_count: usize,
    pub skipped: Vec<SkippedPhoto>,
}

const ZIP_COMPRESSION_LEVEL: i64 = 6;

#[derive(Clone)]
pub struct ArchiveBuilder {
    http: reqwest::Client,
    downloads_dir: PathBuf,
}

impl ArchiveBuilder {
    pub fn new(downloads_dir: impl Into<PathBuf>) -> Self {
        Self {
            http: reqwest::Client::new(),
            downloads_dir: downloads_dir.into(),
        }
    }

    /// Fetch one photo and save it under the downloads directory.
    pub async fn download_single(
        &self,
        url: &str,
        suggested_filename: &str,
    ) -> Result<PathBuf, ArchiveError> {
        let bytes = self.fetch_bytes(url).await?;
        fs::create_dir_all(&self.downloads_dir).await?;
        let path = self.downloads_dir.join(safe_file_name(suggested_filename));
        fs::write(&path, &bytes).await?;
        Ok(path)
    }

    /// Fetch every photo concurrently and assemble a DEFLATE-compressed ZIP
    /// in memory.
    ///
    /// Entry names are fixed by input order before any fetch completes, so
    /// completion order never affects naming. `on_progress` is invoked once
    /// per photo as its fetch settles, with a non-decreasing percentage that
    /// ends at 100.
    pub async fn build_archive<F>(
        &self,
        photos: &[Photo],
        gallery_name: &str,
        on_progress: F,
    ) -> Result<ArchiveBundle, ArchiveError>
    where
        F: Fn(u8),
    {
        let folder = sanitize_archive_name(gallery_name);
        let total = photos.len();
        let completed = AtomicUsize::new(0);

        let fetches = photos.iter().enumerate().map(|(index, photo)| {
            let completed = &completed;
            let on_progress = &on_progress;
            let entry_name = entry_name(index, photo);
            async move {
                let result = self.fetch_bytes(&photo.url).await;
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                on_progress(progress_percentage(done, total));
                (index, entry_name, result)
            }
        });
        let settled = join_all(fetches).await;

        let mut entries = Vec::with_capacity(total);
        let mut skipped = Vec::new();
        for (index, entry_name, result) in settled {
            match result {
                Ok(bytes) => entries.push((format!("{folder}/{entry_name}"), bytes)),
                Err(err) => {
                    tracing::warn!(index, entry_name = %entry_name, error = %err, "skipping photo in archive");
                    skipped.push(SkippedPhoto {
                        index,
                        entry_name,
                        reason: err.to_string(),
                    });
                }
            }
        }

        let entry_count = entries.len();
        let bytes = tokio::task::spawn_blocking(move || write_zip(entries)).await??;

        Ok(ArchiveBundle {
            file_name: format!("{folder}-photos.zip"),
            bytes,
            entry_count,
            skipped,
        })
    }

    /// Build the archive and save it under the downloads directory as
    /// `<sanitized name>-photos.zip`.
    pub async fn download_all_as_zip<F>(
        &self,
        photos: &[Photo],
        gallery_name: &str,
        on_progress: F,
    ) -> Result<ArchiveOutcome, ArchiveError>
    where
        F: Fn(u8),
    {
        let bundle = self.build_archive(photos, gallery_name, on_progress).await?;
        fs::create_dir_all(&self.downloads_dir).await?;
        let path = self.downloads_dir.join(&bundle.file_name);
        fs::write(&path, &bundle.bytes).await?;
        Ok(ArchiveOutcome {
            path,
            entry_count: bundle.entry_count,
            skipped: bundle.skipped,
        })
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Bytes, ArchiveError> {
        let fetch_err = |source| ArchiveError::Fetch {
            url: url.to_string(),
            source,
        };
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(fetch_err)?
            .error_for_status()
            .map_err(fetch_err)?;
        response.bytes().await.map_err(fetch_err)
    }
}

fn write_zip(entries: Vec<(String, Bytes)>) -> Result<Vec<u8>, ArchiveError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(ZIP_COMPRESSION_LEVEL));
    for (name, bytes) in entries {
        writer.start_file(name, options)?;
        writer.write_all(&bytes)?;
    }
    Ok(writer.finish()?.into_inner())
}

/// Archive entry name: 3-digit 1-based sequence, the caption (or "photo"),
/// and the extension from the stored filename ("jpg" when absent).
fn entry_name(index: usize, photo: &Photo) -> String {
    let label = photo
        .caption
        .as_deref()
        .filter(|caption| !caption.is_empty())
        .unwrap_or("photo");
    let ext = photo
        .filename
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
        .unwrap_or("jpg");
    format!("{:03}-{}.{}", index + 1, label, ext)
}

/// Replace every run of characters outside `[A-Za-z0-9]` with a single
/// hyphen. Used for both the archive folder and the zip's base filename.
pub fn sanitize_archive_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_hyphen = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_hyphen = false;
        } else if !last_hyphen {
            out.push('-');
            last_hyphen = true;
        }
    }
    out
}

fn safe_file_name(name: &str) -> String {
    name.replace(['/', '\\'], "-")
}
