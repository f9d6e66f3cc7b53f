pub mod access;
pub mod archive_builder;
pub mod auth_service;
pub mod gallery_repository;
pub mod photo_service;
pub mod storage_service;

/// Integer percentage for `completed` out of `total`, rounded half-up.
/// Callers guarantee `total > 0`.
pub(crate) fn progress_percentage(completed: usize, total: usize) -> u8 {
    ((completed as f64 / total as f64) * 100.0).round() as u8
}
