//! Core data models for galleries and their photos.
//!
//! These entities map to database tables via `sqlx::FromRow` and serialize
//! naturally as JSON via `serde`.

pub mod gallery;
pub mod photo;
