pub mod admin_handlers;
pub mod auth_handlers;
pub mod gallery_handlers;
pub mod health_handlers;
pub mod storage_handlers;
