//! Client-facing orchestration flows over the repository, storage, and
//! archive services: the gated gallery view and the admin editing session.

pub mod admin_edit;
pub mod gallery_view;
