//! Admin authentication: email/secret sign-in against configured
//! credentials, with opaque bearer tokens held in memory.
//!
//! Failures are reported as a single generic message regardless of which
//! part of the credential was wrong, to avoid account enumeration.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("not signed in")]
    Unauthorized,
}

/// An active admin session.
#[derive(Clone, Debug, Serialize)]
pub struct AdminSession {
    pub token: String,
    pub email: String,
    pub signed_in_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AuthService {
    admin_email: String,
    admin_password: String,
    sessions: Arc<RwLock<HashMap<String, AdminSession>>>,
}

impl AuthService {
    pub fn new(admin_email: impl Into<String>, admin_password: impl Into<String>) -> Self {
        Self {
            admin_email: admin_email.into(),
            admin_password: admin_password.into(),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AdminSession, AuthError> {
        if email != self.admin_email || password != self.admin_password {
            return Err(AuthError::InvalidCredentials);
        }

        let session = AdminSession {
            token: Uuid::new_v4().to_string(),
            email: email.to_string(),
            signed_in_at: Utc::now(),
        };
        self.sessions
            .write()
            .await
            .insert(session.token.clone(), session.clone());
        Ok(session)
    }

    pub async fn sign_out(&self, token: &str) {
        self.sessions.write().await.remove(token);
    }

    pub async fn current_session(&self, token: &str) -> Option<AdminSession> {
        self.sessions.read().await.get(token).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sign_in_requires_both_credentials() {
        let auth = AuthService::new("studio@example.com", "hunter2hunter2");

        let wrong_email = auth.sign_in("other@example.com", "hunter2hunter2").await;
        assert!(matches!(wrong_email, Err(AuthError::InvalidCredentials)));

        let wrong_password = auth.sign_in("studio@example.com", "nope").await;
        assert!(matches!(wrong_password, Err(AuthError::InvalidCredentials)));

        let session = auth
            .sign_in("studio@example.com", "hunter2hunter2")
            .await
            .unwrap();
        assert_eq!(session.email, "studio@example.com");
        assert!(!session.token.is_empty());
    }

    #[tokio::test]
    async fn sessions_survive_until_sign_out() {
        let auth = AuthService::new("studio@example.com", "pw");
        let session = auth.sign_in("studio@example.com", "pw").await.unwrap();

        let looked_up = auth.current_session(&session.token).await.unwrap();
        assert_eq!(looked_up.email, session.email);

        auth.sign_out(&session.token).await;
        assert!(auth.current_session(&session.token).await.is_none());

        assert!(auth.current_session("bogus-token").await.is_none());
    }
}
