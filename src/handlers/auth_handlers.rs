//! Admin sign-in, sign-out, and session lookup, plus the bearer-token
//! extractor the admin handlers gate on.

use axum::{
    Json,
    extract::{FromRequestParts, State},
    http::{StatusCode, request::Parts},
};
use serde::Deserialize;

use crate::errors::AppError;
use crate::services::auth_service::{AdminSession, AuthError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Authenticated admin extracted from an `Authorization: Bearer <token>`
/// header. Use as an extractor parameter in any handler that requires an
/// admin session.
#[derive(Debug, Clone)]
pub struct AdminAuth(pub AdminSession);

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or(AuthError::Unauthorized)?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::Unauthorized)?;

        let session = state
            .auth
            .current_session(token)
            .await
            .ok_or(AuthError::Unauthorized)?;

        Ok(AdminAuth(session))
    }
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AdminSession>, AppError> {
    let session = state.auth.sign_in(&request.email, &request.password).await?;
    Ok(Json(session))
}

/// `POST /api/auth/logout`
pub async fn logout(auth: AdminAuth, State(state): State<AppState>) -> StatusCode {
    state.auth.sign_out(&auth.0.token).await;
    StatusCode::NO_CONTENT
}

/// `GET /api/auth/session`
pub async fn session(auth: AdminAuth) -> Json<AdminSession> {
    Json(auth.0)
}
