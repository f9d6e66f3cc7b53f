//! Liveness and readiness probes.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use bytes::Bytes;
use serde::Serialize;
use uuid::Uuid;

use crate::services::storage_service::ObjectStore;
use crate::state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: &'static str,
    database: CheckStatus,
    storage: CheckStatus,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl CheckStatus {
    fn pass() -> Self {
        Self {
            ok: true,
            error: None,
        }
    }

    fn fail(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
        }
    }
}

/// `GET /healthz` — cheap liveness, no I/O.
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

/// `GET /readyz` — readiness.
///
/// Verifies the gallery tables answer queries and that the object store can
/// complete a put/open/remove round-trip. 200 when both pass, 503 otherwise.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let database = match sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM galleries")
        .fetch_one(&*state.repo.db)
        .await
    {
        Ok(_) => CheckStatus::pass(),
        Err(err) => CheckStatus::fail(err.to_string()),
    };

    let storage = storage_round_trip(&state).await;

    let ready = database.ok && storage.ok;
    let body = ReadyResponse {
        status: if ready { "ok" } else { "error" },
        database,
        storage,
    };
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

/// Exercise the same storage operations uploads use: write an object, read
/// it back, remove it.
async fn storage_round_trip(state: &AppState) -> CheckStatus {
    let probe_path = format!(".readyz/{}", Uuid::new_v4());

    if let Err(err) = state
        .storage
        .put_object(&probe_path, Bytes::from_static(b"readyz"))
        .await
    {
        return CheckStatus::fail(format!("put failed: {err}"));
    }

    let read_back = state.storage.open_object(&probe_path).await;
    let removed = state.storage.remove_objects(&[probe_path.clone()]).await;

    match read_back {
        Ok((_, 6)) if removed == 1 => CheckStatus::pass(),
        Ok((_, 6)) => CheckStatus::fail("probe object could not be removed"),
        Ok((_, len)) => CheckStatus::fail(format!("probe object had length {len}, expected 6")),
        Err(err) => CheckStatus::fail(format!("open failed: {err}")),
    }
}
