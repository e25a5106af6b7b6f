//! Panic alert handlers

use crate::api::rest::state::AppState;
use crate::auth::AuthUser;
use crate::error::ApiResult;
use axum::{extract::State, Json};
use citadel_core::AlertView;
use citadel_types::AlertId;
use serde::{Deserialize, Serialize};

/// Panic request
#[derive(Debug, Deserialize, Default)]
pub struct PanicRequest {
    #[serde(default)]
    pub message: String,
}

/// Panic response
#[derive(Debug, Serialize)]
pub struct PanicResponse {
    pub status: String,
    pub alert_id: AlertId,
    /// True when the raiser's effective role triggered an immediate shutdown
    pub shutdown: bool,
}

/// Raise a panic alert. Allowed for every authenticated user; leadership is
/// notified, and a Protector-or-above raiser locks the site down.
pub async fn raise_panic(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<PanicRequest>,
) -> ApiResult<Json<PanicResponse>> {
    let outcome = state.engine.raise_panic(&user.id, &request.message).await?;

    tracing::warn!(raiser = %user.username, shutdown = outcome.shutdown, "panic raised");

    Ok(Json(PanicResponse {
        status: "ok".to_string(),
        alert_id: outcome.alert.id,
        shutdown: outcome.shutdown,
    }))
}

/// Unresolved alerts, newest first. Protector-or-above.
pub async fn panic_alerts(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<AlertView>>> {
    Ok(Json(state.engine.list_unresolved(&user.id).await?))
}

/// Resolve request
#[derive(Debug, Deserialize)]
pub struct ResolvePanicRequest {
    pub alert_id: AlertId,
}

/// Resolve response
#[derive(Debug, Serialize)]
pub struct ResolvePanicResponse {
    pub status: String,
}

/// Resolve one alert. Protector-or-above; already-resolved is a no-op.
pub async fn resolve_panic(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<ResolvePanicRequest>,
) -> ApiResult<Json<ResolvePanicResponse>> {
    let outcome = state
        .engine
        .resolve_panic(&user.id, &request.alert_id)
        .await?;

    Ok(Json(ResolvePanicResponse {
        status: if outcome.already_resolved {
            "already resolved".to_string()
        } else {
            "resolved".to_string()
        },
    }))
}
