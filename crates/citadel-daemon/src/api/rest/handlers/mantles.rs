//! Mantle delegation handlers

use crate::api::rest::state::AppState;
use crate::auth::AuthUser;
use crate::error::ApiResult;
use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use citadel_core::{MantleStatus, MantleView};
use citadel_types::UserId;
use serde::{Deserialize, Serialize};

/// Grant request
#[derive(Debug, Deserialize)]
pub struct GrantMantleRequest {
    pub heir_id: UserId,
    pub duration_hours: i64,
}

/// Grant response
#[derive(Debug, Serialize)]
pub struct GrantMantleResponse {
    pub status: String,
    pub end_time: DateTime<Utc>,
}

/// Grant (or re-grant) the Protector's Mantle. Genuine Protector only.
pub async fn grant_mantle(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<GrantMantleRequest>,
) -> ApiResult<Json<GrantMantleResponse>> {
    let mantle = state
        .engine
        .grant_mantle(&user.id, &request.heir_id, request.duration_hours)
        .await?;

    tracing::info!(heir = %request.heir_id, end_time = %mantle.end_time, "granted mantle");

    Ok(Json(GrantMantleResponse {
        status: format!("Mantle granted until {}", mantle.end_time.to_rfc3339()),
        end_time: mantle.end_time,
    }))
}

/// Revoke request
#[derive(Debug, Deserialize)]
pub struct RevokeMantleRequest {
    pub heir_id: UserId,
}

/// Revoke response
#[derive(Debug, Serialize)]
pub struct RevokeMantleResponse {
    pub status: String,
}

/// Revoke a Mantle. Genuine Protector only.
pub async fn revoke_mantle(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<RevokeMantleRequest>,
) -> ApiResult<Json<RevokeMantleResponse>> {
    state
        .engine
        .revoke_mantle(&user.id, &request.heir_id)
        .await?;

    tracing::info!(heir = %request.heir_id, "revoked mantle");

    Ok(Json(RevokeMantleResponse {
        status: "Mantle revoked".to_string(),
    }))
}

/// The caller's own Mantle status (live activity check).
pub async fn mantle_status(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<MantleStatus>> {
    Ok(Json(state.engine.mantle_status(&user.id).await?))
}

/// List active Mantles. Genuine Protector only.
pub async fn list_mantles(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<MantleView>>> {
    Ok(Json(state.engine.list_mantles(&user.id).await?))
}
