//! Site state handlers

use crate::api::rest::state::AppState;
use crate::auth::AuthUser;
use crate::error::ApiResult;
use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Site status response
#[derive(Debug, Serialize)]
pub struct SiteStatusResponse {
    pub shutdown: bool,
    pub updated_at: DateTime<Utc>,
}

/// Read the site state. Allow-listed during shutdown so the frontend can
/// discover it and HQ can still log in.
pub async fn site_status(State(state): State<AppState>) -> ApiResult<Json<SiteStatusResponse>> {
    let site = state.engine.site_status().await?;
    Ok(Json(SiteStatusResponse {
        shutdown: site.is_shutdown,
        updated_at: site.updated_at,
    }))
}

/// Transition response
#[derive(Debug, Serialize)]
pub struct SiteTransitionResponse {
    pub status: String,
}

/// ONLINE → SHUTDOWN. Protector-or-above (acting counts); open panic alerts
/// are bulk-resolved by the transition.
pub async fn shutdown_site(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<SiteTransitionResponse>> {
    state.engine.shutdown(&user.id).await?;

    tracing::warn!(actor = %user.username, "site shutdown initiated");

    Ok(Json(SiteTransitionResponse {
        status: "shutdown".to_string(),
    }))
}

/// SHUTDOWN → ONLINE. Strictly base role HQ.
pub async fn bring_online(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<SiteTransitionResponse>> {
    state.engine.bring_online(&user.id).await?;

    tracing::info!(actor = %user.username, "site brought back online");

    Ok(Json(SiteTransitionResponse {
        status: "online".to_string(),
    }))
}
