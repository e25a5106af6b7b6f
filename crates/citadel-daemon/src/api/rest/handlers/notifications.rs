//! Notification handlers

use crate::api::rest::state::AppState;
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{Path, State},
    Json,
};
use citadel_types::{Notification, NotificationId};
use serde::Serialize;

/// The caller's notifications, newest first.
pub async fn list_notifications(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<Notification>>> {
    Ok(Json(state.engine.notifications_for(&user.id).await?))
}

/// Mark-read response
#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub status: String,
}

/// Mark one of the caller's notifications read.
pub async fn mark_notification_read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<MarkReadResponse>> {
    let id = NotificationId::parse(&id)
        .map_err(|_| ApiError::Validation(format!("invalid notification id: {id}")))?;

    state.engine.mark_notification_read(&user.id, &id).await?;
    Ok(Json(MarkReadResponse {
        status: "read".to_string(),
    }))
}
