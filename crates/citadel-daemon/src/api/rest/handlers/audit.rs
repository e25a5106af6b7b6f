//! Audit log handlers

use crate::api::rest::state::AppState;
use crate::auth::AuthUser;
use crate::error::ApiResult;
use axum::{extract::State, Json};
use citadel_types::AuditRecord;

/// The audit log, newest first. Genuine Protector only.
pub async fn audit_log(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<AuditRecord>>> {
    Ok(Json(state.engine.audit_log(&user.id).await?))
}
