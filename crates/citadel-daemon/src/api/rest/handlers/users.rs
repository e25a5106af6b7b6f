//! User account handlers

use crate::api::rest::state::AppState;
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use citadel_types::{EffectiveRole, Role, UserId};
use serde::{Deserialize, Serialize};

/// Account info exposed over the API
#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: UserId,
    pub username: String,
    pub display_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// List all accounts. Genuine Protector only.
pub async fn list_users(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<UserInfo>>> {
    let accounts = state.engine.list_accounts(&user.id).await?;
    Ok(Json(
        accounts
            .into_iter()
            .map(|a| UserInfo {
                id: a.id,
                username: a.username,
                display_name: a.display_name,
                role: a.role,
                created_at: a.created_at,
            })
            .collect(),
    ))
}

/// The caller's own account, with the effective role resolved live
#[derive(Debug, Serialize)]
pub struct CurrentUserResponse {
    pub id: UserId,
    pub username: String,
    pub display_name: String,
    pub role: Role,
    pub effective_role: Option<EffectiveRole>,
}

/// Get the calling user's account and effective role.
pub async fn current_user(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<CurrentUserResponse>> {
    let account = state.engine.account(&user.id).await?;
    let effective = state.engine.effective_role_for(Some(&user.id)).await?;

    Ok(Json(CurrentUserResponse {
        id: account.id,
        username: account.username,
        display_name: account.display_name,
        role: account.role,
        effective_role: effective,
    }))
}

/// Role change request. Only canonical role names are accepted here; the
/// deprecated `OVERLOOKER` alias is a read-path courtesy, not a write value.
#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: String,
}

/// Set a user's base role. HQ only.
pub async fn set_role(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(request): Json<SetRoleRequest>,
) -> ApiResult<Json<UserInfo>> {
    let target = UserId::parse(&id)
        .map_err(|_| ApiError::Validation(format!("invalid user id: {id}")))?;
    let role = Role::from_canonical(&request.role)
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let updated = state.engine.set_role(&user.id, &target, role).await?;
    Ok(Json(UserInfo {
        id: updated.id,
        username: updated.username,
        display_name: updated.display_name,
        role: updated.role,
        created_at: updated.created_at,
    }))
}
