//! Registration and token handlers

use crate::api::rest::state::AppState;
use crate::auth::{hash_password, verify_password};
use crate::error::{ApiError, ApiResult};
use axum::{extract::State, http::StatusCode, Json};
use citadel_types::{Role, UserId};
use serde::{Deserialize, Serialize};

/// Registration request
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub display_name: String,
}

/// Registration response
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub id: UserId,
    pub username: String,
    pub display_name: String,
    pub role: Role,
}

/// Create an account. New accounts start as OBSERVER; the role record is
/// provisioned here, synchronously.
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    if request.password.len() < 8 {
        return Err(ApiError::Validation(
            "password must be at least 8 characters".to_string(),
        ));
    }

    let hash = hash_password(&request.password)?;
    let account = state
        .engine
        .register_account(&request.username, &request.display_name, hash)
        .await?;

    tracing::info!(username = %account.username, "registered account");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: account.id,
            username: account.username,
            display_name: account.display_name,
            role: account.role,
        }),
    ))
}

/// Token request
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

/// Token response. Exposes the base role only — Mantle elevation is derived
/// per request, never baked into a token.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access: String,
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
}

/// Verify credentials and issue a token.
pub async fn obtain_token(
    State(state): State<AppState>,
    Json(request): Json<TokenRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let account = state
        .engine
        .account_by_username(&request.username)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("invalid credentials".to_string()))?;

    if !verify_password(&request.password, &account.password_hash)? {
        return Err(ApiError::Unauthorized("invalid credentials".to_string()));
    }

    let access = state
        .jwt
        .issue(account.id, &account.username, account.role)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(TokenResponse {
        access,
        user_id: account.id,
        username: account.username,
        role: account.role,
    }))
}
