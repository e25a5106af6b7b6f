//! Site shutdown gate
//!
//! Middleware consulted before any route-level authorization. While the site
//! is SHUTDOWN, every API request outside a small allow-list is rejected 503
//! unless the caller's effective role is HQ.
//!
//! Failure to evaluate the gate itself (unreadable site state, a token that
//! cannot be parsed) fails OPEN: the request passes through and the route's
//! own authorization still applies. An absent token resolves to "no role"
//! and is blocked.

use crate::api::rest::state::AppState;
use crate::auth::bearer_token;
use crate::error::ApiError;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use citadel_types::{Role, UserId};

/// Paths reachable while SHUTDOWN: authentication, the status probe the
/// frontend polls, and daemon health.
const EXEMPT_PREFIXES: &[&str] = &["/api/v1/auth/"];
const EXEMPT_PATHS: &[&str] = &["/api/v1/site/status", "/api/v1/health"];

fn is_exempt(path: &str) -> bool {
    EXEMPT_PREFIXES.iter().any(|p| path.starts_with(p))
        || EXEMPT_PATHS.iter().any(|p| path == *p)
}

/// Axum middleware enforcing the gate.
pub async fn shutdown_gate(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let path = req.uri().path();
    if !path.starts_with("/api/") || is_exempt(path) {
        return next.run(req).await;
    }

    if blocks(&state, req.headers()).await {
        return ApiError::ShutdownActive.into_response();
    }
    next.run(req).await
}

/// Whether the gate blocks this request. Internal evaluation errors answer
/// "no" — fail open for the gate only.
async fn blocks(state: &AppState, headers: &HeaderMap) -> bool {
    let site = match state.engine.site_status().await {
        Ok(site) => site,
        Err(e) => {
            tracing::warn!(error = %e, "shutdown gate could not read site state");
            return false;
        }
    };
    if !site.is_shutdown {
        return false;
    }

    let identity = match gate_identity(state, headers) {
        Ok(identity) => identity,
        Err(()) => {
            // token present but unparseable; the route's own auth decides
            tracing::warn!("shutdown gate could not resolve caller identity");
            return false;
        }
    };

    match state.engine.effective_role_for(identity.as_ref()).await {
        Ok(Some(effective)) if effective.role == Role::Hq => false,
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(error = %e, "shutdown gate role resolution failed");
            false
        }
    }
}

/// Resolve the caller's identity for the gate. `Ok(None)` means no
/// credentials were presented; `Err` means credentials were presented but
/// could not be parsed.
fn gate_identity(state: &AppState, headers: &HeaderMap) -> Result<Option<UserId>, ()> {
    let Some(header) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let header = header.to_str().map_err(|_| ())?;
    let token = bearer_token(header).ok_or(())?;
    let claims = state.jwt.verify(token).map_err(|_| ())?;
    Ok(Some(claims.sub))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exempt_paths() {
        assert!(is_exempt("/api/v1/auth/token"));
        assert!(is_exempt("/api/v1/auth/register"));
        assert!(is_exempt("/api/v1/site/status"));
        assert!(is_exempt("/api/v1/health"));
        assert!(!is_exempt("/api/v1/site/shutdown"));
        assert!(!is_exempt("/api/v1/users"));
    }
}
