//! API Router configuration

use super::handlers;
use super::state::AppState;
use crate::gate;
use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Health
        .route("/health", get(handlers::health_check))
        // Authentication
        .route("/auth/register", post(handlers::register))
        .route("/auth/token", post(handlers::obtain_token))
        // Users
        .route("/users", get(handlers::list_users))
        .route("/users/me", get(handlers::current_user))
        .route("/users/:id/role", put(handlers::set_role))
        // Mantle delegation
        .route("/mantles", get(handlers::list_mantles))
        .route("/mantles/grant", post(handlers::grant_mantle))
        .route("/mantles/revoke", post(handlers::revoke_mantle))
        .route("/mantles/status", get(handlers::mantle_status))
        // Panic
        .route("/panic", post(handlers::raise_panic))
        .route("/panic/alerts", get(handlers::panic_alerts))
        .route("/panic/resolve", post(handlers::resolve_panic))
        // Site state
        .route("/site/status", get(handlers::site_status))
        .route("/site/shutdown", post(handlers::shutdown_site))
        .route("/site/bring-online", post(handlers::bring_online))
        // Notifications
        .route("/notifications", get(handlers::list_notifications))
        .route(
            "/notifications/:id/read",
            post(handlers::mark_notification_read),
        )
        // Audit log
        .route("/audit", get(handlers::audit_log));

    // Build router with middleware; the shutdown gate runs before any
    // route-level authorization
    Router::new()
        .nest("/api/v1", api_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            gate::shutdown_gate,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
