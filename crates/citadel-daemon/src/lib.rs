//! Citadel daemon library
//!
//! REST surface, authentication, the shutdown gate, and server lifecycle
//! around the citadel-core authority engine.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod gate;
pub mod server;
pub mod sweeper;

pub use config::DaemonConfig;
pub use error::{ApiError, ApiResult, DaemonError, DaemonResult};
pub use server::Server;

#[cfg(test)]
mod tests {
    use crate::api::create_router;
    use crate::api::rest::state::AppState;
    use crate::auth::{hash_password, JwtKeys};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use citadel_core::{AuthorityEngine, IdentityStorage, MemoryStorage};
    use citadel_types::{Role, UserId};
    use std::sync::Arc;
    use tower::ServiceExt;

    const TEST_SECRET: &str = "integration-test-secret-0123456789abcdef";
    const HQ_PASSWORD: &str = "hq-test-password-123";

    async fn test_app() -> (Router, Arc<AuthorityEngine>) {
        let storage = Arc::new(MemoryStorage::new());
        let engine = Arc::new(AuthorityEngine::new(storage));
        engine
            .ensure_hq_account("hq", hash_password(HQ_PASSWORD).unwrap())
            .await
            .unwrap();

        let jwt = JwtKeys::new(TEST_SECRET, 3600).unwrap();
        let app = create_router(AppState::new(engine.clone(), jwt));
        (app, engine)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn post_json(
        app: &Router,
        uri: &str,
        token: Option<&str>,
        payload: serde_json::Value,
    ) -> axum::response::Response {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        app.clone()
            .oneshot(builder.body(Body::from(payload.to_string())).unwrap())
            .await
            .unwrap()
    }

    async fn get(app: &Router, uri: &str, token: Option<&str>) -> axum::response::Response {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        app.clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    /// Register an account over HTTP and return its id.
    async fn register(app: &Router, username: &str) -> UserId {
        let response = post_json(
            app,
            "/api/v1/auth/register",
            None,
            serde_json::json!({ "username": username, "password": "a-strong-password" }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        UserId::parse(body["id"].as_str().unwrap()).unwrap()
    }

    async fn obtain_token(app: &Router, username: &str, password: &str) -> String {
        let response = post_json(
            app,
            "/api/v1/auth/token",
            None,
            serde_json::json!({ "username": username, "password": password }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        body["access"].as_str().unwrap().to_string()
    }

    /// Register an account and promote it directly in storage; returns
    /// (id, token). Promotion bypasses the HQ-only route on purpose so
    /// fixtures stay short.
    async fn registered_as(
        app: &Router,
        engine: &Arc<AuthorityEngine>,
        username: &str,
        role: Role,
    ) -> (UserId, String) {
        let id = register(app, username).await;
        if role != Role::Observer {
            engine.storage().set_role(&id, role).await.unwrap();
        }
        let token = obtain_token(app, username, "a-strong-password").await;
        (id, token)
    }

    #[tokio::test]
    async fn register_then_token_then_me() {
        let (app, _engine) = test_app().await;

        let response = post_json(
            &app,
            "/api/v1/auth/register",
            None,
            serde_json::json!({ "username": "vesper", "password": "a-strong-password" }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["role"], "OBSERVER");

        let token = obtain_token(&app, "vesper", "a-strong-password").await;
        let response = get(&app, "/api/v1/users/me", Some(&token)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["username"], "vesper");
        assert_eq!(body["effective_role"]["role"], "OBSERVER");
        assert_eq!(body["effective_role"]["acting"], false);
    }

    #[tokio::test]
    async fn short_password_is_rejected() {
        let (app, _engine) = test_app().await;
        let response = post_json(
            &app,
            "/api/v1/auth/register",
            None,
            serde_json::json!({ "username": "vesper", "password": "short" }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let (app, _engine) = test_app().await;
        register(&app, "vesper").await;
        let response = post_json(
            &app,
            "/api/v1/auth/token",
            None,
            serde_json::json!({ "username": "vesper", "password": "not-the-password" }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized() {
        let (app, _engine) = test_app().await;
        let response = get(&app, "/api/v1/users/me", None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn granted_mantle_elevates_heir_per_request() {
        let (app, engine) = test_app().await;
        let (_pid, protector) = registered_as(&app, &engine, "warden", Role::Protector).await;
        let (heir_id, heir) = registered_as(&app, &engine, "kestrel", Role::Heir).await;

        let response = post_json(
            &app,
            "/api/v1/mantles/grant",
            Some(&protector),
            serde_json::json!({ "heir_id": heir_id, "duration_hours": 1 }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = get(&app, "/api/v1/mantles/status", Some(&heir)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["is_active"], true);

        // the token still carries HEIR; elevation comes from the ledger
        let response = get(&app, "/api/v1/users/me", Some(&heir)).await;
        let body = body_json(response).await;
        assert_eq!(body["role"], "HEIR");
        assert_eq!(body["effective_role"]["role"], "PROTECTOR");
        assert_eq!(body["effective_role"]["acting"], true);
    }

    #[tokio::test]
    async fn observer_cannot_grant_or_shutdown() {
        let (app, engine) = test_app().await;
        let (_oid, observer) = registered_as(&app, &engine, "vesper", Role::Observer).await;
        let (heir_id, _heir) = registered_as(&app, &engine, "kestrel", Role::Heir).await;

        let response = post_json(
            &app,
            "/api/v1/mantles/grant",
            Some(&observer),
            serde_json::json!({ "heir_id": heir_id, "duration_hours": 1 }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = post_json(
            &app,
            "/api/v1/site/shutdown",
            Some(&observer),
            serde_json::json!({}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn shutdown_gates_everyone_but_hq() {
        let (app, engine) = test_app().await;
        let (_pid, protector) = registered_as(&app, &engine, "warden", Role::Protector).await;
        let (_oid, observer) = registered_as(&app, &engine, "vesper", Role::Observer).await;
        let hq = obtain_token(&app, "hq", HQ_PASSWORD).await;

        let response = post_json(
            &app,
            "/api/v1/site/shutdown",
            Some(&protector),
            serde_json::json!({}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        // non-HQ holders are turned away before route authorization
        let response = get(&app, "/api/v1/users/me", Some(&observer)).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let response = get(&app, "/api/v1/users/me", Some(&protector)).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        // HQ passes
        let response = get(&app, "/api/v1/users/me", Some(&hq)).await;
        assert_eq!(response.status(), StatusCode::OK);

        // allow-listed endpoints stay reachable without a token
        let response = get(&app, "/api/v1/site/status", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["shutdown"], true);
        let response = get(&app, "/api/v1/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);

        // login keeps working so HQ can authenticate during the lockout
        let response = post_json(
            &app,
            "/api/v1/auth/token",
            None,
            serde_json::json!({ "username": "hq", "password": HQ_PASSWORD }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn tokenless_request_is_gated_during_shutdown() {
        let (app, engine) = test_app().await;
        let (_pid, protector) = registered_as(&app, &engine, "warden", Role::Protector).await;
        post_json(
            &app,
            "/api/v1/site/shutdown",
            Some(&protector),
            serde_json::json!({}),
        )
        .await;

        let response = get(&app, "/api/v1/users/me", None).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn malformed_token_fails_open_to_route_auth() {
        let (app, engine) = test_app().await;
        let (_pid, protector) = registered_as(&app, &engine, "warden", Role::Protector).await;
        post_json(
            &app,
            "/api/v1/site/shutdown",
            Some(&protector),
            serde_json::json!({}),
        )
        .await;

        // an unverifiable token is not a gate concern: the request falls
        // through and the route's own 401 applies
        let response = get(&app, "/api/v1/users/me", Some("garbage")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn acting_protector_cannot_bring_site_online() {
        let (app, engine) = test_app().await;
        let (_pid, protector) = registered_as(&app, &engine, "warden", Role::Protector).await;
        let (heir_id, heir) = registered_as(&app, &engine, "kestrel", Role::Heir).await;
        let hq = obtain_token(&app, "hq", HQ_PASSWORD).await;

        post_json(
            &app,
            "/api/v1/mantles/grant",
            Some(&protector),
            serde_json::json!({ "heir_id": heir_id, "duration_hours": 1 }),
        )
        .await;
        post_json(
            &app,
            "/api/v1/site/shutdown",
            Some(&protector),
            serde_json::json!({}),
        )
        .await;

        // the acting Protector is still gated like any non-HQ holder
        let response = post_json(
            &app,
            "/api/v1/site/bring-online",
            Some(&heir),
            serde_json::json!({}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        // the genuine Protector reaches the route during shutdown only via
        // the gate's HQ bypass, which it fails; HQ succeeds
        let response = post_json(
            &app,
            "/api/v1/site/bring-online",
            Some(&hq),
            serde_json::json!({}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = get(&app, "/api/v1/users/me", Some(&heir)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn protector_panic_locks_the_site_down() {
        let (app, engine) = test_app().await;
        let (_pid, protector) = registered_as(&app, &engine, "warden", Role::Protector).await;

        let response = post_json(
            &app,
            "/api/v1/panic",
            Some(&protector),
            serde_json::json!({ "message": "breach in sector 4" }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["shutdown"], true);

        let response = get(&app, "/api/v1/site/status", None).await;
        let body = body_json(response).await;
        assert_eq!(body["shutdown"], true);
    }

    #[tokio::test]
    async fn observer_panic_leaves_site_online() {
        let (app, engine) = test_app().await;
        let (_oid, observer) = registered_as(&app, &engine, "vesper", Role::Observer).await;

        let response = post_json(
            &app,
            "/api/v1/panic",
            Some(&observer),
            serde_json::json!({ "message": "suspicious visitor" }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["shutdown"], false);

        let response = get(&app, "/api/v1/site/status", None).await;
        let body = body_json(response).await;
        assert_eq!(body["shutdown"], false);
    }

    #[tokio::test]
    async fn set_role_accepts_canonical_names_only() {
        let (app, engine) = test_app().await;
        let (oid, _observer) = registered_as(&app, &engine, "vesper", Role::Observer).await;
        let hq = obtain_token(&app, "hq", HQ_PASSWORD).await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri(format!("/api/v1/users/{oid}/role"))
                    .header("content-type", "application/json")
                    .header("authorization", format!("Bearer {hq}"))
                    .body(Body::from(
                        serde_json::json!({ "role": "OVERLOOKER" }).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri(format!("/api/v1/users/{oid}/role"))
                    .header("content-type", "application/json")
                    .header("authorization", format!("Bearer {hq}"))
                    .body(Body::from(
                        serde_json::json!({ "role": "HEIR" }).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["role"], "HEIR");
    }

    #[tokio::test]
    async fn shutdown_resolves_open_alerts() {
        let (app, engine) = test_app().await;
        let (_oid, observer) = registered_as(&app, &engine, "vesper", Role::Observer).await;
        let (_pid, protector) = registered_as(&app, &engine, "warden", Role::Protector).await;
        let hq = obtain_token(&app, "hq", HQ_PASSWORD).await;

        post_json(
            &app,
            "/api/v1/panic",
            Some(&observer),
            serde_json::json!({ "message": "odd noise" }),
        )
        .await;

        let response = get(&app, "/api/v1/panic/alerts", Some(&protector)).await;
        let body = body_json(response).await;
        assert_eq!(body.as_array().unwrap().len(), 1);

        post_json(
            &app,
            "/api/v1/site/shutdown",
            Some(&protector),
            serde_json::json!({}),
        )
        .await;

        // open alerts were swept into the shutdown
        let response = get(&app, "/api/v1/panic/alerts", Some(&hq)).await;
        let body = body_json(response).await;
        assert_eq!(body.as_array().unwrap().len(), 0);
    }
}
