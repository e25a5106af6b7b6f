//! Server setup and lifecycle management

use crate::api::create_router;
use crate::api::rest::state::AppState;
use crate::auth::{hash_password, JwtKeys};
use crate::config::DaemonConfig;
use crate::error::{DaemonError, DaemonResult};
use crate::sweeper::Sweeper;
use citadel_core::{AuthorityEngine, MemoryStorage};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Password used for the HQ account when no bootstrap password is
/// configured. Deployments must override it.
const DEV_HQ_PASSWORD: &str = "ChangeMeNow!123";

/// Citadel daemon server
pub struct Server {
    config: DaemonConfig,
    engine: Arc<AuthorityEngine>,
    jwt: JwtKeys,
}

impl Server {
    /// Create a new server with the given configuration.
    ///
    /// Sets up the in-memory store, the authority engine, and the token
    /// keys, and ensures the HQ bootstrap account exists.
    pub async fn new(config: DaemonConfig) -> DaemonResult<Self> {
        let storage = Arc::new(MemoryStorage::new());
        let engine = Arc::new(AuthorityEngine::new(storage));

        let jwt = JwtKeys::new(&config.auth.jwt_secret, config.auth.token_expiry_secs)?;

        let hq_password = match &config.bootstrap.hq_password {
            Some(password) => password.clone(),
            None => {
                tracing::warn!(
                    "no HQ bootstrap password configured, using the development default"
                );
                DEV_HQ_PASSWORD.to_string()
            }
        };

        let hash = hash_password(&hq_password)
            .map_err(|e| DaemonError::Bootstrap(format!("failed to hash HQ password: {e}")))?;

        let hq = engine
            .ensure_hq_account(&config.bootstrap.hq_username, hash)
            .await
            .map_err(|e| DaemonError::Bootstrap(e.to_string()))?;

        tracing::info!(username = %hq.username, id = %hq.id, "HQ account ready");

        Ok(Self {
            config,
            engine,
            jwt,
        })
    }

    /// Run the server
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;

        let state = AppState::new(self.engine.clone(), self.jwt.clone());
        let app = create_router(state);

        let listener = TcpListener::bind(addr).await?;

        tracing::info!("citadel daemon listening on {}", addr);

        if self.config.sweeper.enabled {
            let sweeper = Sweeper::new(self.engine.clone(), self.config.sweeper.interval_secs);
            tokio::spawn(async move {
                sweeper.run().await;
            });
            tracing::info!(
                interval_secs = self.config.sweeper.interval_secs,
                "mantle sweeper started"
            );
        }

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| DaemonError::Server(e.to_string()))?;

        tracing::info!("citadel daemon shutting down");

        Ok(())
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
