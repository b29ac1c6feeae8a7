//! Server roles.
//!
//! The authorization server and the resource server can run as separate
//! processes sharing a file-backed token store, or together in one process.

pub mod oauth;
pub mod transport;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;

use crate::config::Config;
use oauth::store::start_cleanup_task;
use oauth::{AuthorizationServer, ResourceGuard, TokenStore};

/// Owns the configuration and token store shared by the server roles.
pub struct OAuthServer {
    config: Config,
    store: Arc<dyn TokenStore>,
}

impl OAuthServer {
    #[must_use]
    pub fn new(config: Config, store: Arc<dyn TokenStore>) -> Self {
        Self { config, store }
    }

    /// Run the authorization server.
    ///
    /// Clears the token store on boot.
    ///
    /// # Errors
    ///
    /// Returns error on store or server failure.
    pub async fn run_auth(self, port: u16, base_url: Option<String>) -> anyhow::Result<()> {
        self.reset_store().await?;
        let base_url = base_url.unwrap_or_else(|| local_url(port));
        let timeout = self.config.request_timeout;
        let router = transport::create_auth_router(self.authorization_server(), base_url, timeout);

        tracing::info!(
            clients = self.config.registry.client_count(),
            resource_owners = self.config.registry.resource_owner_count(),
            token_ttl_secs = self.config.token_ttl.as_secs(),
            "Starting OAuth authorization server"
        );
        serve(router, port).await
    }

    /// Run the protected resource server.
    ///
    /// # Errors
    ///
    /// Returns error on server failure.
    pub async fn run_resource(
        self,
        port: u16,
        base_url: Option<String>,
        authorization_server: String,
    ) -> anyhow::Result<()> {
        let base_url = base_url.unwrap_or_else(|| local_url(port));
        let guard = ResourceGuard::new(Arc::clone(&self.store));
        let router = transport::create_resource_router(
            guard,
            base_url,
            authorization_server,
            self.config.request_timeout,
        );

        tracing::info!("Starting OAuth resource server");
        serve(router, port).await
    }

    /// Run both roles in one process.
    ///
    /// # Errors
    ///
    /// Returns error on store or server failure.
    pub async fn run_combined(self, port: u16, base_url: Option<String>) -> anyhow::Result<()> {
        self.reset_store().await?;
        let base_url = base_url.unwrap_or_else(|| local_url(port));
        let timeout = self.config.request_timeout;
        let router =
            transport::create_combined_router(self.authorization_server(), base_url, timeout);

        tracing::info!("Starting combined OAuth authorization and resource server");
        serve(router, port).await
    }

    /// Build the authorization core over this server's store.
    #[must_use]
    pub fn authorization_server(&self) -> AuthorizationServer {
        AuthorizationServer::new(&self.config, Arc::clone(&self.store))
    }

    async fn reset_store(&self) -> anyhow::Result<()> {
        self.store.clear().await?;
        tracing::debug!("Token store cleared");

        if let Some(every) = self.config.cleanup_interval {
            start_cleanup_task(Arc::clone(&self.store), every);
        }
        Ok(())
    }
}

impl std::fmt::Debug for OAuthServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthServer").field("config", &self.config).finish()
    }
}

fn local_url(port: u16) -> String {
    format!("http://localhost:{port}")
}

async fn serve(router: Router, port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("HTTP server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;

    tracing::info!("HTTP server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install CTRL+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
