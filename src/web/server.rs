//! HTTP server: static pages, status endpoints and the event channel

use axum::{routing::get, Router};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use super::{handlers, websocket};
use crate::config::{AppConfig, ServerConfig};
use crate::relay::{Dispatcher, RelayState};
use crate::transport::Hub;

/// Shared state handed to every request handler
pub struct AppState {
    pub relay: Arc<RelayState>,
    pub hub: Arc<Hub>,
    pub dispatcher: Dispatcher<Hub>,
    pub idle_timeout: Option<Duration>,
}

impl AppState {
    pub fn new(config: &AppConfig) -> Self {
        let relay = Arc::new(RelayState::new(&config.relay));
        let hub = Arc::new(Hub::new(config.relay.client_queue_capacity));
        let dispatcher = Dispatcher::new(relay.clone(), hub.clone());

        Self {
            relay,
            hub,
            dispatcher,
            idle_timeout: config.server.idle_timeout(),
        }
    }
}

/// Build the application router
pub fn build_router(state: Arc<AppState>, config: &ServerConfig) -> Router {
    Router::new()
        .route("/status", get(handlers::get_status))
        .route("/api/status", get(handlers::get_server_status))
        .route("/health", get(handlers::health))
        .route("/ws", get(websocket::ws_handler))
        // `/`, `/mobile.html` and `/pc.html`
        .fallback_service(ServeDir::new(&config.static_dir))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Relay web server
pub struct WebServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl WebServer {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            config: config.server.clone(),
            state: Arc::new(AppState::new(config)),
        }
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone(), &self.config)
    }

    /// Bind and serve until Ctrl+C
    pub async fn run(self) -> crate::Result<()> {
        let listener = TcpListener::bind(self.config.socket_addr()).await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> crate::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.log_banner(listener.local_addr()?);

        axum::serve(
            listener,
            self.router()
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await?;

        tracing::info!("Relay server stopped");
        Ok(())
    }

    /// Run the server on a background task
    pub fn start_background(self) -> JoinHandle<crate::Result<()>> {
        tokio::spawn(self.run())
    }

    fn log_banner(&self, local: SocketAddr) {
        let status = self.state.relay.registry.get_status();
        let mark = |connected: bool| if connected { "yes" } else { "no" };

        tracing::info!("Audio relay listening on http://{}", local);
        tracing::info!("  Mobile page: http://localhost:{}/mobile.html", local.port());
        tracing::info!("  PC page:     http://localhost:{}/pc.html", local.port());
        tracing::info!(
            "  Mobile connected: {}, PC connected: {}",
            mark(status.mobile_connected),
            mark(status.pc_connected)
        );
        if self.config.debug {
            tracing::debug!(
                "Debug mode enabled, serving static files from {:?}",
                self.config.static_dir
            );
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
