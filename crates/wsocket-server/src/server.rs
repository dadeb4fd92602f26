//! Server entry: bind, serve the router, optionally shut down gracefully.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use wsocket_core::error::{Result, WsocketError};

use crate::app_state::AppState;
use crate::config::ServerConfig;
use crate::dispatch::ConnectionHandler;
use crate::router::build_router;

pub struct WsServer {
    state: AppState,
}

impl WsServer {
    pub fn new(cfg: ServerConfig, handler: impl ConnectionHandler) -> Result<Self> {
        Ok(Self {
            state: AppState::new(cfg, Arc::new(handler))?,
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// The router, for callers that add middleware layers of their own.
    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Bind `server.listen` and serve until the process stops.
    pub async fn start(self) -> Result<()> {
        let listen = self.state.cfg().server.listen.clone();
        let listener = TcpListener::bind(&listen)
            .await
            .map_err(|e| WsocketError::Internal(format!("bind {listen} failed: {e}")))?;
        self.serve(listener).await
    }

    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        self.serve_with_shutdown(listener, std::future::pending()).await
    }

    pub async fn serve_with_shutdown<F>(self, listener: TcpListener, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener
            .local_addr()
            .map_err(|e| WsocketError::Internal(format!("local_addr failed: {e}")))?;
        tracing::info!(%addr, "wsocket-server listening");

        let app = self.router();
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| WsocketError::Internal(format!("server failed: {e}")))
    }
}
