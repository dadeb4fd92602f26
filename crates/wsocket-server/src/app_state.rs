//! Shared application state for the wsocket server.
//!
//! Built once at startup from a validated config and the application's
//! connection handler; never mutated per request.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use wsocket_core::error::Result;

use crate::config::ServerConfig;
use crate::dispatch::ConnectionHandler;
use crate::session::Timing;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: ServerConfig,
    timing: Timing,
    handler: Arc<dyn ConnectionHandler>,
    next_id: AtomicU64,
}

impl AppState {
    /// Build application state. Fails if the config does not validate.
    pub fn new(cfg: ServerConfig, handler: Arc<dyn ConnectionHandler>) -> Result<Self> {
        cfg.validate()?;
        let timing = cfg.server.timing();
        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                timing,
                handler,
                next_id: AtomicU64::new(1),
            }),
        })
    }

    pub fn cfg(&self) -> &ServerConfig {
        &self.inner.cfg
    }

    pub fn timing(&self) -> Timing {
        self.inner.timing
    }

    pub fn handler(&self) -> Arc<dyn ConnectionHandler> {
        Arc::clone(&self.inner.handler)
    }

    pub fn next_connection_id(&self) -> u64 {
        self.inner.next_id.fetch_add(1, Ordering::Relaxed)
    }
}
