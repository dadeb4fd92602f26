//! Axum router wiring (HTTP -> WS upgrade).
//!
//! Exposes the upgrade route (any method) and the health route, both at the
//! paths from config.

use axum::{
    routing::{any, get},
    Router,
};

use crate::{app_state::AppState, ops, transport};

pub fn build_router(state: AppState) -> Router {
    let ws_path = state.cfg().server.ws_path.clone();
    let health_path = state.cfg().server.health_path.clone();

    Router::new()
        .route(&health_path, get(ops::health))
        .route(&ws_path, any(transport::ws::ws_upgrade))
        .with_state(state)
}
