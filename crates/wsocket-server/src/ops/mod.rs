//! Operational HTTP endpoints.
//!
//! - health route: 200 with an empty body, independent of socket state

use axum::{http::StatusCode, response::IntoResponse};

pub async fn health() -> impl IntoResponse {
    StatusCode::OK
}
