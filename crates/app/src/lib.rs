#![forbid(unsafe_code)]

pub mod auth;
pub mod config;
pub mod error;
pub mod play;
pub mod routes;
pub mod state;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// The HTTP application with request tracing.
pub fn build_app(state: AppState) -> Router {
    routes::router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
