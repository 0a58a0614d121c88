pub mod auth;
pub mod config;
pub mod logging;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
pub mod workers;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::state::AppState;

pub fn create_app(config: Config) -> axum::Router {
    build_router(AppState::new(config))
}

/// Router over an existing state, so the caller keeps a handle on its sessions.
pub fn build_router(state: AppState) -> axum::Router {
    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
