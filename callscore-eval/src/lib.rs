//! callscore-eval library interface
//!
//! Scoring pipeline, record store, services and HTTP API. The binary in
//! `main.rs` wires these to the command line.

pub mod api;
pub mod error;
pub mod loader;
pub mod models;
pub mod scoring;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use tower_http::trace::TraceLayer;

use crate::loader::FsStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Record store rooted at the configured root folder
    pub store: FsStore,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(store: FsStore) -> Self {
        Self {
            store,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::persona_routes())
        .merge(api::evaluation_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
