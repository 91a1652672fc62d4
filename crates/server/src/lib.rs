use std::{sync::Arc, time::Duration};

use axum::{Router, routing::get};
use pack_manager_services::services::profile_store::ProfileStore;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

pub mod config;
pub mod error;
pub mod locks;
pub mod routes;

use locks::ProfileLocks;

/// Shared handler state, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ProfileStore>,
    pub locks: ProfileLocks,
}

impl AppState {
    pub fn new(store: ProfileStore) -> Self {
        Self {
            store: Arc::new(store),
            locks: ProfileLocks::default(),
        }
    }
}

pub fn app(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/pack_manager/api", routes::profiles::router())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
