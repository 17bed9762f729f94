//! HTTP surface.
//!
//! Two token routes plus health and metrics. The router expects to be
//! served with `into_make_service_with_connect_info::<SocketAddr>()`.

pub mod client_ip;
pub mod error;
pub mod handlers;

use crate::session::SessionRotator;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Issuance and rotation
    pub rotator: Arc<SessionRotator>,
    /// Take the client address from `X-Forwarded-For`
    pub trust_forwarded_for: bool,
}

/// Build the service router.
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/api/v1/login", get(handlers::login))
        .route("/api/v1/refresh", post(handlers::refresh))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::render_metrics))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
