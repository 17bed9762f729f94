//! Route handlers.

use super::client_ip::client_address;
use super::AppState;
use crate::error::TokenError;
use crate::metrics;
use crate::session::{RotationRequest, TokenPair};
use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::net::SocketAddr;
use tracing::debug;

/// Login query string.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    /// Subject identifier
    pub guid: Option<String>,
}

/// `GET /api/v1/login?guid=<id>`: issue a pair bound to the caller's
/// address.
pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(query): Query<LoginQuery>,
) -> Result<Json<TokenPair>, TokenError> {
    let guid = query
        .guid
        .filter(|g| !g.trim().is_empty())
        .ok_or_else(|| TokenError::invalid_request("guid query parameter is required"))?;

    let address = client_address(peer, &headers, state.trust_forwarded_for);
    let pair = state.rotator.issue(&guid, &address).await?;
    Ok(Json(pair))
}

/// `POST /api/v1/refresh`: rotate a pair.
pub async fn refresh(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Json<RotationRequest>, JsonRejection>,
) -> Result<Json<TokenPair>, TokenError> {
    let Json(request) = body.map_err(|e| {
        debug!(error = %e, "Rejected refresh body");
        TokenError::invalid_request("request body must be a JSON object with access and refresh")
    })?;

    let address = client_address(peer, &headers, state.trust_forwarded_for);
    let pair = state.rotator.rotate(&request, &address).await?;
    Ok(Json(pair))
}

/// `GET /health`
pub async fn health() -> &'static str {
    "ok"
}

/// `GET /metrics`
pub async fn render_metrics() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render(),
    )
}
