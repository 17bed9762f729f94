//! Client address resolution.

use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Address to bind into tokens for this request.
///
/// With `trust_forwarded_for` the first parseable hop of `X-Forwarded-For`
/// wins; otherwise, or when the header is absent or garbled, the peer
/// address is used. IPv4-mapped IPv6 addresses are reported as IPv4.
#[must_use]
pub fn client_address(peer: SocketAddr, headers: &HeaderMap, trust_forwarded_for: bool) -> String {
    let forwarded = trust_forwarded_for
        .then(|| forwarded_ip(headers))
        .flatten();

    forwarded
        .unwrap_or_else(|| peer.ip())
        .to_canonical()
        .to_string()
}

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get(FORWARDED_FOR)?
        .to_str()
        .ok()?
        .split(',')
        .next()
        .map(str::trim)?
        .parse()
        .ok()
}
