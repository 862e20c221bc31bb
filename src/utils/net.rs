// src/utils/net.rs

use std::net::SocketAddr;

use axum::http::HeaderMap;

/// Client address used for audit rows and response tagging: first hop of
/// `X-Forwarded-For` when present, socket peer address otherwise.
pub fn client_ip(headers: &HeaderMap, peer: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| peer.ip().to_string())
}
