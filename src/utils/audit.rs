// src/utils/audit.rs

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use axum::{
    Json,
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::models::audit::ApiLogEntry;
use crate::state::AppState;
use crate::utils::net::client_ip;

/// Bodies bigger than this never reach the handlers anyway; buffering stops
/// here rather than at the extractor.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;
/// Stored request bodies are truncated to keep audit rows bounded.
const MAX_LOGGED_BODY: usize = 3000;
const GEO_TIMEOUT: Duration = Duration::from_secs(2);

/// Axum Middleware: request audit trail.
///
/// Records api name, truncated request body, client address, user agent,
/// geo location (best-effort) and response status. The write happens on a
/// spawned task after the response is on its way; nothing in here may fail
/// the request itself.
pub async fn api_logger(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let api_name = req.uri().path().to_string();
    let ip_address = client_ip(req.headers(), peer);
    let user_agent = req
        .headers()
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let (parts, body) = req.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Invalid request body" })),
            )
                .into_response();
        }
    };
    let request_body = truncate_logged(&bytes);

    let response = next
        .run(Request::from_parts(parts, Body::from(bytes)))
        .await;
    let status = response.status().as_u16() as i16;

    let store = state.store.clone();
    tokio::spawn(async move {
        let location = lookup_location(&ip_address).await;
        let entry = ApiLogEntry {
            api_name,
            request_body,
            ip_address,
            location,
            user_agent,
            status,
            logged_at: Utc::now(),
        };
        if let Err(e) = store.record_api_log(entry).await {
            tracing::debug!("failed to record api log: {}", e);
        }
    });

    response
}

fn truncate_logged(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    if text.len() <= MAX_LOGGED_BODY {
        text.into_owned()
    } else {
        text.chars().take(MAX_LOGGED_BODY).collect()
    }
}

#[derive(Debug, Deserialize)]
struct GeoReply {
    city: Option<String>,
    region: Option<String>,
    country_name: Option<String>,
}

/// Best-effort city/region/country lookup. Loopback and private ranges are
/// skipped outright; every failure path yields `None`.
async fn lookup_location(ip: &str) -> Option<String> {
    if !is_public_ip(ip) {
        return None;
    }

    let url = format!("https://ipapi.co/{ip}/json/");
    let response = reqwest::Client::new()
        .get(&url)
        .timeout(GEO_TIMEOUT)
        .send()
        .await
        .ok()?;
    if !response.status().is_success() {
        return None;
    }
    let geo: GeoReply = response.json().await.ok()?;

    let parts: Vec<String> = [geo.city, geo.region, geo.country_name]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

fn is_public_ip(ip: &str) -> bool {
    match ip.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => {
            !(v4.is_loopback() || v4.is_private() || v4.is_link_local() || v4.is_unspecified())
        }
        Ok(IpAddr::V6(v6)) => !(v6.is_loopback() || v6.is_unspecified()),
        Err(_) => false,
    }
}
