//! Request handling and transformation.
//!
//! # Responsibilities
//! - Classify WebSocket upgrade requests
//! - Normalize upgrade headers before forwarding
//! - Strip hop-by-hop headers
//! - Append the client address to `X-Forwarded-For`
//!
//! # Design Decisions
//! - Upgrade detection is an exact, case-sensitive match on both headers
//! - Requests carrying only one of the upgrade headers are forwarded as plain
//!   requests, with the hop-by-hop `Upgrade` header removed
//! - Original request preserved for logging; modified copy forwarded

use std::net::IpAddr;

use axum::http::header::{CONNECTION, UPGRADE};
use axum::http::{HeaderMap, HeaderName, HeaderValue};

/// Header carrying the request ID assigned at the edge.
pub const X_REQUEST_ID: &str = "x-request-id";

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Headers that apply to a single transport hop and must not be forwarded.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Returns true iff `Upgrade` is exactly `websocket` and `Connection` is
/// exactly `Upgrade`.
pub fn is_websocket_upgrade(headers: &HeaderMap) -> bool {
    let upgrade = headers.get(UPGRADE).is_some_and(|v| v == "websocket");
    let connection = headers.get(CONNECTION).is_some_and(|v| v == "Upgrade");
    upgrade && connection
}

/// Force non-empty `Connection` and `Upgrade` headers to their canonical
/// WebSocket values, collapsing any repeated values.
pub fn normalize_upgrade_headers(headers: &mut HeaderMap) {
    if has_non_empty(headers, &CONNECTION) {
        headers.insert(CONNECTION, HeaderValue::from_static("Upgrade"));
    }
    if has_non_empty(headers, &UPGRADE) {
        headers.insert(UPGRADE, HeaderValue::from_static("websocket"));
    }
}

fn has_non_empty(headers: &HeaderMap, name: &HeaderName) -> bool {
    headers.get(name).is_some_and(|v| !v.is_empty())
}

/// Remove hop-by-hop headers, including any header named in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect();

    for name in named {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
}

/// Append `client` to the `X-Forwarded-For` chain.
pub fn append_forwarded_for(headers: &mut HeaderMap, client: IpAddr) {
    let prior: Vec<&str> = headers
        .get_all(X_FORWARDED_FOR)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();

    let chain = if prior.is_empty() {
        client.to_string()
    } else {
        format!("{}, {}", prior.join(", "), client)
    };

    if let Ok(value) = HeaderValue::from_str(&chain) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}

/// Rewrite inbound headers into the set sent upstream.
///
/// For upgrade requests the normalized `Connection`/`Upgrade` pair survives
/// hop-by-hop stripping; for everything else both are removed.
pub fn prepare_upstream_headers(headers: &mut HeaderMap, upgrade: bool, client: Option<IpAddr>) {
    let retained: Vec<(HeaderName, HeaderValue)> = if upgrade {
        normalize_upgrade_headers(headers);
        [CONNECTION, UPGRADE]
            .into_iter()
            .filter_map(|name| headers.get(&name).cloned().map(|value| (name, value)))
            .collect()
    } else {
        Vec::new()
    };

    strip_hop_by_hop(headers);
    for (name, value) in retained {
        headers.insert(name, value);
    }

    if let Some(client) = client {
        append_forwarded_for(headers, client);
    }
}

/// Request ID recorded by the edge middleware, if any.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}
