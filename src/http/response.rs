//! Response handling and transformation.
//!
//! # Responsibilities
//! - Transform backend response for client
//! - Map upstream failures to gateway error responses
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Hop-by-hop headers stripped, except on `101 Switching Protocols`
//! - Backend timeouts result in 504 Gateway Timeout, everything else in 502

use std::time::Duration;

use axum::body::Body;
use axum::http::{Response, StatusCode};
use axum::response::IntoResponse;
use hyper::body::Incoming;
use thiserror::Error;

use crate::http::request::strip_hop_by_hop;

/// Failure while forwarding a single request upstream.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("failed to build upstream request: {0}")]
    Request(#[from] axum::http::Error),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),

    #[error("upstream switched protocols for a request that did not ask to upgrade")]
    UnexpectedUpgrade,
}

impl ProxyError {
    /// Status code returned to the client for this failure.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> axum::response::Response {
        let message = match self {
            ProxyError::Timeout(_) => "Upstream timed out",
            _ => "Upstream request failed",
        };
        (self.status(), message).into_response()
    }
}

/// Convert an upstream response into the one sent to the client, streaming
/// the body through untouched.
pub fn relay_response(response: Response<Incoming>) -> Response<Body> {
    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    Response::from_parts(parts, Body::new(body))
}

/// Headers of a `101 Switching Protocols` response, passed through intact.
/// The body is empty; the connection itself carries the upgraded stream.
pub fn switching_protocols(response: Response<Incoming>) -> Response<Body> {
    let (parts, _) = response.into_parts();
    Response::from_parts(parts, Body::empty())
}
