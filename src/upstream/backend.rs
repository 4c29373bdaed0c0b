//! Backend proxy pipeline.
//!
//! # Responsibilities
//! - Forward one request to a fixed upstream and relay its response
//! - Hand upgraded connections off to the WebSocket relay
//! - Turn upstream failures into gateway errors for the caller
//!
//! # Design Decisions
//! - Immutable after construction; shared between request tasks via `Arc`
//! - No retries: a failed request is answered with 502/504 and the next
//!   request goes through the router again
//! - Dropping the returned future (client disconnect) aborts the upstream call

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode, Version};
use axum::response::{IntoResponse, Response};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use tokio::time;

use crate::http::request::{is_websocket_upgrade, prepare_upstream_headers, request_id};
use crate::http::response::{relay_response, switching_protocols, ProxyError};
use crate::http::websocket;
use crate::upstream::target::BackendTarget;

/// HTTP client type shared by the proxies and the health monitor.
pub type HttpClient = Client<HttpConnector, Body>;

/// Build the upstream HTTP/1.1 client.
pub fn build_client() -> HttpClient {
    Client::builder(TokioExecutor::new()).build(HttpConnector::new())
}

/// Forwards requests to a single upstream.
#[derive(Debug, Clone)]
pub struct BackendProxy {
    target: BackendTarget,
    client: HttpClient,
    request_timeout: Duration,
}

impl BackendProxy {
    pub fn new(target: BackendTarget, client: HttpClient, request_timeout: Duration) -> Self {
        Self {
            target,
            client,
            request_timeout,
        }
    }

    pub fn target(&self) -> &BackendTarget {
        &self.target
    }

    /// Forward `request` upstream. Never fails: upstream errors become
    /// gateway error responses.
    pub async fn forward(&self, request: Request<Body>) -> Response {
        let request_id = request_id(request.headers()).to_string();
        match self.try_forward(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(
                    request_id = %request_id,
                    backend = %self.target.role(),
                    upstream = %self.target.url(),
                    error = %e,
                    "Upstream error"
                );
                e.into_response()
            }
        }
    }

    async fn try_forward(&self, mut request: Request<Body>) -> Result<Response, ProxyError> {
        let upgrade = is_websocket_upgrade(request.headers());
        let client_upgrade = upgrade.then(|| hyper::upgrade::on(&mut request));
        let client_ip = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        let (mut parts, body) = request.into_parts();
        parts.uri = self.target.rewrite_uri(&parts.uri)?;
        parts.version = Version::HTTP_11;
        prepare_upstream_headers(&mut parts.headers, upgrade, client_ip);
        let outbound = Request::from_parts(parts, body);

        let mut response = time::timeout(self.request_timeout, self.client.request(outbound))
            .await
            .map_err(|_| ProxyError::Timeout(self.request_timeout))??;

        if response.status() != StatusCode::SWITCHING_PROTOCOLS {
            return Ok(relay_response(response));
        }

        let client_upgrade = client_upgrade.ok_or(ProxyError::UnexpectedUpgrade)?;
        tracing::info!(
            backend = %self.target.role(),
            upstream = %self.target.url(),
            "WebSocket connection established"
        );

        let upstream_upgrade = hyper::upgrade::on(&mut response);
        websocket::spawn_relay(self.target.role(), client_upgrade, upstream_upgrade);

        Ok(switching_protocols(response))
    }
}
