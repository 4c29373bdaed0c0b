//! Backend selection and dispatch.

use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;

use crate::health::state::SharedStatus;
use crate::http::request::request_id;
use crate::upstream::backend::BackendProxy;

/// Sends each request to the primary while it is online, otherwise to the
/// secondary.
#[derive(Debug)]
pub struct FailoverRouter {
    status: Arc<SharedStatus>,
    primary: BackendProxy,
    secondary: BackendProxy,
}

impl FailoverRouter {
    pub fn new(status: Arc<SharedStatus>, primary: BackendProxy, secondary: BackendProxy) -> Self {
        Self {
            status,
            primary,
            secondary,
        }
    }

    /// The proxy the next request should use.
    pub fn select(&self) -> &BackendProxy {
        if self.status.read() {
            &self.primary
        } else {
            &self.secondary
        }
    }

    pub async fn route(&self, request: Request<Body>) -> Response {
        let backend = self.select();

        tracing::info!(
            request_id = %request_id(request.headers()),
            method = %request.method(),
            path = %request.uri().path(),
            backend = %backend.target().role(),
            upstream = %backend.target().url(),
            "Routing request"
        );

        backend.forward(request).await
    }
}
