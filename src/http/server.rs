//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Resolve both backend targets and build their proxies
//! - Create Axum Router with a catch-all handler
//! - Wire up middleware (request ID, tracing)
//! - Run the health monitor alongside the listener
//! - Stop both on shutdown

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::health::active::HealthMonitor;
use crate::health::state::SharedStatus;
use crate::routing::FailoverRouter;
use crate::upstream::backend::{build_client, BackendProxy};
use crate::upstream::target::{BackendRole, BackendTarget, TargetError};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<FailoverRouter>,
}

/// HTTP server for the failover proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    status: Arc<SharedStatus>,
    primary: BackendTarget,
}

impl HttpServer {
    /// Create a new HTTP server. Fails if either backend URL is unusable.
    pub fn new(config: ProxyConfig) -> Result<Self, TargetError> {
        let primary = BackendTarget::parse(BackendRole::Primary, &config.backends.primary)?;
        let secondary = BackendTarget::parse(BackendRole::Secondary, &config.backends.secondary)?;

        let status = Arc::new(SharedStatus::new());
        let client = build_client();
        let request_timeout = config.timeouts.request();

        let failover = FailoverRouter::new(
            status.clone(),
            BackendProxy::new(primary.clone(), client.clone(), request_timeout),
            BackendProxy::new(secondary, client, request_timeout),
        );

        let state = AppState {
            router: Arc::new(failover),
        };

        Ok(Self {
            router: Self::build_router(state),
            config,
            status,
            primary,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .fallback(proxy_handler)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// Liveness of the primary as seen by the router.
    pub fn status(&self) -> Arc<SharedStatus> {
        self.status.clone()
    }

    /// Run the server and its health monitor until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            primary = %self.config.backends.primary,
            secondary = %self.config.backends.secondary,
            "HTTP server starting"
        );

        let monitor = HealthMonitor::new(self.primary, self.status, &self.config.health_check);
        let monitor_task = tokio::spawn(monitor.run(shutdown.resubscribe()));

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        if let Err(e) = monitor_task.await {
            tracing::error!(error = %e, "Health monitor task failed");
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all handler: every method and path goes through the failover router.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    state.router.route(request).await
}
