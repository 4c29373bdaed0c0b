//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe the primary backend
//! - Publish the result to [`SharedStatus`]
//! - Log every probe outcome and every liveness transition

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::USER_AGENT;
use axum::http::{Method, Request, StatusCode};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};

use crate::config::HealthCheckConfig;
use crate::health::state::SharedStatus;
use crate::upstream::backend::HttpClient;
use crate::upstream::target::BackendTarget;

/// Why a probe did not get a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    Build(String),
    Transport(String),
    Timeout(Duration),
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeFailure::Build(e) => write!(f, "failed to build probe request: {}", e),
            ProbeFailure::Transport(e) => write!(f, "connection error: {}", e),
            ProbeFailure::Timeout(after) => write!(f, "no response within {:?}", after),
        }
    }
}

/// Result of one probe cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The backend answered. Any status counts, error statuses included.
    Reachable(StatusCode),
    Unreachable(ProbeFailure),
}

impl ProbeOutcome {
    pub fn is_online(&self) -> bool {
        matches!(self, ProbeOutcome::Reachable(_))
    }

    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            ProbeOutcome::Reachable(status) => Some(*status),
            ProbeOutcome::Unreachable(_) => None,
        }
    }
}

pub struct HealthMonitor {
    target: BackendTarget,
    status: Arc<SharedStatus>,
    interval: Duration,
    timeout: Duration,
    client: HttpClient,
}

impl HealthMonitor {
    pub fn new(target: BackendTarget, status: Arc<SharedStatus>, config: &HealthCheckConfig) -> Self {
        // Fresh connection per probe: liveness of the backend, not of a pooled socket.
        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(0)
            .build(HttpConnector::new());

        Self {
            target,
            status,
            interval: config.interval(),
            timeout: config.timeout(),
            client,
        }
    }

    /// Probe until `shutdown` fires (or its sender is dropped). The first
    /// probe runs immediately.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            target_url = %self.target.url(),
            interval = ?self.interval,
            timeout = ?self.timeout,
            "Health monitor starting"
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let outcome = self.probe().await;
                    self.record(&outcome);
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Send one HEAD request to the primary's base URL.
    pub async fn probe(&self) -> ProbeOutcome {
        let request = match self.target.probe_uri() {
            Ok(uri) => Request::builder()
                .method(Method::HEAD)
                .uri(uri)
                .header(USER_AGENT, "failover-proxy-health-check")
                .body(Body::empty()),
            Err(e) => return ProbeOutcome::Unreachable(ProbeFailure::Build(e.to_string())),
        };
        let request = match request {
            Ok(request) => request,
            Err(e) => return ProbeOutcome::Unreachable(ProbeFailure::Build(e.to_string())),
        };

        match time::timeout(self.timeout, self.client.request(request)).await {
            Ok(Ok(response)) => ProbeOutcome::Reachable(response.status()),
            Ok(Err(e)) => ProbeOutcome::Unreachable(ProbeFailure::Transport(e.to_string())),
            Err(_) => ProbeOutcome::Unreachable(ProbeFailure::Timeout(self.timeout)),
        }
    }

    /// Publish a probe outcome. Returns true if the primary's liveness changed.
    pub fn record(&self, outcome: &ProbeOutcome) -> bool {
        match outcome {
            ProbeOutcome::Reachable(status) => {
                tracing::info!(status = %status.as_u16(), "Primary backend is online");
            }
            ProbeOutcome::Unreachable(failure) => {
                tracing::warn!(error = %failure, "Health check failed for primary backend");
            }
        }

        let online = outcome.is_online();
        let changed = self.status.write(online);
        if changed {
            if online {
                tracing::info!("Primary backend is now online, switching back to primary");
            } else {
                tracing::warn!("Primary backend is offline, switching to secondary");
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::target::BackendRole;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn config(interval_ms: u64, timeout_ms: u64) -> HealthCheckConfig {
        HealthCheckConfig {
            interval_ms,
            timeout_ms,
        }
    }

    fn monitor_for(url: &str, config: &HealthCheckConfig) -> (HealthMonitor, Arc<SharedStatus>) {
        let target = BackendTarget::parse(BackendRole::Primary, url).unwrap();
        let status = Arc::new(SharedStatus::new());
        (HealthMonitor::new(target, status.clone(), config), status)
    }

    /// Answers every connection with `status_line` and closes it.
    async fn answering_backend(status_line: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = [0u8; 1024];
                    let _ = socket.read(&mut buf).await;
                    let response = format!("HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n", status_line);
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        format!("http://{}", addr)
    }

    /// Accepts connections and never answers.
    async fn silent_backend() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        format!("http://{}", addr)
    }

    async fn closed_port() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }

    #[test]
    fn outcome_classification() {
        assert!(ProbeOutcome::Reachable(StatusCode::OK).is_online());
        assert!(ProbeOutcome::Reachable(StatusCode::SERVICE_UNAVAILABLE).is_online());
        assert!(!ProbeOutcome::Unreachable(ProbeFailure::Timeout(Duration::from_secs(2))).is_online());
        assert!(!ProbeOutcome::Unreachable(ProbeFailure::Build("bad".into())).is_online());
        assert_eq!(
            ProbeOutcome::Reachable(StatusCode::NOT_FOUND).status_code(),
            Some(StatusCode::NOT_FOUND)
        );
    }

    #[tokio::test]
    async fn status_tracks_each_outcome() {
        let (monitor, status) = monitor_for("http://127.0.0.1:1", &config(5000, 2000));
        let outcomes = [
            ProbeOutcome::Reachable(StatusCode::OK),
            ProbeOutcome::Unreachable(ProbeFailure::Transport("refused".into())),
            ProbeOutcome::Reachable(StatusCode::INTERNAL_SERVER_ERROR),
            ProbeOutcome::Unreachable(ProbeFailure::Timeout(Duration::from_secs(2))),
            ProbeOutcome::Unreachable(ProbeFailure::Build("bad uri".into())),
        ];
        for outcome in &outcomes {
            monitor.record(outcome);
            assert_eq!(status.read(), outcome.is_online());
        }
    }

    #[tokio::test]
    async fn repeated_outcomes_change_once() {
        let (monitor, _) = monitor_for("http://127.0.0.1:1", &config(5000, 2000));
        let down = ProbeOutcome::Unreachable(ProbeFailure::Transport("refused".into()));
        let up = ProbeOutcome::Reachable(StatusCode::OK);

        let changes: Vec<bool> = [&up, &up, &down, &down, &down, &up, &up]
            .into_iter()
            .map(|o| monitor.record(o))
            .collect();
        assert_eq!(changes, vec![false, false, true, false, false, true, false]);
    }

    #[tokio::test]
    async fn error_status_counts_as_online() {
        let url = answering_backend("503 Service Unavailable").await;
        let (monitor, _) = monitor_for(&url, &config(5000, 2000));
        assert_eq!(
            monitor.probe().await,
            ProbeOutcome::Reachable(StatusCode::SERVICE_UNAVAILABLE)
        );
    }

    #[tokio::test]
    async fn refused_connection_is_transport_failure() {
        let url = closed_port().await;
        let (monitor, _) = monitor_for(&url, &config(5000, 2000));
        assert!(matches!(
            monitor.probe().await,
            ProbeOutcome::Unreachable(ProbeFailure::Transport(_))
        ));
    }

    #[tokio::test]
    async fn silent_backend_times_out() {
        let url = silent_backend().await;
        let (monitor, _) = monitor_for(&url, &config(1000, 100));
        assert_eq!(
            monitor.probe().await,
            ProbeOutcome::Unreachable(ProbeFailure::Timeout(Duration::from_millis(100)))
        );
    }

    #[tokio::test]
    async fn run_marks_offline_and_stops_on_shutdown() {
        let url = closed_port().await;
        let (monitor, status) = monitor_for(&url, &config(50, 20));
        let (tx, rx) = broadcast::channel(1);

        let handle = tokio::spawn(monitor.run(rx));
        time::sleep(Duration::from_millis(200)).await;
        assert!(!status.read());

        tx.send(()).unwrap();
        time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("monitor should stop after shutdown")
            .unwrap();
    }
}
