//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{HeaderMap, Method, Request},
    response::Response,
    routing::any,
    Router,
};
use failover_proxy::health::SharedStatus;
use failover_proxy::{HttpServer, ProxyConfig, Shutdown};
use futures_util::StreamExt;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

#[derive(Clone)]
struct MockState {
    name: &'static str,
    hits: Arc<AtomicUsize>,
    hanging: Arc<AtomicBool>,
}

/// A mock backend that answers every request with its name.
///
/// The response body is six lines: the backend name, the URI it received,
/// the `X-Forwarded-For` and `Upgrade` headers it saw, the method, and the
/// number of body bytes streamed in. Probes (HEAD) are not counted as hits.
#[derive(Clone)]
pub struct MockBackend {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    hanging: Arc<AtomicBool>,
}

impl MockBackend {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// While hanging, every request (probes included) stalls for a minute.
    pub fn set_hanging(&self, hanging: bool) {
        self.hanging.store(hanging, Ordering::SeqCst);
    }
}

pub async fn start_backend(name: &'static str) -> MockBackend {
    let hits = Arc::new(AtomicUsize::new(0));
    let hanging = Arc::new(AtomicBool::new(false));
    let state = MockState {
        name,
        hits: hits.clone(),
        hanging: hanging.clone(),
    };

    let app = Router::new()
        .route("/ws", any(ws_echo))
        .fallback(mock_handler)
        .with_state(state);
    let addr = serve(app).await;

    MockBackend { addr, hits, hanging }
}

async fn mock_handler(State(state): State<MockState>, request: Request<Body>) -> String {
    if state.hanging.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_secs(60)).await;
    }
    if request.method() != Method::HEAD {
        state.hits.fetch_add(1, Ordering::SeqCst);
    }

    let (parts, body) = request.into_parts();
    let mut stream = body.into_data_stream();
    let mut body_len = 0;
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(chunk) => body_len += chunk.len(),
            Err(_) => break,
        }
    }

    format!(
        "{}\n{}\nxff={}\nupgrade={}\nmethod={}\nbody={}",
        state.name,
        parts.uri,
        header(&parts.headers, "x-forwarded-for"),
        header(&parts.headers, "upgrade"),
        parts.method,
        body_len,
    )
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

/// Echoes every WebSocket data message back until the client closes.
async fn ws_echo(State(state): State<MockState>, ws: WebSocketUpgrade) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    ws.max_message_size(16 * 1024 * 1024)
        .on_upgrade(echo_socket)
}

async fn echo_socket(mut socket: WebSocket) {
    while let Some(Ok(message)) = socket.recv().await {
        match message {
            Message::Close(_) => break,
            Message::Text(_) | Message::Binary(_) => {
                if socket.send(message).await.is_err() {
                    break;
                }
            }
            _ => {}
        }
    }
}

async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// A raw TCP upstream that never answers.
///
/// Every connection whose first request is not a HEAD is handed to the
/// returned receiver once its request head has been read. HEAD connections
/// are held open silently.
pub async fn start_silent_upstream() -> (String, mpsc::UnboundedReceiver<TcpStream>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => head.extend_from_slice(&buf[..n]),
                }
            }
            if head.starts_with(b"HEAD") {
                held.push(socket);
            } else {
                let _ = tx.send(socket);
            }
        }
    });

    (format!("http://{}", addr), rx)
}

/// URL of a local port with nothing listening on it.
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// Config with probe timings short enough for tests.
pub fn test_config(primary: String, secondary: String) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.backends.primary = primary;
    config.backends.secondary = secondary;
    config.health_check.interval_ms = 200;
    config.health_check.timeout_ms = 150;
    config.timeouts.request_ms = 5_000;
    config
}

pub struct RunningProxy {
    pub addr: SocketAddr,
    pub status: Arc<SharedStatus>,
    pub shutdown: Shutdown,
}

impl RunningProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub async fn start_proxy(config: ProxyConfig) -> RunningProxy {
    let server = HttpServer::new(config).unwrap();
    let status = server.status();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    RunningProxy {
        addr,
        status,
        shutdown,
    }
}

/// Poll `condition` every 10ms until it holds or `timeout` elapses.
pub async fn wait_until<F>(timeout: Duration, condition: F) -> bool
where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Run `f` and fail the test if it takes longer than `timeout`.
pub async fn within<T>(timeout: Duration, f: impl Future<Output = T>) -> T {
    tokio::time::timeout(timeout, f)
        .await
        .expect("operation timed out")
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
