//! WebSocket proxy handling.
//!
//! # Responsibilities
//! - Wait for both halves of an upgrade (client and backend) to complete
//! - Relay the upgraded byte stream in both directions
//!
//! # Data Flow
//! ```text
//! Client ←──── raw bytes ────→ Proxy ←──── raw bytes ────→ Backend
//! ```
//!
//! # Design Decisions
//! - Byte-level relay after the 101 handshake; frames are never parsed
//! - Each relay runs on its own task so long-lived sessions never hold up
//!   other requests
//! - EOF on one side shuts down writes to the other; the relay ends once both
//!   directions are finished or either side errors

use std::io;

use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;

use crate::upstream::target::BackendRole;

/// Spawn the relay for an upgraded connection.
pub fn spawn_relay(backend: BackendRole, client: OnUpgrade, upstream: OnUpgrade) -> JoinHandle<()> {
    tokio::spawn(async move {
        let (client, upstream) = match tokio::try_join!(client, upstream) {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(backend = %backend, error = %e, "WebSocket upgrade failed");
                return;
            }
        };

        let mut client = TokioIo::new(client);
        let mut upstream = TokioIo::new(upstream);

        match relay(&mut client, &mut upstream).await {
            Ok((to_upstream, to_client)) => {
                tracing::info!(
                    backend = %backend,
                    bytes_to_upstream = to_upstream,
                    bytes_to_client = to_client,
                    "WebSocket connection closed"
                );
            }
            Err(e) => {
                tracing::debug!(backend = %backend, error = %e, "WebSocket connection terminated");
            }
        }
    })
}

/// Pump bytes between `client` and `upstream` until both directions close.
///
/// Returns `(client → upstream, upstream → client)` byte counts.
pub async fn relay<C, U>(client: &mut C, upstream: &mut U) -> io::Result<(u64, u64)>
where
    C: AsyncRead + AsyncWrite + Unpin + ?Sized,
    U: AsyncRead + AsyncWrite + Unpin + ?Sized,
{
    tokio::io::copy_bidirectional(client, upstream).await
}
