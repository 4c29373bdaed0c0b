//! HTTP failover proxy library.
//!
//! Forwards every request to a primary backend while it answers liveness
//! probes, and to a secondary backend while it does not.
//!
//! ```text
//!   HealthMonitor ──probe──▶ primary
//!        │
//!        ▼ write
//!   SharedStatus
//!        │ read (per request)
//!        ▼
//!   FailoverRouter ──▶ BackendProxy(primary)   ──▶ primary
//!                  └─▶ BackendProxy(secondary) ──▶ secondary
//! ```

pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod upstream;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
