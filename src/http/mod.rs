//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace layer)
//!     → [routing layer picks primary or secondary]
//!     → request.rs (upgrade detection, header rewriting)
//!     → [backend proxy forwards upstream]
//!     → response.rs (gateway errors, header stripping)
//!     → websocket.rs (duplex relay after 101)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod websocket;

pub use request::{is_websocket_upgrade, X_REQUEST_ID};
pub use response::ProxyError;
pub use server::HttpServer;
