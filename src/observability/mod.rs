//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events with structured fields
//!
//! Events worth knowing about:
//!     → one per inbound request (method, path, chosen backend)
//!     → one per probe outcome
//!     → one per liveness transition
//!     → one per completed WebSocket handshake
//! ```
//!
//! # Design Decisions
//! - Structured logging through the `tracing` crate
//! - Request ID (`x-request-id`) recorded on every routing event

pub mod logging;
