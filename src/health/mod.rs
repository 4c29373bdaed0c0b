//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer
//!     → HEAD probe to the primary backend
//!     → Update state.rs
//!
//! Shared state (state.rs):
//!     Online ←→ Offline
//!     Read by the router on every request
//! ```
//!
//! # Design Decisions
//! - Only the primary is probed; the secondary is the fallback regardless
//! - Any HTTP response means online; only transport failures and timeouts
//!   mean offline
//! - No thresholds: each probe result takes effect immediately

pub mod active;
pub mod state;

pub use active::{HealthMonitor, ProbeFailure, ProbeOutcome};
pub use state::SharedStatus;
