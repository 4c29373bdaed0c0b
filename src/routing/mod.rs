//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request
//!     → router.rs reads SharedStatus
//!     → primary online?  → primary BackendProxy
//!       primary offline? → secondary BackendProxy
//! ```
//!
//! # Design Decisions
//! - Whole-request failover; there is no path or host based routing
//! - Each request decides independently (no affinity, no hysteresis)

pub mod router;

pub use router::FailoverRouter;
