//! Upstream backends.
//!
//! # Responsibilities
//! - Describe each backend (target.rs)
//! - Forward requests to it (backend.rs)
//!
//! # Design Decisions
//! - Exactly two backends, built once at startup and never mutated
//! - Both proxies share one pooled HTTP/1.1 client

pub mod backend;
pub mod target;

pub use backend::BackendProxy;
pub use target::{BackendRole, BackendTarget, TargetError};
