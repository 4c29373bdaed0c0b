//! Shared liveness state for the primary backend.
//!
//! # Design Decisions
//! - A single atomic flag: reads never tear and never wait on a writer
//! - Writes are read-modify-write, so concurrent writers are totally ordered
//!   and each one learns whether it changed the value
//! - Starts online; the primary is trusted until a probe says otherwise

use std::sync::atomic::{AtomicBool, Ordering};

/// Whether the primary backend is currently considered reachable.
#[derive(Debug)]
pub struct SharedStatus {
    primary_online: AtomicBool,
}

impl SharedStatus {
    pub fn new() -> Self {
        Self {
            primary_online: AtomicBool::new(true),
        }
    }

    /// Current liveness of the primary backend.
    pub fn read(&self) -> bool {
        self.primary_online.load(Ordering::Acquire)
    }

    /// Store a new liveness value. Returns true if it differs from the
    /// previous one.
    pub fn write(&self, online: bool) -> bool {
        self.primary_online.swap(online, Ordering::AcqRel) != online
    }
}

impl Default for SharedStatus {
    fn default() -> Self {
        Self::new()
    }
}
