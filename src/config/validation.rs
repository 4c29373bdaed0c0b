//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that both backend URLs resolve to usable upstream targets
//! - Validate value ranges (timeouts > 0, probe timeout < probe interval)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before any socket is bound

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::upstream::target::{BackendRole, BackendTarget, TargetError};

/// A single semantic problem in a loaded configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid listener bind address {address:?}")]
    BindAddress { address: String },

    #[error("invalid {role} backend URL: {source}")]
    Backend {
        role: BackendRole,
        #[source]
        source: TargetError,
    },

    #[error("health_check.{field} must be greater than zero")]
    ZeroDuration { field: &'static str },

    #[error("health_check.timeout_ms ({timeout_ms}) must be shorter than interval_ms ({interval_ms})")]
    ProbeTimeoutTooLong { timeout_ms: u64, interval_ms: u64 },

    #[error("timeouts.request_ms must be greater than zero")]
    ZeroRequestTimeout,
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress {
            address: config.listener.bind_address.clone(),
        });
    }

    for (role, url) in [
        (BackendRole::Primary, &config.backends.primary),
        (BackendRole::Secondary, &config.backends.secondary),
    ] {
        if let Err(source) = BackendTarget::parse(role, url) {
            errors.push(ValidationError::Backend { role, source });
        }
    }

    let health = &config.health_check;
    if health.interval_ms == 0 {
        errors.push(ValidationError::ZeroDuration { field: "interval_ms" });
    }
    if health.timeout_ms == 0 {
        errors.push(ValidationError::ZeroDuration { field: "timeout_ms" });
    }
    if health.interval_ms > 0 && health.timeout_ms >= health.interval_ms {
        errors.push(ValidationError::ProbeTimeoutTooLong {
            timeout_ms: health.timeout_ms,
            interval_ms: health.interval_ms,
        });
    }

    if config.timeouts.request_ms == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
