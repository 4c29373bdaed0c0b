//! Structured logging.
//!
//! # Design Decisions
//! - `RUST_LOG` wins when set; otherwise the configured level applies to this
//!   crate and `tower_http` stays at `info`

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::ObservabilityConfig;

/// Filter directives used when `RUST_LOG` is not set.
pub fn default_directives(config: &ObservabilityConfig) -> String {
    format!("failover_proxy={},tower_http=info", config.log_level)
}

/// Install the global subscriber. Call once, at startup.
pub fn init_logging(config: &ObservabilityConfig) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directives(config).into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
