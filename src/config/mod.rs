//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → environment overrides (LISTEN_ADDR, SERVER_A_ADDR, SERVER_B_ADDR, ...)
//!     → command line overrides
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no hot reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{ConfigError, ConfigOverrides};
pub use schema::BackendConfig;
pub use schema::HealthCheckConfig;
pub use schema::ListenerConfig;
pub use schema::ProxyConfig;
