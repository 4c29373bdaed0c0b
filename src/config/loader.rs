//! Configuration loading from disk, environment and command line.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable holding the listen port or address.
pub const ENV_LISTEN_ADDR: &str = "LISTEN_ADDR";
/// Environment variable holding the primary backend URL.
pub const ENV_PRIMARY: &str = "SERVER_A_ADDR";
/// Environment variable holding the secondary backend URL.
pub const ENV_SECONDARY: &str = "SERVER_B_ADDR";
/// Environment variable holding the probe interval in milliseconds.
pub const ENV_CHECK_INTERVAL_MS: &str = "CHECK_INTERVAL_MS";
/// Environment variable holding the probe timeout in milliseconds.
pub const ENV_CHECK_TIMEOUT_MS: &str = "CHECK_TIMEOUT_MS";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value {value:?} for {var}: expected milliseconds")]
    Env { var: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Values supplied on the command line. They take precedence over both the
/// config file and the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub listen: Option<String>,
    pub primary: Option<String>,
    pub secondary: Option<String>,
    pub log_level: Option<String>,
}

impl ConfigOverrides {
    fn apply(&self, config: &mut ProxyConfig) {
        if let Some(listen) = &self.listen {
            config.listener.bind_address = normalize_listen_addr(listen);
        }
        if let Some(primary) = &self.primary {
            config.backends.primary = primary.clone();
        }
        if let Some(secondary) = &self.secondary {
            config.backends.secondary = secondary.clone();
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
    }
}

/// Parse a TOML config file without validating it.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Build the effective configuration: file (or defaults), then environment,
/// then command line, then validation.
pub fn load(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<ProxyConfig, ConfigError> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };

    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;
    overrides.apply(&mut config);

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply environment overrides using `lookup` to read variables.
///
/// Empty values are treated as unset.
pub fn apply_env_overrides<F>(config: &mut ProxyConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

    if let Some(listen) = get(ENV_LISTEN_ADDR) {
        config.listener.bind_address = normalize_listen_addr(&listen);
    }
    if let Some(primary) = get(ENV_PRIMARY) {
        config.backends.primary = primary;
    }
    if let Some(secondary) = get(ENV_SECONDARY) {
        config.backends.secondary = secondary;
    }
    if let Some(value) = get(ENV_CHECK_INTERVAL_MS) {
        config.health_check.interval_ms = parse_millis(ENV_CHECK_INTERVAL_MS, value)?;
    }
    if let Some(value) = get(ENV_CHECK_TIMEOUT_MS) {
        config.health_check.timeout_ms = parse_millis(ENV_CHECK_TIMEOUT_MS, value)?;
    }
    Ok(())
}

fn parse_millis(var: &'static str, value: String) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Env { var, value })
}

/// Accept a bare port (`8080`) or `:port` as "all interfaces", otherwise
/// pass the address through unchanged.
pub fn normalize_listen_addr(value: &str) -> String {
    let value = value.trim();
    let port = value.strip_prefix(':').unwrap_or(value);
    if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) {
        format!("0.0.0.0:{}", port)
    } else {
        value.to_string()
    }
}
