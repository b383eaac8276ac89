//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Overrides the request-log queue capacity.
pub const ENV_QUEUE_CAPACITY: &str = "GATEWAY_LOG_QUEUE_CAPACITY";
/// Overrides the batch flush threshold.
pub const ENV_BATCH_SIZE: &str = "GATEWAY_LOG_BATCH_SIZE";
/// Overrides the periodic flush interval (seconds).
pub const ENV_FLUSH_INTERVAL_SECS: &str = "GATEWAY_LOG_FLUSH_INTERVAL_SECS";
/// Overrides the listener bind address.
pub const ENV_BIND_ADDRESS: &str = "GATEWAY_BIND_ADDRESS";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Env { var: &'static str, value: String },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Env { var, value } => write!(f, "Invalid value for {}: '{}'", var, value),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load, override from the process environment, and validate a TOML config file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let mut config: GatewayConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply environment-style tunables on top of the file configuration.
///
/// `lookup` resolves a variable name to its value, if set.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = parse_var(&lookup, ENV_QUEUE_CAPACITY)? {
        config.logging.queue_capacity = v;
    }
    if let Some(v) = parse_var(&lookup, ENV_BATCH_SIZE)? {
        config.logging.batch_size = v;
    }
    if let Some(v) = parse_var(&lookup, ENV_FLUSH_INTERVAL_SECS)? {
        config.logging.flush_interval_secs = v;
    }
    if let Some(addr) = lookup(ENV_BIND_ADDRESS) {
        config.server.bind_address = addr;
    }
    Ok(())
}

fn parse_var<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Env { var, value }),
    }
}
