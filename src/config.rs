use std::{env, fmt::Display, fs::read_to_string, str::FromStr, time::Duration};

use tracing::{info, warn};

use crate::error::ConfigError;

pub struct Config {
    pub port: u16,
    pub mongodb_uri: String,
    pub database: String,
    pub limit: i64,
    pub request_timeout: Duration,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            port: try_load("PORT", "8080")?,
            mongodb_uri: require("MONGODB_URI")?,
            database: try_load("MONGODB_DATABASE", "combinedDB")?,
            limit: try_load("LIMIT", "20")?,
            request_timeout: Duration::from_secs(try_load("REQUEST_TIMEOUT_SECS", "30")?),
        })
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            ConfigError::Invalid {
                key: key.to_string(),
                reason: e.to_string(),
            }
        })
}

/// Environment first, then a mounted secret of the same name.
fn require(key: &str) -> Result<String, ConfigError> {
    if let Some(value) = var(key) {
        return Ok(value);
    }

    read_secret(key).ok_or_else(|| ConfigError::Missing(key.to_string()))
}

fn read_secret(secret_name: &str) -> Option<String> {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            warn!("Failed to read {secret_name} from file: {e}");
        })
        .ok()
        .filter(|s| !s.is_empty())
}
