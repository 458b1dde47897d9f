//! Server configuration, read from the environment (and `.env` when present).

use std::env;
use std::net::SocketAddr;

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("you need to add {0} to the env")]
    Missing(&'static str),
    #[error("{name} has an invalid value `{value}`")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub mongodb_uri: String,
    pub database: String,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// `None` allows any origin.
    pub allowed_origin: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mongodb_uri = lookup("MONGODB_URI").ok_or(ConfigError::Missing("MONGODB_URI"))?;
        let database = lookup("OPENSPLIT_DATABASE").unwrap_or_else(|| "OpenSplit".to_string());
        let bind_addr = lookup("OPENSPLIT_BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string());
        let bind_addr = bind_addr.parse().map_err(|_| ConfigError::Invalid {
            name: "OPENSPLIT_BIND_ADDR",
            value: bind_addr.clone(),
        })?;
        let log_level = lookup("OPENSPLIT_LOG_LEVEL").unwrap_or_else(|| "info".to_string());
        let allowed_origin = lookup("OPENSPLIT_ALLOWED_ORIGIN").filter(|origin| !origin.is_empty());

        Ok(Config {
            mongodb_uri,
            database,
            bind_addr,
            log_level,
            allowed_origin,
        })
    }
}
