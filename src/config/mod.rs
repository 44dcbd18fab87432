//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::cache::CachePolicy;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "*".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

/// TTL and version for one aggregation name, as configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachePolicyConfig {
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,

    #[serde(default = "default_cache_version")]
    pub version: u32,
}

fn default_ttl_seconds() -> u64 {
    300
}

fn default_cache_version() -> u32 {
    1
}

impl Default for CachePolicyConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl_seconds(),
            version: default_cache_version(),
        }
    }
}

impl CachePolicyConfig {
    fn to_policy(&self) -> CachePolicy {
        CachePolicy {
            ttl: Duration::from_secs(self.ttl_seconds),
            version: self.version,
        }
    }
}

/// Result-cache configuration: a default policy plus per-aggregation
/// overrides keyed by aggregation name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub default: CachePolicyConfig,

    #[serde(default)]
    pub aggregations: HashMap<String, CachePolicyConfig>,
}

impl CacheConfig {
    /// The injected policy table for the result cache.
    pub fn policy_table(&self) -> (CachePolicy, HashMap<String, CachePolicy>) {
        let overrides = self
            .aggregations
            .iter()
            .map(|(name, config)| (name.clone(), config.to_policy()))
            .collect();
        (self.default.to_policy(), overrides)
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            server: ServerConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "Server port must be greater than 0".to_string(),
            ));
        }

        if self.cache.default.ttl_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "Default cache TTL must be greater than 0".to_string(),
            ));
        }

        for (name, policy) in &self.cache.aggregations {
            if policy.ttl_seconds == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "Cache TTL for '{}' must be greater than 0",
                    name
                )));
            }
        }

        Ok(())
    }
}
