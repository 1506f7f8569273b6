//! Configuration loading for heimdalld.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.heimdall/config.toml` (user)
//! 3. `/etc/heimdall/config.toml` (system)

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::GatewayConfig;
use crate::cache::CacheConfig;

/// Errors raised while locating or parsing the config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0:?}")]
    NotFound(PathBuf),

    #[error("no config file found; create ~/.heimdall/config.toml or /etc/heimdall/config.toml")]
    NoConfigFile,

    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Daemon configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub gateway: GatewaySection,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub backend: BackendSection,
}

/// Listener addresses.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// gRPC listener (default: 127.0.0.1:9000).
    #[serde(default = "default_grpc_address")]
    pub grpc_address: String,
    /// Legacy HTTP Track listener (default: 127.0.0.1:9001).
    #[serde(default = "default_http_address")]
    pub http_address: String,
    /// Prometheus scrape listener; metrics are not exported when unset.
    #[serde(default)]
    pub metrics_address: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            grpc_address: default_grpc_address(),
            http_address: default_http_address(),
            metrics_address: None,
        }
    }
}

fn default_grpc_address() -> String {
    "127.0.0.1:9000".to_string()
}

fn default_http_address() -> String {
    "127.0.0.1:9001".to_string()
}

/// Event timestamp window and background publication deadline.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewaySection {
    #[serde(default = "default_oldest_event_timestamp")]
    pub oldest_event_timestamp_secs: u64,
    #[serde(default = "default_furthest_event_timestamp")]
    pub furthest_event_timestamp_secs: u64,
    #[serde(default = "default_user_publish_timeout")]
    pub user_publish_timeout_secs: u64,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            oldest_event_timestamp_secs: default_oldest_event_timestamp(),
            furthest_event_timestamp_secs: default_furthest_event_timestamp(),
            user_publish_timeout_secs: default_user_publish_timeout(),
        }
    }
}

fn default_oldest_event_timestamp() -> u64 {
    744 * 60 * 60
}

fn default_furthest_event_timestamp() -> u64 {
    60 * 60
}

fn default_user_publish_timeout() -> u64 {
    20
}

impl GatewaySection {
    pub fn to_gateway_config(&self) -> GatewayConfig {
        GatewayConfig::new()
            .oldest_event_timestamp(Duration::from_secs(self.oldest_event_timestamp_secs))
            .furthest_event_timestamp(Duration::from_secs(self.furthest_event_timestamp_secs))
            .user_publish_timeout(Duration::from_secs(self.user_publish_timeout_secs))
    }
}

/// Shared cache tier backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExternalCacheKind {
    #[default]
    Memory,
    Redis,
}

/// Cache tiers.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    #[serde(default = "default_api_key_ttl")]
    pub api_key_ttl_secs: u64,
    #[serde(default = "default_api_key_max_entries")]
    pub api_key_max_entries: u64,
    #[serde(default)]
    pub external: ExternalCacheKind,
    /// Required when `external = "redis"`.
    #[serde(default)]
    pub redis_url: Option<String>,
    #[serde(default = "default_redis_pool_size")]
    pub redis_pool_size: usize,
    #[serde(default = "default_external_ttl")]
    pub external_ttl_secs: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            api_key_ttl_secs: default_api_key_ttl(),
            api_key_max_entries: default_api_key_max_entries(),
            external: ExternalCacheKind::default(),
            redis_url: None,
            redis_pool_size: default_redis_pool_size(),
            external_ttl_secs: default_external_ttl(),
        }
    }
}

fn default_api_key_ttl() -> u64 {
    300
}

fn default_api_key_max_entries() -> u64 {
    10_000
}

fn default_redis_pool_size() -> usize {
    16
}

fn default_external_ttl() -> u64 {
    24 * 60 * 60
}

impl CacheSection {
    pub fn to_cache_config(&self) -> CacheConfig {
        CacheConfig::new()
            .api_key_ttl(Duration::from_secs(self.api_key_ttl_secs))
            .api_key_max_entries(self.api_key_max_entries)
    }
}

/// Collaborator endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendSection {
    #[serde(default)]
    pub account_url: String,
    #[serde(default)]
    pub feature_url: String,
    #[serde(default)]
    pub publisher_url: String,
    /// Job dispatch is disabled when unset.
    #[serde(default)]
    pub batch_url: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            account_url: String::new(),
            feature_url: String::new(),
            publisher_url: String::new(),
            batch_url: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    10
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided)
    /// 2. `~/.heimdall/config.toml`
    /// 3. `/etc/heimdall/config.toml`
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = Self::resolve_config_path(explicit_path)?;
        Self::load_from_file(&path)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field requirements serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, url) in [
            ("backend.account_url", &self.backend.account_url),
            ("backend.feature_url", &self.backend.feature_url),
            ("backend.publisher_url", &self.backend.publisher_url),
        ] {
            if url.is_empty() {
                return Err(ConfigError::Invalid(format!("{name} is required")));
            }
        }
        if self.cache.external == ExternalCacheKind::Redis && self.cache.redis_url.is_none() {
            return Err(ConfigError::Invalid(
                "cache.redis_url is required when cache.external = \"redis\"".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the config file path.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(path.to_path_buf());
            }
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".heimdall").join("config.toml");
            if user_config.exists() {
                return Ok(user_config);
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/heimdall/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }

        Err(ConfigError::NoConfigFile)
    }
}
