//! Configuration management for the coffee shop material ledger
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with POS_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Report cache configuration
    pub cache: CacheConfig,

    /// Message queue configuration
    pub queue: QueueConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// When false, every report is computed directly
    pub enabled: bool,

    /// Redis connection URL
    pub redis_url: Option<String>,

    /// Key namespace, the first segment of every cache key
    pub namespace: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueueConfig {
    /// Start the consumption consumer task
    pub enabled: bool,

    /// Redis connection URL, falls back to the cache URL
    pub redis_url: Option<String>,

    /// Topic carrying `{orderId}` consumption events
    pub consumption_topic: String,

    /// Delay between polls when the queue is empty
    pub poll_interval_ms: u64,

    /// Redeliveries before a message is dropped
    pub max_retries: u32,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("POS_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("cache.enabled", true)?
            .set_default("cache.namespace", "reports")?
            .set_default("queue.enabled", true)?
            .set_default("queue.consumption_topic", "calculate_material_consumption")?
            .set_default("queue.poll_interval_ms", 1000)?
            .set_default("queue.max_retries", 5)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (POS_ prefix)
            .add_source(
                Environment::with_prefix("POS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Redis URL used by the message queue
    pub fn queue_redis_url(&self) -> Option<&str> {
        self.queue
            .redis_url
            .as_deref()
            .or(self.cache.redis_url.as_deref())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            redis_url: None,
            namespace: "reports".to_string(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            redis_url: None,
            consumption_topic: "calculate_material_consumption".to_string(),
            poll_interval_ms: 1000,
            max_retries: 5,
        }
    }
}
