use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    /// Exact origins allowed to make cross-origin requests. Empty disables CORS.
    #[serde(default)]
    pub trusted_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// One of development, staging, production. Reported by the healthcheck.
    pub environment: String,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Filesystem,
    S3,
}

#[derive(Debug, Deserialize, Clone)]
pub struct S3Config {
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    #[serde(default = "default_path_style")]
    pub path_style: bool,
}

fn default_path_style() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Directory images are written to by the filesystem backend.
    pub images_dir: PathBuf,
    /// Mount point for static image serving (filesystem backend only).
    pub images_url_prefix: String,
    /// Prefix joined with an image's stored name to build its `image_url`.
    pub public_base_url: String,
    pub s3: Option<S3Config>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LimiterConfig {
    pub enabled: bool,
    /// Tokens refilled per second for each client.
    pub rps: f64,
    /// Bucket capacity for each client.
    pub burst: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub expiration_secs: u64,
    pub cleanup_secs: u64,
    /// Upper bound on cached responses.
    pub max_entries: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub limiter: LimiterConfig,
    pub cache: CacheConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 4000)?
            .set_default("server.environment", "development")?
            .set_default("server.cors.max_age", 3600)?
            .set_default("database.max_connections", 25)?
            .set_default("database.min_connections", 5)?
            .set_default("database.idle_timeout_secs", 900)?
            .set_default("storage.backend", "filesystem")?
            .set_default("storage.images_dir", "./images")?
            .set_default("storage.images_url_prefix", "/v1/image")?
            .set_default("storage.public_base_url", "http://localhost:4000/v1/image/")?
            .set_default("limiter.enabled", false)?
            .set_default("limiter.rps", 10.0)?
            .set_default("limiter.burst", 4)?
            .set_default("cache.enabled", true)?
            .set_default("cache.expiration_secs", 600)?
            .set_default("cache.cleanup_secs", 1200)?
            .set_default("cache.max_entries", 10_000)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., GRENADES__DATABASE__URL)
            .add_source(
                Environment::with_prefix("GRENADES")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors.trusted_origins")
                    .try_parsing(true),
            )
            .build()?;

        s.try_deserialize()
    }
}
