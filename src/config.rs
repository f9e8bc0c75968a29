//! Configuration loading and types for Curio.
//!
//! Configuration is read from a YAML file and deserialized into the
//! [`Config`] struct.  Each subsection governs a different part of the
//! system: networking, metadata persistence, blob storage, and logging.

use serde::Deserialize;
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Metadata store settings.
    #[serde(default)]
    pub metadata: MetadataConfig,

    /// Blob storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind host address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum accepted upload size in bytes (default 25 MiB).
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: text or json.
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Metadata store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetadataConfig {
    /// Backend type: `sqlite` or `memory`.
    #[serde(default = "default_metadata_engine")]
    pub engine: String,

    /// SQLite-specific configuration.
    #[serde(default)]
    pub sqlite: SqliteConfig,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            engine: default_metadata_engine(),
            sqlite: SqliteConfig::default(),
        }
    }
}

/// SQLite-specific metadata configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_metadata_path")]
    pub path: String,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: default_metadata_path(),
        }
    }
}

/// Blob storage backend configuration.
///
/// `bucket` and `public_url` apply to every backend: the bucket names the
/// namespace container and `public_url` is the base under which stored
/// blobs resolve (`{public_url}/{bucket}/{key}`).
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Backend type: `s3`, `local`, or `memory`.
    #[serde(default = "default_storage_backend")]
    pub backend: String,

    /// Bucket (namespace container) for stored blobs.
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Base URL under which blobs are publicly reachable.
    #[serde(default = "default_public_url")]
    pub public_url: String,

    /// S3 gateway configuration (MinIO or any S3-compatible store).
    #[serde(default)]
    pub s3: Option<S3StorageConfig>,

    /// Local filesystem configuration.
    #[serde(default)]
    pub local: LocalStorageConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            bucket: default_bucket(),
            public_url: default_public_url(),
            s3: None,
            local: LocalStorageConfig::default(),
        }
    }
}

/// S3 gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct S3StorageConfig {
    /// Region to present to the SDK.
    #[serde(default = "default_region")]
    pub region: String,

    /// Custom S3-compatible endpoint (e.g. MinIO at `http://localhost:9000`).
    #[serde(default)]
    pub endpoint_url: String,

    /// Force path-style URL addressing (required by MinIO).
    #[serde(default = "default_true")]
    pub use_path_style: bool,

    /// Explicit access key (falls back to the env/credential chain).
    #[serde(default)]
    pub access_key_id: String,

    /// Explicit secret key (falls back to the env/credential chain).
    #[serde(default)]
    pub secret_access_key: String,
}

/// Local filesystem storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LocalStorageConfig {
    /// Root directory for stored blobs.
    #[serde(default = "default_storage_root")]
    pub root_dir: String,
}

impl Default for LocalStorageConfig {
    fn default() -> Self {
        Self {
            root_dir: default_storage_root(),
        }
    }
}

// -- Defaults ----------------------------------------------------------------

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_upload_bytes() -> u64 {
    26_214_400 // 25 MiB
}

fn default_metadata_engine() -> String {
    "sqlite".to_string()
}

fn default_metadata_path() -> String {
    "./data/metadata.db".to_string()
}

fn default_storage_backend() -> String {
    "local".to_string()
}

fn default_bucket() -> String {
    "curio-objects".to_string()
}

fn default_public_url() -> String {
    "http://localhost:9000".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_storage_root() -> String {
    "./data/blobs".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

// -- Loader ------------------------------------------------------------------

/// Load and parse configuration from a YAML file at `path`.
pub fn load_config<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    let config: Config = serde_yaml::from_str(&contents)?;
    Ok(config)
}

// -- Tests --------------------------------------------------------------------
