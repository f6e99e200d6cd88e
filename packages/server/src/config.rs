use std::path::PathBuf;

use common::config::ObjectStoreConfig;
use common::storage::ChecksumEncoding;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::service::CacheSettings;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    #[serde(default)]
    pub allow_origins: Vec<String>,
    #[serde(default = "default_cors_max_age")]
    pub max_age: u64,
}

fn default_cors_max_age() -> u64 {
    3600
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: Vec::new(),
            max_age: default_cors_max_age(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub cors: CorsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3000,
            cors: CorsConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DatabaseConfig {
    /// Without a URL, metadata and references live in process memory.
    pub url: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Filesystem,
    Memory,
    Object,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_max_blob_size")]
    pub max_blob_size: u64,
    #[serde(default)]
    pub object: ObjectStoreConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data/files")
}

fn default_max_blob_size() -> u64 {
    100 * 1024 * 1024
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            data_dir: default_data_dir(),
            max_blob_size: default_max_blob_size(),
            object: ObjectStoreConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FileConfig {
    /// Digest name such as `SHA-1` or `SHA-256`.
    #[serde(default = "default_checksum_algorithm")]
    pub checksum_algorithm: String,
    #[serde(default)]
    pub checksum_encoding: ChecksumEncoding,
    /// Request body limit for uploads.
    #[serde(default = "default_max_blob_size")]
    pub max_upload_size: u64,
}

fn default_checksum_algorithm() -> String {
    "SHA-1".into()
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            checksum_algorithm: default_checksum_algorithm(),
            checksum_encoding: ChecksumEncoding::default(),
            max_upload_size: default_max_blob_size(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default)]
    pub metadata: CacheSettings,
    /// Capacity is in bytes.
    #[serde(default = "default_data_cache")]
    pub data: CacheSettings,
}

fn default_data_cache() -> CacheSettings {
    CacheSettings {
        max_capacity: 256 * 1024 * 1024,
        ..CacheSettings::default()
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            metadata: CacheSettings::default(),
            data: default_data_cache(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DownloadConfig {
    /// `Cache-Control: public, max-age=N` on downloads; zero omits the header.
    #[serde(default)]
    pub cache_control_max_age_secs: u64,
    /// Send the uploaded file name in `Content-Disposition`.
    #[serde(default)]
    pub keep_original_name: bool,
    /// Shorter names are answered with 404 without a lookup.
    #[serde(default = "default_min_unique_name_length")]
    pub min_unique_name_length: usize,
    /// Files above this size are streamed from storage instead of cached.
    #[serde(default = "default_stream_threshold")]
    pub stream_threshold_bytes: u64,
}

fn default_min_unique_name_length() -> usize {
    36
}

fn default_stream_threshold() -> u64 {
    8 * 1024 * 1024
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            cache_control_max_age_secs: 0,
            keep_original_name: false,
            min_unique_name_length: default_min_unique_name_length(),
            stream_threshold_bytes: default_stream_threshold(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct GcConfig {
    /// Zero disables the periodic sweep.
    #[serde(default)]
    pub interval_secs: u64,
    /// Owner types swept periodically and by default on demand.
    #[serde(default)]
    pub owner_types: Vec<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub file: FileConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(default)]
    pub gc: GcConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("STOWAGE_CONFIG").unwrap_or_else(|_| "config/config".into());

        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .add_source(File::with_name(&path).required(false))
            // Override from environment (e.g., STOWAGE__DATABASE__URL)
            .add_source(
                Environment::with_prefix("STOWAGE")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("gc.owner_types")
                    .with_list_parse_key("server.cors.allow_origins")
                    .try_parsing(true),
            )
            .build()?;

        s.try_deserialize()
    }
}
