//! Configuration for Chat Front server.

use serde::Deserialize;
use std::path::PathBuf;

/// Snapshot storage backend
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub enum StorageType {
    /// In-memory snapshots (single process, volatile)
    Standalone,
    /// Redis-backed snapshots (shared across processes)
    Scalable,
}

impl StorageType {
    fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "scalable" | "redis" => StorageType::Scalable,
            _ => StorageType::Standalone,
        }
    }
}

/// Configuration for snapshot persistence
#[derive(Clone, Debug, Deserialize)]
pub struct SnapshotConfig {
    /// Snapshot backend
    pub storage_type: StorageType,

    /// Snapshot time-to-live in seconds
    pub ttl_sec: u64,

    /// Maximum number of snapshots kept in memory (Standalone only)
    pub max_entries: u64,

    /// Redis URL (Scalable only)
    pub redis_url: String,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            storage_type: StorageType::Standalone,
            ttl_sec: 86400, // 1 day
            max_entries: 10000,
            redis_url: "redis://127.0.0.1:6379".to_string(),
        }
    }
}

impl SnapshotConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            storage_type: std::env::var("CHAT_FRONT_STORAGE_TYPE")
                .map(|s| StorageType::parse(&s))
                .unwrap_or(default.storage_type),
            ttl_sec: std::env::var("CHAT_FRONT_SNAPSHOT_TTL_SEC")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.ttl_sec),
            max_entries: std::env::var("CHAT_FRONT_SNAPSHOT_MAX_ENTRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.max_entries),
            redis_url: std::env::var("REDIS_URL").unwrap_or(default.redis_url),
        }
    }
}

/// Configuration for source files (derivation, hydration and serving)
#[derive(Clone, Debug, Deserialize)]
pub struct FileConfig {
    /// Local directory all derived file paths are relative to
    pub file_root: PathBuf,

    /// First path segments the file endpoint may serve from
    pub allowed_roots: Vec<String>,

    /// URL prefix used to build citation URLs (`<prefix>/<filePath>`)
    pub url_prefix: String,

    /// `<remote-store>` segment of remote file paths
    pub remote_store: String,

    /// Base URL for remote downloads; hydration is disabled when unset
    pub remote_base_url: Option<String>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            file_root: PathBuf::from("."),
            allowed_roots: vec!["output".to_string(), "data".to_string()],
            url_prefix: "/api/files".to_string(),
            remote_store: "cloud".to_string(),
            remote_base_url: None,
        }
    }
}

impl FileConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            file_root: std::env::var("CHAT_FRONT_FILE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(default.file_root),
            allowed_roots: std::env::var("CHAT_FRONT_ALLOWED_FILE_ROOTS")
                .ok()
                .map(|s| {
                    s.split(',')
                        .map(|t| t.trim().to_string())
                        .filter(|t| !t.is_empty())
                        .collect()
                })
                .unwrap_or(default.allowed_roots),
            url_prefix: std::env::var("CHAT_FRONT_FILE_SERVER_URL_PREFIX")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(default.url_prefix),
            remote_store: std::env::var("CHAT_FRONT_REMOTE_STORE")
                .unwrap_or(default.remote_store),
            remote_base_url: std::env::var("CHAT_FRONT_REMOTE_FILE_BASE_URL")
                .ok()
                .filter(|s| !s.is_empty()),
        }
    }
}

/// Log output format
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Plain,
    Json,
}

/// Combined server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Server bind address
    pub bind_addr: String,

    /// Log output format
    pub log_format: LogFormat,

    /// Snapshot persistence config
    pub snapshot: SnapshotConfig,

    /// Source file config
    pub files: FileConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            log_format: LogFormat::Plain,
            snapshot: SnapshotConfig::default(),
            files: FileConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("CHAT_FRONT_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:8000".to_string()),
            log_format: match std::env::var("CHAT_FRONT_LOG_FORMAT") {
                Ok(s) if s.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Plain,
            },
            snapshot: SnapshotConfig::from_env(),
            files: FileConfig::from_env(),
        }
    }
}
