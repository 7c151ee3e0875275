//! Configuration module for the doctree server.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//! - CLI argument overrides (applied by the command handlers)
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `DOCTREE_` and use double underscores
//! to separate nested levels:
//! - `DOCTREE_HTTP__BIND=0.0.0.0:3333` sets `http.bind`
//! - `DOCTREE_WATCH__RECURSIVE=true` sets `watch.recursive`
//! - `DOCTREE_FRONTEND__DEV_SERVER=http://localhost:1234` enables the development proxy

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the registry state file inside the data directory.
pub const AUTOINDEX_FILE: &str = "autoindex";

/// Name of the index output directory inside the data directory.
pub const INDEX_DIR: &str = "index";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Where doctree stores its registry and index output
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// HTTP listener settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Filesystem watching and reindex scheduling
    #[serde(default)]
    pub watch: WatchConfig,

    /// Web client hosting
    #[serde(default)]
    pub frontend: FrontendConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
    /// Address to bind for the HTTP server
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Cloud mode only changes what the web client shows
    #[serde(default = "default_false")]
    pub cloud_mode: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WatchConfig {
    /// Watch nested directories of every project too
    #[serde(default = "default_false")]
    pub recursive: bool,

    /// Quiet period before a changed project is reindexed; 0 reindexes on every event
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// How long shutdown waits for an in-flight reindex
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,

    /// Capacity of the event and error channels between notify and the orchestrator
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FrontendConfig {
    /// Live asset server to proxy to instead of serving embedded assets
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev_server: Option<String>,

    /// On-disk asset directory consulted by the development proxy
    #[serde(default = "default_public_dir")]
    pub public_dir: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level for every target
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-target overrides, e.g. `"doctree::watcher" = "debug"`
    #[serde(default)]
    pub modules: IndexMap<String, String>,
}

fn default_version() -> u32 {
    1
}
fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".doctree"))
        .unwrap_or_else(|| PathBuf::from(".doctree"))
}
fn default_bind() -> String {
    "127.0.0.1:3333".to_string()
}
fn default_false() -> bool {
    false
}
fn default_debounce_ms() -> u64 {
    500
}
fn default_shutdown_grace_secs() -> u64 {
    5
}
fn default_channel_capacity() -> usize {
    100
}
fn default_public_dir() -> PathBuf {
    PathBuf::from("frontend/public")
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            data_dir: default_data_dir(),
            http: HttpConfig::default(),
            watch: WatchConfig::default(),
            frontend: FrontendConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cloud_mode: false,
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            recursive: false,
            debounce_ms: default_debounce_ms(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            dev_server: None,
            public_dir: default_public_dir(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: IndexMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from the default config file location.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::load_from(Self::default_config_path())
    }

    /// Default location of the settings file: `<default data dir>/settings.toml`.
    pub fn default_config_path() -> PathBuf {
        default_data_dir().join("settings.toml")
    }

    /// Load configuration from a specific file, layered over defaults and under
    /// `DOCTREE_` environment variables. A missing file is not an error.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            // Double underscore separates nested levels; single underscores stay in field names
            .merge(Env::prefixed("DOCTREE_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;
        Ok(())
    }

    /// Location of the durable auto-index registry.
    pub fn autoindex_path(&self) -> PathBuf {
        self.data_dir.join(AUTOINDEX_FILE)
    }

    /// Directory the index engine writes to and the HTTP layer reads from.
    pub fn index_dir(&self) -> PathBuf {
        self.data_dir.join(INDEX_DIR)
    }
}
