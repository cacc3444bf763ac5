//! Configuration module for RouterView-RS
//!
//! This module handles application configuration including:
//! - Application config (`config.toml`): notification mode, discovery socket,
//!   logging, connection defaults
//! - Application state (`app_state.json`): known routers and the last view,
//!   see [`state`]
//!
//! Passwords are never part of either file.
//!
//! # App Data Location
//!
//! Application data is stored in the platform-appropriate location:
//! - **Linux**: `~/.local/share/dev.hxyulin.routerview-rs/`
//! - **macOS**: `~/Library/Application Support/dev.hxyulin.routerview-rs/`
//! - **Windows**: `%APPDATA%\dev.hxyulin.routerview-rs\`
//!
//! # Example
//!
//! ```ignore
//! use routerview_rs::config::AppConfig;
//!
//! let config = AppConfig::load_or_default();
//! let dispatcher = Dispatcher::from_mode(config.notify);
//! ```

pub mod state;

pub use state::{AppState, KnownRouter};

use crate::error::{Result, RouterViewError};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application identifier for data directories
pub const APP_ID: &str = "dev.hxyulin.routerview-rs";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Plain API port of the device
pub const API_PORT: u16 = 8728;

/// TLS API port of the device
pub const API_TLS_PORT: u16 = 8729;

/// UDP port of the neighbor discovery broadcast
pub const DISCOVERY_PORT: u16 = 5678;

/// Default read timeout of the discovery socket, which bounds how long a stop takes
pub const DEFAULT_DISCOVERY_POLL_MS: u64 = 250;

// ==================== App Data Directory ====================

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Ensure the app data directory exists
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir().ok_or_else(|| {
        RouterViewError::Config("Could not determine app data directory".to_string())
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            RouterViewError::Config(format!("Failed to create app data directory: {}", e))
        })?;
    }

    Ok(dir)
}

/// Get the path to the config file
pub fn config_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(CONFIG_FILE))
}

// ==================== Settings ====================

/// How observables deliver change notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotifyMode {
    /// Fire-and-forget on a shared worker thread
    #[default]
    Background,
    /// On the thread that made the change
    Inline,
}

/// Neighbor discovery listener settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Whether to listen for discovery broadcasts at all
    pub enabled: bool,
    /// Local address to bind
    pub bind_address: IpAddr,
    /// Local UDP port to bind
    pub port: u16,
    /// Socket read timeout in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DISCOVERY_PORT,
            poll_interval_ms: DEFAULT_DISCOVERY_POLL_MS,
        }
    }
}

impl DiscoveryConfig {
    /// Socket read timeout
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
    /// Directory for daily rolling log files; console only when unset
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info,routerview_rs=debug".to_string(),
            directory: None,
        }
    }
}

/// Defaults offered when adding a router
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionDefaults {
    /// Use the TLS API port
    pub ssl: bool,
    /// Default login name
    pub user: String,
}

impl Default for ConnectionDefaults {
    fn default() -> Self {
        Self {
            ssl: false,
            user: "admin".to_string(),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Notification delivery
    pub notify: NotifyMode,
    /// Discovery listener
    pub discovery: DiscoveryConfig,
    /// Logging
    pub logging: LoggingConfig,
    /// Connection defaults
    pub connection: ConnectionDefaults,
}

impl AppConfig {
    /// Load a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RouterViewError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        toml::from_str(&content).map_err(|e| {
            RouterViewError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Load the config from the default location, returning defaults on any error
    pub fn load_or_default() -> Self {
        let Some(path) = config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save the config to a file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| RouterViewError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path.as_ref(), content)
            .map_err(|e| RouterViewError::Config(format!("Failed to write config: {}", e)))
    }

    /// Save the config to the default location
    pub fn save_default(&self) -> Result<()> {
        let dir = ensure_app_data_dir()?;
        self.save(dir.join(CONFIG_FILE))
    }
}
