//! Configuration management for ifwatch
//!
//! Settings are read from `~/.config/ifwatch/config.toml` when present;
//! every field has a default so a partial file is fine.

use crate::error::{Error, Result};
use crate::service::DEFAULT_REFRESH_INTERVAL;
use serde::{Deserialize, Serialize};
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// ifwatch configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Query server options
    #[serde(default)]
    pub server: ServerConfig,
    /// Sampling options
    #[serde(default)]
    pub stats: StatsConfig,
}

/// Query server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address; `:port` binds all interfaces
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

/// Sampling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Refresh interval in milliseconds
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_ms: u64,
    /// Log every interface after each refresh (debug level)
    #[serde(default = "default_true")]
    pub log_interfaces: bool,
}

// Default value functions
fn default_listen_addr() -> String {
    ":8080".to_string()
}

fn default_refresh_interval() -> u64 {
    DEFAULT_REFRESH_INTERVAL.as_millis() as u64
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: default_refresh_interval(),
            log_interfaces: true,
        }
    }
}

impl ServerConfig {
    /// Resolve the listen address
    ///
    /// Accepts `host:port`, `ip:port`, or `:port` (all interfaces).
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let addr = self.listen_addr.trim();
        let full = if addr.starts_with(':') {
            format!("0.0.0.0{}", addr)
        } else {
            addr.to_string()
        };

        if let Ok(parsed) = full.parse::<SocketAddr>() {
            return Ok(parsed);
        }

        full.to_socket_addrs()
            .map_err(|e| Error::Config(format!("Invalid listen address {:?}: {}", addr, e)))?
            .next()
            .ok_or_else(|| Error::Config(format!("Listen address {:?} did not resolve", addr)))
    }
}

impl StatsConfig {
    /// Refresh interval as a [`Duration`]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.refresh_interval_ms == 0 {
            return Err(Error::Config(
                "refresh_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Get the default configuration directory
    ///
    /// Returns `~/.config/ifwatch` on Unix-like systems,
    /// or `%APPDATA%\ifwatch` on Windows.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = if cfg!(windows) {
            std::env::var("APPDATA")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("."))
        } else {
            std::env::var("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|_| PathBuf::from(".config"))
        };

        Ok(config_dir.join("ifwatch"))
    }

    /// Load configuration from the default path, falling back to defaults
    pub fn load() -> Result<Self> {
        let config_file = Self::default_path()?.join("config.toml");

        if !config_file.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&config_file)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| Error::Parse(format!("Failed to parse config: {}", e)))?;
        config.stats.validate()?;
        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_dir = Self::default_path()?;
        std::fs::create_dir_all(&config_dir)?;
        self.save_to(&config_dir.join("config.toml"))
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
