//! Server configuration.
//!
//! Read from a JSON file (default `arena.json`, overridable with
//! `ARENA_CONFIG`); every field has a default so the file is optional.
//! `ARENA_PORT` overrides the port.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::info;
use serde::Deserialize;
use thiserror::Error;

use arena_shared::{DEFAULT_PORT, SERVER_TICK_RATE};

use crate::world::SimConfig;

/// Default config file name
pub const DEFAULT_CONFIG_PATH: &str = "arena.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid value {value:?} for {name}")]
    InvalidEnv { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// Simulation ticks per second
    pub tick_rate: u32,
    /// Sessions end with a timeout result after this many ticks
    pub max_session_ticks: u64,
    /// Enemies only aggro on players they can see
    pub require_line_of_sight: bool,
    pub zones_path: PathBuf,
    /// Zone used by the local driver when none is given
    pub default_zone: u32,
    /// Seconds without packets before a client is dropped
    pub client_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            tick_rate: SERVER_TICK_RATE,
            // 10 minutes at the default rate
            max_session_ticks: 12_000,
            require_line_of_sight: true,
            zones_path: PathBuf::from("zones.json"),
            default_zone: 1,
            client_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    /// Load from `ARENA_CONFIG` (or `arena.json`) and apply env overrides
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var("ARENA_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::load(&path)?;

        if let Ok(value) = std::env::var("ARENA_PORT") {
            config.port = value
                .parse()
                .map_err(|_| ConfigError::InvalidEnv { name: "ARENA_PORT", value })?;
        }

        Ok(config)
    }

    /// Load from a file. A missing file gives the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No config file at {:?}, using defaults", path);
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }

    pub fn client_timeout(&self) -> Duration {
        Duration::from_secs(self.client_timeout_secs)
    }

    pub fn sim_config(&self) -> SimConfig {
        SimConfig {
            tick_rate: self.tick_rate.max(1),
            require_line_of_sight: self.require_line_of_sight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: ServerConfig = serde_json::from_str(r#"{ "port": 9000, "tick_rate": 30 }"#).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.tick_rate, 30);
        assert!(config.require_line_of_sight);
        assert_eq!(config.sim_config().tick_rate, 30);
    }

    #[test]
    fn test_missing_file_is_default() {
        let config = ServerConfig::load("/nonexistent/arena.json").unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.tick_duration(), Duration::from_millis(50));
    }

    #[test]
    fn test_bad_json_is_an_error() {
        let path = std::env::temp_dir().join(format!("arena_config_{}.json", std::process::id()));
        std::fs::write(&path, "{ port: nope").unwrap();
        let err = ServerConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        std::fs::remove_file(&path).ok();
    }
}
