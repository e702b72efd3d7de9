//! Server Configuration
//!
//! Defaults suit a single-table deployment; every field can be overridden
//! from `TOMBOLA_*` environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use crate::network::server::RealtimeConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable holds an unparseable value.
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue {
        /// Environment variable name.
        var: &'static str,
        /// Offending value.
        value: String,
    },

    /// A numeric setting must be at least 1.
    #[error("{var} must be at least 1")]
    Zero {
        /// Environment variable name.
        var: &'static str,
    },
}

/// Top-level server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP request surface bind address.
    pub api_addr: SocketAddr,
    /// Real-time WebSocket bind address.
    pub realtime_addr: SocketAddr,
    /// Maximum concurrent real-time connections.
    pub max_connections: usize,
    /// Per-session outbound queue depth.
    pub session_buffer: usize,
    /// JSON history file. `None` keeps history in memory.
    pub history_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            realtime_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 1000,
            session_buffer: 64,
            history_path: Some(PathBuf::from("tombola_history.json")),
        }
    }
}

impl ServerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Create config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            api_addr: parse_or(&lookup, "TOMBOLA_API_ADDR", defaults.api_addr)?,
            realtime_addr: parse_or(&lookup, "TOMBOLA_REALTIME_ADDR", defaults.realtime_addr)?,
            max_connections: parse_or(&lookup, "TOMBOLA_MAX_CONNECTIONS", defaults.max_connections)?,
            session_buffer: parse_or(&lookup, "TOMBOLA_SESSION_BUFFER", defaults.session_buffer)?,
            history_path: match lookup("TOMBOLA_HISTORY_PATH") {
                Some(path) if path.trim().is_empty() => None,
                Some(path) => Some(PathBuf::from(path)),
                None => defaults.history_path,
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::Zero {
                var: "TOMBOLA_MAX_CONNECTIONS",
            });
        }
        if self.session_buffer == 0 {
            return Err(ConfigError::Zero {
                var: "TOMBOLA_SESSION_BUFFER",
            });
        }
        Ok(())
    }

    /// Settings for the real-time server.
    pub fn realtime(&self) -> RealtimeConfig {
        RealtimeConfig {
            bind_addr: self.realtime_addr,
            max_connections: self.max_connections,
        }
    }
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.api_addr.port(), 5000);
        assert_eq!(config.realtime_addr.port(), 8080);
        assert_eq!(config.max_connections, 1000);
        assert_eq!(config.session_buffer, 64);
        assert!(config.history_path.is_some());
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("TOMBOLA_API_ADDR", "127.0.0.1:9000"),
            ("TOMBOLA_MAX_CONNECTIONS", " 10 "),
            ("TOMBOLA_HISTORY_PATH", "/tmp/games.json"),
        ]))
        .unwrap();

        assert_eq!(config.api_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.history_path, Some(PathBuf::from("/tmp/games.json")));
        assert_eq!(config.realtime().max_connections, 10);
        assert_eq!(config.realtime().bind_addr.port(), 8080);
    }

    #[test]
    fn test_empty_history_path_selects_memory() {
        let config =
            ServerConfig::from_lookup(lookup_from(&[("TOMBOLA_HISTORY_PATH", "")])).unwrap();
        assert!(config.history_path.is_none());
    }

    #[test]
    fn test_invalid_values() {
        let err = ServerConfig::from_lookup(lookup_from(&[("TOMBOLA_SESSION_BUFFER", "lots")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                var: "TOMBOLA_SESSION_BUFFER",
                ..
            }
        ));

        let err = ServerConfig::from_lookup(lookup_from(&[("TOMBOLA_SESSION_BUFFER", "0")]))
            .unwrap_err();
        assert_eq!(err.to_string(), "TOMBOLA_SESSION_BUFFER must be at least 1");
    }
}
