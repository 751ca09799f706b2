//! Configuration loading and typed config structures for the Kitty server.
//!
//! The configuration lives in `kitty-config.yaml` (or the file named by
//! `KITTY_CONFIG`). Every section is optional; missing values fall back to
//! the defaults below. The autonomous transition table is fixed policy and
//! is deliberately not configurable here.

use std::path::Path;

use serde::Deserialize;

/// Default config file name, resolved relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "kitty-config.yaml";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is not usable.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level server configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct KittyConfig {
    /// Listener settings.
    #[serde(default)]
    pub server: ServerSection,

    /// Connection liveness probing.
    #[serde(default)]
    pub liveness: LivenessConfig,

    /// Fan-out channel sizing.
    #[serde(default)]
    pub broadcast: BroadcastConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl KittyConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override file values:
    /// - `KITTY_HOST` overrides `server.host`
    /// - `KITTY_PORT` overrides `server.port`
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Load from `path` if it exists, otherwise start from defaults.
    ///
    /// Returns the config and whether a file was actually read.
    pub fn load_or_default(path: &Path) -> Result<(Self, bool), ConfigError> {
        if path.exists() {
            Ok((Self::from_file(path)?, true))
        } else {
            let mut config = Self::default();
            config.apply_env_overrides()?;
            Ok((config, false))
        }
    }

    /// Parse configuration from a YAML string and apply environment
    /// overrides.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `KITTY_HOST` / `KITTY_PORT` from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("KITTY_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("KITTY_PORT") {
            self.server.port = port.parse().map_err(|e| ConfigError::Invalid {
                reason: format!("KITTY_PORT {port:?}: {e}"),
            })?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let prefix = &self.server.path_prefix;
        if !prefix.starts_with('/') || prefix.ends_with('/') {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "server.path_prefix must start and must not end with '/', got {prefix:?}"
                ),
            });
        }
        if self.liveness.ping_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                reason: "liveness.ping_interval_secs must be at least 1".to_owned(),
            });
        }
        if self.broadcast.capacity == 0 {
            return Err(ConfigError::Invalid {
                reason: "broadcast.capacity must be at least 1".to_owned(),
            });
        }
        Ok(())
    }
}

/// Listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSection {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path the game `WebSocket` is served under. Both `{prefix}` and
    /// `{prefix}/` are accepted.
    #[serde(default = "default_path_prefix")]
    pub path_prefix: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            path_prefix: default_path_prefix(),
        }
    }
}

/// Liveness probe configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LivenessConfig {
    /// Seconds between `PING` frames. A connection that stays silent for a
    /// whole interval after a probe is closed.
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            ping_interval_secs: default_ping_interval_secs(),
        }
    }
}

/// Broadcast channel configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BroadcastConfig {
    /// Frames buffered per subscriber before it starts lagging.
    #[serde(default = "default_broadcast_capacity")]
    pub capacity: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            capacity: default_broadcast_capacity(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    8080
}

fn default_path_prefix() -> String {
    "/kitty-game-server".to_owned()
}

const fn default_ping_interval_secs() -> u64 {
    30
}

const fn default_broadcast_capacity() -> usize {
    256
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = KittyConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.path_prefix, "/kitty-game-server");
        assert_eq!(config.liveness.ping_interval_secs, 30);
        assert_eq!(config.broadcast.capacity, 256);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  port: 9090
  path_prefix: "/kitty"

liveness:
  ping_interval_secs: 5

broadcast:
  capacity: 16

logging:
  level: "debug"
  json: true
"#;
        let mut config: KittyConfig = serde_yml::from_str(yaml).unwrap();
        config.apply_overrides(|_| None).unwrap();
        assert!(config.validate().is_ok());

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.path_prefix, "/kitty");
        assert_eq!(config.liveness.ping_interval_secs, 5);
        assert_eq!(config.broadcast.capacity, 16);
        assert!(config.logging.json);
    }

    #[test]
    fn partial_yaml_uses_defaults() {
        let config: KittyConfig = serde_yml::from_str("server:\n  port: 1234\n").unwrap();
        assert_eq!(config.server.port, 1234);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.liveness, LivenessConfig::default());
    }

    #[test]
    fn overrides_replace_host_and_port() {
        let mut config = KittyConfig::default();
        config
            .apply_overrides(|key| match key {
                "KITTY_HOST" => Some("10.0.0.1".to_owned()),
                "KITTY_PORT" => Some("7000".to_owned()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.server.host, "10.0.0.1");
        assert_eq!(config.server.port, 7000);
    }

    #[test]
    fn bad_port_override_is_rejected() {
        let mut config = KittyConfig::default();
        let result = config.apply_overrides(|key| (key == "KITTY_PORT").then(|| "nope".to_owned()));
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn root_or_trailing_slash_prefix_is_invalid() {
        let mut config = KittyConfig::default();
        config.server.path_prefix = "/".to_owned();
        assert!(config.validate().is_err());
        config.server.path_prefix = "/kitty/".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_ping_interval_is_invalid() {
        let mut config = KittyConfig::default();
        config.liveness.ping_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn relative_path_prefix_is_invalid() {
        let mut config = KittyConfig::default();
        config.server.path_prefix = "kitty".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        let result: Result<KittyConfig, _> = serde_yml::from_str("server: [unclosed");
        assert!(result.is_err());
    }
}
