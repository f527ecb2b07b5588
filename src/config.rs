//! Application configuration
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! the `PORT` and `DEBUG` environment variables.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::*;
use crate::error::ConfigError;

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "RELAY_CONFIG";

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub relay: RelaySettings,
}

/// HTTP / WebSocket listener settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: IpAddr,
    pub port: u16,
    /// Directory holding `index.html`, `mobile.html` and `pc.html`
    pub static_dir: PathBuf,
    pub debug: bool,
    /// Disconnect clients silent for this long; 0 disables the check
    pub idle_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::from([0, 0, 0, 0]),
            port: DEFAULT_PORT,
            static_dir: PathBuf::from("static"),
            debug: false,
            idle_timeout_secs: 0,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }
}

/// Relay core settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RelaySettings {
    /// Number of recent chunks kept for replay
    pub buffer_capacity: usize,
    /// Outbound events queued per client before new ones are dropped
    pub client_queue_capacity: usize,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            buffer_capacity: AUDIO_BUFFER_CAPACITY,
            client_queue_capacity: CLIENT_QUEUE_CAPACITY,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default locations and the process environment
    pub fn load() -> crate::Result<Self> {
        Self::load_from(config_file_path().as_deref(), |name| std::env::var(name).ok())
    }

    /// Layer an optional config file and `lookup` over the defaults
    ///
    /// A path that does not exist falls back to the defaults.
    pub fn load_from<F>(path: Option<&Path>, lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(path)?,
            _ => Self::default(),
        };
        config.apply_env(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Override settings from `PORT` and `DEBUG`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("PORT") {
            self.server.port = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidEnv { name: "PORT", value })?;
        }
        if let Some(value) = lookup("DEBUG") {
            self.server.debug = value.trim().eq_ignore_ascii_case("true");
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.relay.buffer_capacity == 0 {
            return Err(ConfigError::Invalid("relay.buffer_capacity must be at least 1".into()));
        }
        if self.relay.client_queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "relay.client_queue_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// `RELAY_CONFIG` if set, otherwise `config.toml` in the platform config dir
fn config_file_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return Some(PathBuf::from(path));
    }
    ProjectDirs::from("", "", "audio-relay").map(|dirs| dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 5000);
        assert!(!config.server.debug);
        assert_eq!(config.relay.buffer_capacity, 100);
        assert!(config.server.idle_timeout().is_none());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[("PORT", "8123"), ("DEBUG", "True")]))
            .unwrap();
        assert_eq!(config.server.port, 8123);
        assert!(config.server.debug);

        config.apply_env(env(&[("DEBUG", "yes")])).unwrap();
        assert!(!config.server.debug);
    }

    #[test]
    fn test_invalid_port() {
        let mut config = AppConfig::default();
        let err = config.apply_env(env(&[("PORT", "not-a-port")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { name: "PORT", .. }));
    }

    #[test]
    fn test_partial_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            [server]
            port = 7000
            idle_timeout_secs = 30

            [relay]
            buffer_capacity = 20
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.server.idle_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.server.static_dir, PathBuf::from("static"));
        assert_eq!(config.relay.buffer_capacity, 20);
        assert_eq!(config.relay.client_queue_capacity, 256);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut config = AppConfig::default();
        config.relay.buffer_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file_then_env() {
        let path = std::env::temp_dir().join(format!("relay-config-{}.toml", std::process::id()));
        std::fs::write(&path, "[server]\nport = 7000\ndebug = true\n").unwrap();

        let config = AppConfig::load_from(Some(&path), env(&[("PORT", "7100")])).unwrap();
        assert_eq!(config.server.port, 7100);
        assert!(config.server.debug);

        let missing = path.with_extension("absent");
        assert_eq!(
            AppConfig::load_from(Some(&missing), env(&[])).unwrap(),
            AppConfig::default()
        );

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_load_errors_are_config_errors() {
        let path = std::env::temp_dir().join(format!("relay-bad-{}.toml", std::process::id()));
        std::fs::write(&path, "[server\nport = ").unwrap();

        let err = AppConfig::load_from(Some(&path), env(&[])).unwrap_err();
        assert!(matches!(err, crate::Error::Config(ConfigError::Parse { .. })));

        let err = AppConfig::load_from(None, env(&[("PORT", "99999")])).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Config(ConfigError::InvalidEnv { name: "PORT", .. })
        ));

        let _ = std::fs::remove_file(path);
    }
}
