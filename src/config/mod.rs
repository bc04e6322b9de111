//! # Configuration Management Module
//!
//! Centralized configuration for the gOwOrk server: type-safe structs
//! with serde, sensible defaults for every field, and TOML persistence.
//!
//! ## Configuration Structure
//!
//! - [`ServerConfig`] - Listener address, connection and session limits
//! - [`StorageConfig`] - Data directory for the sled database
//! - [`LoggingConfig`] - Log level and file destinations
//! - [`SecurityConfig`] - Registration policy and Argon2 tuning
//! - [`GameConfig`] - World defaults and the maintenance cadence
//!
//! ## Usage
//!
//! ```rust,no_run
//! use gowork::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     println!("Listening on {}", config.server.bind_addr);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [server]
//! bind_addr = "127.0.0.1:7171"
//! max_connections = 64
//! session_timeout_minutes = 30
//!
//! [storage]
//! data_dir = "./data"
//!
//! [logging]
//! level = "info"
//! file = "gowork.log"
//! security_file = "gowork-security.log"
//!
//! [game]
//! default_weather = "sunny"
//! boss_respawn_secs = 10
//! maintenance_interval_secs = 300
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::game::types::WeatherKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub security: Option<SecurityConfig>,
    #[serde(default)]
    pub game: GameConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the JSON-lines TCP listener binds to.
    pub bind_addr: String,
    /// Concurrent connection cap; further connects wait in the backlog.
    pub max_connections: usize,
    /// Idle sessions are disconnected after this many minutes.
    pub session_timeout_minutes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    #[serde(default)]
    pub security_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Argon2Config {
    #[serde(default)]
    pub memory_kib: Option<u32>,
    #[serde(default)]
    pub time_cost: Option<u32>,
    #[serde(default)]
    pub parallelism: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// When false, only managers can create accounts.
    #[serde(default = "default_allow_registration")]
    pub allow_registration: bool,
    #[serde(default)]
    pub argon2: Option<Argon2Config>,
}

fn default_allow_registration() -> bool {
    true
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            allow_registration: true,
            argon2: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Weather seeded into a brand new store.
    #[serde(default)]
    pub default_weather: WeatherKind,
    /// Seconds between a boss kill and its respawn.
    #[serde(default = "default_boss_respawn_secs")]
    pub boss_respawn_secs: i64,
    /// Cadence of the background tick that prunes expired quests and
    /// refills the pool.
    #[serde(default = "default_maintenance_interval_secs")]
    pub maintenance_interval_secs: u64,
}

fn default_boss_respawn_secs() -> i64 {
    10
}

fn default_maintenance_interval_secs() -> u64 {
    300
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            default_weather: WeatherKind::Sunny,
            boss_respawn_secs: default_boss_respawn_secs(),
            maintenance_interval_secs: default_maintenance_interval_secs(),
        }
    }
}

impl Config {
    /// Load configuration from a file.
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;
        config.validate()?;

        Ok(config)
    }

    /// Create a default configuration file.
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.server
            .bind_addr
            .parse::<std::net::SocketAddr>()
            .map_err(|e| anyhow!("server.bind_addr '{}': {}", self.server.bind_addr, e))?;
        if self.server.max_connections == 0 {
            return Err(anyhow!("server.max_connections must be at least 1"));
        }
        if self.storage.data_dir.trim().is_empty() {
            return Err(anyhow!("storage.data_dir must not be empty"));
        }
        if self.game.boss_respawn_secs < 0 {
            return Err(anyhow!("game.boss_respawn_secs must not be negative"));
        }
        if self.game.maintenance_interval_secs == 0 {
            return Err(anyhow!("game.maintenance_interval_secs must be at least 1"));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                bind_addr: "127.0.0.1:7171".to_string(),
                max_connections: 64,
                session_timeout_minutes: 30,
            },
            storage: StorageConfig {
                data_dir: "./data".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("gowork.log".to_string()),
                security_file: Some("gowork-security.log".to_string()),
            },
            security: Some(SecurityConfig::default()),
            game: GameConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid_and_round_trips() {
        let config = Config::default();
        config.validate().expect("default config validates");

        let toml_text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_text).unwrap();
        assert_eq!(parsed.server.bind_addr, config.server.bind_addr);
        assert_eq!(parsed.storage.data_dir, config.storage.data_dir);
        assert_eq!(parsed.game.boss_respawn_secs, 10);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let minimal = r#"
            [server]
            bind_addr = "0.0.0.0:9000"
            max_connections = 8
            session_timeout_minutes = 5

            [storage]
            data_dir = "/tmp/gowork"

            [logging]
            level = "debug"
        "#;
        let config: Config = toml::from_str(minimal).unwrap();
        assert_eq!(config.game.default_weather, WeatherKind::Sunny);
        assert_eq!(config.game.maintenance_interval_secs, 300);
        assert!(config.security.is_none());
        assert!(config.logging.file.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn bad_bind_addr_is_rejected() {
        let mut config = Config::default();
        config.server.bind_addr = "not-an-address".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_connection_cap_is_rejected() {
        let mut config = Config::default();
        config.server.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn registration_toggle_defaults_open() {
        let section: SecurityConfig = toml::from_str("").unwrap();
        assert!(section.allow_registration);

        let closed: SecurityConfig = toml::from_str("allow_registration = false").unwrap();
        assert!(!closed.allow_registration);
    }
}
