// src/config.rs
use clap::Parser;
use governor::Quota;
use log::info;
use parking_lot::RwLock;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use crate::connector::Connector;

#[derive(Debug, Clone, Parser)]
#[command(name = "srcds_exporter", about = "Prometheus exporter for Source dedicated servers", version)]
pub struct Cli {
    /// The address to listen on for HTTP requests
    #[arg(long = "web.listen-address", env = "SRCDS_LISTEN_ADDRESS", default_value = "0.0.0.0:9137")]
    pub listen_address: String,

    /// Path the metrics will be exposed under
    #[arg(long = "web.telemetry-path", env = "SRCDS_TELEMETRY_PATH", default_value = "/metrics")]
    pub telemetry_path: String,

    /// Config reloads allowed per minute and client
    #[arg(long = "web.reload-limit", env = "SRCDS_RELOAD_LIMIT", default_value_t = 6)]
    pub reload_limit: u32,

    /// Comma separated list of active collectors
    #[arg(
        long = "collectors.enabled",
        env = "SRCDS_COLLECTORS",
        default_value = "map,playercount",
        value_delimiter = ','
    )]
    pub collectors: Vec<String>,

    /// Print available collectors and exit
    #[arg(long = "collectors.print")]
    pub print_collectors: bool,

    /// Config file to use
    #[arg(long = "config.file", env = "SRCDS_CONFIG_FILE", default_value = "./srcds.yaml")]
    pub config_file: PathBuf,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    pub fn reload_quota(&self) -> Quota {
        Quota::per_minute(NonZeroU32::new(self.reload_limit).unwrap_or(NonZeroU32::MIN))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config: {0}")]
    Yaml(#[from] serde_yml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum QueryMode {
    #[default]
    #[serde(rename = "RCON")]
    Rcon,
    #[serde(rename = "ServerQuery")]
    ServerQuery,
}

fn duration<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Options {
    #[serde(deserialize_with = "duration")]
    pub connect_timeout: Duration,
    #[serde(deserialize_with = "duration")]
    pub cache_expiration: Duration,
    #[serde(deserialize_with = "duration")]
    pub cache_cleanup_interval: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            cache_expiration: Duration::from_secs(10),
            cache_cleanup_interval: Duration::from_secs(11),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    pub address: String,
    #[serde(default)]
    pub rcon_password: String,
    #[serde(default)]
    pub mode: QueryMode,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub options: Options,
    #[serde(default)]
    pub servers: HashMap<String, Server>,
}

/// Everything a single connection needs. Never changes for a live connection;
/// new options mean a new connection.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionOptions {
    pub address: String,
    pub mode: QueryMode,
    pub rcon_password: String,
    pub connect_timeout: Duration,
    pub cache_expiration: Duration,
    pub cache_cleanup_interval: Duration,
}

impl Config {
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let options = &self.options;
        for (field, value) in [
            ("connectTimeout", options.connect_timeout),
            ("cacheExpiration", options.cache_expiration),
            ("cacheCleanupInterval", options.cache_cleanup_interval),
        ] {
            if value.is_zero() {
                return Err(ConfigError::Invalid(format!("options.{} must be greater than zero", field)));
            }
        }

        for (name, server) in &self.servers {
            if server.address.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("server {} has no address", name)));
            }
            if server.mode == QueryMode::Rcon && server.rcon_password.is_empty() {
                return Err(ConfigError::Invalid(format!("server {} uses RCON but has no rconPassword", name)));
            }
        }
        Ok(())
    }

    pub fn connection_options(&self, server: &Server) -> ConnectionOptions {
        ConnectionOptions {
            address: server.address.clone(),
            mode: server.mode,
            rcon_password: server.rcon_password.clone(),
            connect_timeout: self.options.connect_timeout,
            cache_expiration: self.options.cache_expiration,
            cache_cleanup_interval: self.options.cache_cleanup_interval,
        }
    }
}

/// The config file currently in effect, replaced wholesale on reload.
pub struct CurrentConfig {
    path: PathBuf,
    config: RwLock<Config>,
}

impl CurrentConfig {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            config: RwLock::new(Config::default()),
        }
    }

    pub fn snapshot(&self) -> Config {
        self.config.read().clone()
    }

    /// Re-reads the file and opens connections for servers not seen before.
    /// Connections to known addresses are left alone.
    pub async fn reload(&self, connector: &Connector) -> Result<(), ConfigError> {
        let config = Config::load(&self.path).await?;
        connector.load(&config).await;
        *self.config.write() = config;
        info!("Loaded config file {}", self.path.display());
        Ok(())
    }
}
