//! Configuration types for futures-bot
//!
//! Credentials and the testnet/live switch come from the process
//! environment (optionally seeded from a `.env` file). Everything else is
//! read from an optional TOML file where every key has a default.

use crate::broker::{BinanceConfig, Credentials, Environment};
use crate::strategy::{FinalSlice, PollConfig};
use crate::telemetry::LogFormat;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the API key
pub const API_KEY_VAR: &str = "BINANCE_API_KEY";
/// Environment variable holding the API secret
pub const API_SECRET_VAR: &str = "BINANCE_API_SECRET";
/// Environment variable selecting testnet (default) or live
pub const TESTNET_VAR: &str = "BINANCE_TESTNET";

/// Environment configuration errors
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("API keys not found. Set {API_KEY_VAR} and {API_SECRET_VAR} in the environment or a .env file")]
    MissingCredentials,

    #[error("Invalid value {value:?} for {name}: expected true or false")]
    InvalidFlag { name: &'static str, value: String },
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub oco: OcoConfig,
    #[serde(default)]
    pub twap: TwapConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Broker connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    /// Live REST API or in-memory paper broker
    #[serde(default)]
    pub mode: ExecutionMode,

    /// Signed request validity window in milliseconds
    #[serde(default = "default_recv_window_ms")]
    pub recv_window_ms: u64,

    /// Per-request HTTP timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Execution mode: real REST API or paper trading
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Binance REST API; testnet or production per `BINANCE_TESTNET`
    #[default]
    Live,
    /// In-memory broker, no network
    Paper,
}

fn default_recv_window_ms() -> u64 {
    5000
}
fn default_timeout_secs() -> u64 {
    10
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Live,
            recv_window_ms: default_recv_window_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl BrokerConfig {
    /// Client configuration for the given environment
    pub fn binance_config(&self, environment: Environment) -> BinanceConfig {
        BinanceConfig::new(environment)
            .with_recv_window(self.recv_window_ms)
            .with_timeout(Duration::from_secs(self.timeout_secs))
    }
}

/// OCO monitoring configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OcoConfig {
    /// Delay between status polls
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Give up after this many polls
    #[serde(default)]
    pub max_polls: Option<u32>,

    /// Give up after this many seconds of monitoring
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_poll_interval_secs() -> u64 {
    5
}

impl Default for OcoConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            max_polls: None,
            timeout_secs: None,
        }
    }
}

impl OcoConfig {
    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_secs(self.poll_interval_secs),
            max_polls: self.max_polls,
            timeout: self.timeout_secs.map(Duration::from_secs),
        }
    }
}

/// TWAP configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TwapConfig {
    #[serde(default)]
    pub final_slice: FinalSlice,
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Append-only log file; an empty path disables file logging
    #[serde(default = "default_log_file")]
    pub log_file: Option<PathBuf>,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Serve Prometheus metrics on this port
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_file() -> Option<PathBuf> {
    Some(PathBuf::from("bot.log"))
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_file: default_log_file(),
            log_format: LogFormat::Pipe,
            metrics_port: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file is absent.
    /// A file that exists but does not parse is still an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            eprintln!(
                "Warning: config file {} not found, using defaults",
                path.display()
            );
            return Ok(Config::default());
        }
        Self::load(path)
            .map_err(|e| anyhow::anyhow!("Invalid config file {}: {}", path.display(), e))
    }
}

/// Build credentials from raw variable values
pub fn credentials_from(
    api_key: Option<String>,
    api_secret: Option<String>,
) -> Result<Credentials, ConfigError> {
    match (api_key, api_secret) {
        (Some(key), Some(secret)) if !key.trim().is_empty() && !secret.trim().is_empty() => {
            Ok(Credentials::new(key.trim(), secret.trim()))
        }
        _ => Err(ConfigError::MissingCredentials),
    }
}

/// Read credentials from the process environment
pub fn credentials_from_env() -> Result<Credentials, ConfigError> {
    let result = credentials_from(
        std::env::var(API_KEY_VAR).ok(),
        std::env::var(API_SECRET_VAR).ok(),
    );
    if let Err(ref e) = result {
        tracing::error!(error = %e, "Missing API credentials");
    }
    result
}

/// Interpret the testnet flag. Unset means testnet; anything that is not a
/// recognizable boolean is rejected rather than treated as live.
pub fn parse_environment_flag(value: Option<&str>) -> Result<Environment, ConfigError> {
    let Some(raw) = value else {
        return Ok(Environment::Testnet);
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "true" | "1" | "yes" | "on" => Ok(Environment::Testnet),
        "false" | "0" | "no" | "off" => Ok(Environment::Live),
        _ => Err(ConfigError::InvalidFlag {
            name: TESTNET_VAR,
            value: raw.to_string(),
        }),
    }
}

/// Read the testnet/live switch from the process environment
pub fn environment_from_env() -> Result<Environment, ConfigError> {
    parse_environment_flag(std::env::var(TESTNET_VAR).ok().as_deref())
}
