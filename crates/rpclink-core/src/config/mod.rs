//! Configuration loading and validation.
//!
//! JSON5 format, so comments and trailing commas are accepted.
//! Config location: `~/.rpclink/rpclink.json`

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON5 parsing error.
    #[error("Parse error: {0}")]
    Parse(#[from] json5::Error),

    /// Config validation error.
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Transport used when none is given on the command line.
    #[serde(default)]
    pub transport: TransportKind,

    /// HTTP transport settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Raw TCP transport settings.
    #[serde(default)]
    pub tcp: TcpConfig,

    /// Serial transport settings.
    #[serde(default)]
    pub serial: SerialConfig,

    /// Exchange timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Global settings.
    #[serde(default)]
    pub settings: GlobalSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transport: TransportKind::default(),
            http: HttpConfig::default(),
            tcp: TcpConfig::default(),
            serial: SerialConfig::default(),
            timeout_ms: default_timeout_ms(),
            settings: GlobalSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Falls back to defaults when no file exists.
    ///
    /// # Errors
    ///
    /// Returns error if config cannot be loaded or parsed.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path.
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, parsed, or validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = json5::from_str(&content)?;
        config.validate()?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Save configuration to a path.
    ///
    /// # Errors
    ///
    /// Returns error if serialization or file write fails.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Validation(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config file path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        Self::state_dir().join("rpclink.json")
    }

    /// Get the rpclink state directory.
    ///
    /// Uses `RPCLINK_STATE_DIR` env var if set, otherwise `~/.rpclink`.
    #[must_use]
    pub fn state_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("RPCLINK_STATE_DIR") {
            PathBuf::from(dir)
        } else if let Some(home) = dirs::home_dir() {
            home.join(".rpclink")
        } else {
            PathBuf::from(".rpclink")
        }
    }

    /// Exchange timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` describing the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "Timeout cannot be 0".to_string(),
            ));
        }

        let url = self.http.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "HTTP url '{url}' must start with http:// or https://"
            )));
        }

        if self.tcp.host.trim().is_empty() {
            return Err(ConfigError::Validation("TCP host cannot be empty".to_string()));
        }
        if self.tcp.port == 0 {
            return Err(ConfigError::Validation("TCP port cannot be 0".to_string()));
        }

        if self.serial.path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Serial device path cannot be empty".to_string(),
            ));
        }
        if self.serial.baud_rate == 0 {
            return Err(ConfigError::Validation(
                "Serial baud rate cannot be 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Which transport carries the exchange.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// HTTP POST.
    #[default]
    Http,
    /// Raw TCP stream, response ends when the peer closes.
    Tcp,
    /// Serial line.
    Serial,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http => write!(f, "http"),
            Self::Tcp => write!(f, "tcp"),
            Self::Serial => write!(f, "serial"),
        }
    }
}

impl FromStr for TransportKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "tcp" => Ok(Self::Tcp),
            "serial" => Ok(Self::Serial),
            other => Err(ConfigError::Validation(format!(
                "Unknown transport '{other}' (expected http, tcp, or serial)"
            ))),
        }
    }
}

/// HTTP transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpConfig {
    /// Endpoint URL.
    #[serde(default = "default_url")]
    pub url: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { url: default_url() }
    }
}

/// Raw TCP transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TcpConfig {
    /// Device host name or address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Device port.
    #[serde(default = "default_tcp_port")]
    pub port: u16,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_tcp_port(),
        }
    }
}

/// Serial transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerialConfig {
    /// Device path.
    #[serde(default = "default_serial_path")]
    pub path: String,

    /// Line speed.
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            path: default_serial_path(),
            baud_rate: default_baud_rate(),
        }
    }
}

const DEFAULT_HOST: &str = "ArduinoJsonRPC.local";

fn default_url() -> String {
    format!("http://{DEFAULT_HOST}")
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

const fn default_tcp_port() -> u16 {
    80
}

fn default_serial_path() -> String {
    "/dev/ttyACM0".to_string()
}

const fn default_baud_rate() -> u32 {
    9600
}

const fn default_timeout_ms() -> u64 {
    5000
}

/// Global settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSettings {
    /// Log format.
    #[serde(default)]
    pub log_format: LogFormat,
}

/// Log format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format.
    #[default]
    Pretty,
    /// JSON format.
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.transport, TransportKind::Http);
        assert_eq!(config.http.url, "http://ArduinoJsonRPC.local");
        assert_eq!(config.tcp.port, 80);
        assert_eq!(config.serial.path, "/dev/ttyACM0");
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested").join("rpclink.json");

        let mut config = Config::default();
        config.transport = TransportKind::Serial;
        config.serial.path = "/dev/ttyUSB1".to_string();
        config.timeout_ms = 250;

        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.transport, TransportKind::Serial);
        assert_eq!(loaded.serial.path, "/dev/ttyUSB1");
        assert_eq!(loaded.timeout_ms, 250);
    }

    #[test]
    fn test_json5_parsing() {
        let json5_content = r#"{
            // talk to the bench unit
            transport: "tcp",
            tcp: {
                host: "192.168.1.177",
                port: 8080,
            },
            timeoutMs: 1500,
        }"#;

        let config: Config = json5::from_str(json5_content).unwrap();
        assert_eq!(config.transport, TransportKind::Tcp);
        assert_eq!(config.tcp.host, "192.168.1.177");
        assert_eq!(config.tcp.port, 8080);
        assert_eq!(config.timeout_ms, 1500);
        assert_eq!(config.serial.baud_rate, 9600);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.tcp.port = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        let mut config = Config::default();
        config.http.url = "ftp://device".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.serial.baud_rate = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("rpclink.json");
        std::fs::write(&path, "{ tcp: { port: 0 } }").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_transport_kind_from_str() {
        assert_eq!("TCP".parse::<TransportKind>().unwrap(), TransportKind::Tcp);
        assert_eq!("serial".parse::<TransportKind>().unwrap(), TransportKind::Serial);
        assert!("udp".parse::<TransportKind>().is_err());
        assert_eq!(TransportKind::Http.to_string(), "http");
    }

    #[test]
    fn test_state_dir() {
        let dir = Config::state_dir();
        assert!(dir.to_str().unwrap().contains("rpclink"));
    }
}
