//! Configuration file support for RDT CLI tools

use rdt::{ClientConfig, ServerConfig};
use rdt_protocol::congestion::DEFAULT_SSTHRESH;
use rdt_protocol::connection::{
    DEFAULT_EOF_INTERVAL, DEFAULT_EOF_REPEATS, DEFAULT_MAX_BUFFERED_SEGMENTS,
    DEFAULT_MAX_CONSECUTIVE_TIMEOUTS,
};
use rdt_protocol::handshake::{DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_MAX_ATTEMPTS};
use rdt_protocol::packet::MAX_PAYLOAD_SIZE;
use rdt_protocol::{ReceiverConfig, RetryPolicy, SenderConfig, WindowPolicy};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default server port
pub const DEFAULT_PORT: u16 = 6555;

/// Window mode selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WindowMode {
    /// Constant send window of `sws` bytes
    Fixed,
    /// Reno congestion window
    Congestion,
}

/// Server section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSection {
    /// Listen address
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
    /// File to serve
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<PathBuf>,
    /// Window mode
    #[serde(default = "default_mode")]
    pub mode: WindowMode,
    /// Send window for fixed mode (bytes)
    #[serde(default = "default_sws")]
    pub sws: u32,
    /// Initial slow-start threshold for congestion mode (bytes)
    #[serde(default = "default_ssthresh")]
    pub ssthresh: u32,
    /// Retransmission timeout before the first RTT sample
    #[serde(default = "default_initial_rto_ms")]
    pub initial_rto_ms: u64,
    /// Consecutive timeouts before the transfer is abandoned
    #[serde(default = "default_max_consecutive_timeouts")]
    pub max_consecutive_timeouts: u32,
    /// Number of EOF markers sent
    #[serde(default = "default_eof_repeats")]
    pub eof_repeats: u32,
    /// Gap between EOF markers in milliseconds
    #[serde(default = "default_eof_interval_ms")]
    pub eof_interval_ms: u64,
    /// Progress log interval in seconds
    #[serde(default = "default_progress_interval")]
    pub progress_interval_secs: u64,
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT))
}

fn default_mode() -> WindowMode {
    WindowMode::Congestion
}

fn default_sws() -> u32 {
    10 * MAX_PAYLOAD_SIZE as u32
}

fn default_ssthresh() -> u32 {
    DEFAULT_SSTHRESH
}

fn default_initial_rto_ms() -> u64 {
    1000
}

fn default_max_consecutive_timeouts() -> u32 {
    DEFAULT_MAX_CONSECUTIVE_TIMEOUTS
}

fn default_eof_repeats() -> u32 {
    DEFAULT_EOF_REPEATS
}

fn default_eof_interval_ms() -> u64 {
    DEFAULT_EOF_INTERVAL.as_millis() as u64
}

fn default_progress_interval() -> u64 {
    2
}

impl Default for ServerSection {
    fn default() -> Self {
        ServerSection {
            bind: default_bind(),
            input: None,
            mode: default_mode(),
            sws: default_sws(),
            ssthresh: default_ssthresh(),
            initial_rto_ms: default_initial_rto_ms(),
            max_consecutive_timeouts: default_max_consecutive_timeouts(),
            eof_repeats: default_eof_repeats(),
            eof_interval_ms: default_eof_interval_ms(),
            progress_interval_secs: default_progress_interval(),
        }
    }
}

impl ServerSection {
    /// Window policy selected by `mode`
    pub fn window_policy(&self) -> WindowPolicy {
        match self.mode {
            WindowMode::Fixed => WindowPolicy::Fixed(self.sws),
            WindowMode::Congestion => WindowPolicy::Congestion {
                initial_ssthresh: self.ssthresh,
            },
        }
    }

    /// Build the server configuration, validating the sender settings
    pub fn server_config(&self) -> Result<ServerConfig, ConfigError> {
        let sender = SenderConfig {
            mss: MAX_PAYLOAD_SIZE as u32,
            window: self.window_policy(),
            max_consecutive_timeouts: self.max_consecutive_timeouts,
            eof_repeats: self.eof_repeats,
            eof_interval: Duration::from_millis(self.eof_interval_ms),
            initial_rto: Duration::from_millis(self.initial_rto_ms),
        };
        sender
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        Ok(ServerConfig {
            sender,
            progress_interval: Duration::from_secs(self.progress_interval_secs.max(1)),
            ..Default::default()
        })
    }
}

/// Client section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSection {
    /// Server address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<SocketAddr>,
    /// Output file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    /// Local bind address
    #[serde(default = "default_client_bind")]
    pub bind: SocketAddr,
    /// Connection request attempts
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Wait per connection attempt in milliseconds
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,
    /// Give up after this many seconds without data
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    /// Out-of-order segments held at most
    #[serde(default = "default_max_buffered_segments")]
    pub max_buffered_segments: usize,
}

fn default_client_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 0))
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_attempt_timeout_ms() -> u64 {
    DEFAULT_ATTEMPT_TIMEOUT.as_millis() as u64
}

fn default_idle_timeout() -> u64 {
    rdt::client::DEFAULT_IDLE_TIMEOUT.as_secs()
}

fn default_max_buffered_segments() -> usize {
    DEFAULT_MAX_BUFFERED_SEGMENTS
}

impl Default for ClientSection {
    fn default() -> Self {
        ClientSection {
            server: None,
            output: None,
            bind: default_client_bind(),
            max_attempts: default_max_attempts(),
            attempt_timeout_ms: default_attempt_timeout_ms(),
            idle_timeout_secs: default_idle_timeout(),
            max_buffered_segments: default_max_buffered_segments(),
        }
    }
}

impl ClientSection {
    /// Build the client configuration
    pub fn client_config(&self) -> Result<ClientConfig, ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.max_buffered_segments == 0 {
            return Err(ConfigError::Invalid(
                "max_buffered_segments must be at least 1".to_string(),
            ));
        }

        Ok(ClientConfig {
            receiver: ReceiverConfig {
                max_buffered_segments: self.max_buffered_segments,
            },
            retry: RetryPolicy {
                max_attempts: self.max_attempts,
                timeout: Duration::from_millis(self.attempt_timeout_ms),
            },
            idle_timeout: Duration::from_secs(self.idle_timeout_secs.max(1)),
        })
    }
}

/// Combined configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerSection,
    /// Client configuration
    #[serde(default)]
    pub client: ClientSection,
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load from `path` if given, defaults otherwise
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Config::default()),
        }
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Create example configuration
    pub fn example() -> Self {
        Config {
            server: ServerSection {
                input: Some(PathBuf::from("data.bin")),
                ..Default::default()
            },
            client: ClientSection {
                server: Some(SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT))),
                output: Some(PathBuf::from("received.bin")),
                ..Default::default()
            },
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config() {
        let config = Config::example();
        assert!(config.server.input.is_some());
        assert!(config.client.server.is_some());
        assert!(config.server.server_config().is_ok());
        assert!(config.client.client_config().is_ok());
    }

    #[test]
    fn test_serialize_deserialize() {
        let config = Config::example();
        let toml = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();

        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let parsed: Config = toml::from_str(
            r#"
            [server]
            mode = "fixed"
            sws = 5900
            "#,
        )
        .unwrap();

        assert_eq!(parsed.server.window_policy(), WindowPolicy::Fixed(5900));
        assert_eq!(parsed.server.bind.port(), DEFAULT_PORT);
        assert_eq!(parsed.client, ClientSection::default());
    }

    #[test]
    fn test_eof_pacing_conversion() {
        let parsed: Config = toml::from_str(
            r#"
            [server]
            eof_repeats = 3
            eof_interval_ms = 250
            "#,
        )
        .unwrap();

        let config = parsed.server.server_config().unwrap();
        assert_eq!(config.sender.eof_repeats, 3);
        assert_eq!(config.sender.eof_interval, Duration::from_millis(250));
        assert_eq!(
            ServerSection::default().server_config().unwrap().sender.eof_interval,
            DEFAULT_EOF_INTERVAL
        );
    }

    #[test]
    fn test_invalid_window_rejected() {
        let section = ServerSection {
            mode: WindowMode::Fixed,
            sws: 100,
            ..Default::default()
        };
        assert!(matches!(
            section.server_config(),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_client_config_conversion() {
        let section = ClientSection {
            max_attempts: 3,
            attempt_timeout_ms: 500,
            ..Default::default()
        };
        let config = section.client_config().unwrap();
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.timeout, Duration::from_millis(500));
        assert_eq!(config.idle_timeout, Duration::from_secs(10));
    }
}
