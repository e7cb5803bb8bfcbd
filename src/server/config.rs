//! Server configuration
//!
//! Loaded from `config.toml` with `LISTEN_FTP_*` environment overrides. Every field
//! has a default, so a missing file yields a working anonymous server on port 2121.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::ops::RangeInclusive;
use std::time::Duration;

use crate::transfer::StoreSettings;

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    // ═══ NETWORK ═══
    /// IP address to bind the FTP control connection
    pub bind_address: String,

    /// Port for the control connection. 0 picks an ephemeral port.
    pub control_port: u16,

    /// Port range for PASV/EPSV listeners. `0..=0` means ephemeral.
    pub data_port_min: u16,
    pub data_port_max: u16,

    // ═══ CREDENTIALS ═══
    /// Anonymous access is enabled when no username is set
    pub username: Option<String>,
    pub password: Option<String>,

    // ═══ LIMITS ═══
    pub max_clients: usize,
    pub max_command_length: usize,

    // ═══ UPLOADS ═══
    /// Chunk size for reading uploads
    pub buffer_size: usize,

    /// Timeout for establishing data connections
    pub connection_timeout_secs: u64,

    /// Delay between checks while no work-session factory is installed
    pub session_poll_interval_ms: u64,

    /// Upper bound on waiting for the 150 reply to flush
    pub reply_flush_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            control_port: 2121,
            data_port_min: 50000,
            data_port_max: 50100,
            username: None,
            password: None,
            max_clients: 10,
            max_command_length: 512,
            buffer_size: 8192,
            connection_timeout_secs: 10,
            session_poll_interval_ms: 10,
            reply_flush_timeout_secs: 10,
        }
    }
}

impl ServerConfig {
    /// Load configuration from config.toml with environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("listen-ftp/config").required(false))
            .add_source(File::with_name("config").required(false))
            .add_source(
                Environment::with_prefix("LISTEN_FTP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_address.trim().is_empty() {
            return Err(ConfigError::Message("bind_address cannot be empty".into()));
        }

        if self.data_port_min > self.data_port_max {
            return Err(ConfigError::Message(
                "data_port_min must not exceed data_port_max".into(),
            ));
        }

        if self.data_port_min == 0 && self.data_port_max != 0 {
            return Err(ConfigError::Message(
                "data port range must be 0..=0 (ephemeral) or start above 0".into(),
            ));
        }

        if self.username.is_some() && self.password.is_none() {
            return Err(ConfigError::Message(
                "password is required when username is set".into(),
            ));
        }

        if self.max_clients == 0 {
            return Err(ConfigError::Message(
                "max_clients must be greater than 0".into(),
            ));
        }

        if self.buffer_size == 0 {
            return Err(ConfigError::Message(
                "buffer_size must be greater than 0".into(),
            ));
        }

        if self.session_poll_interval_ms == 0 {
            return Err(ConfigError::Message(
                "session_poll_interval_ms must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Get bind address and control port as socket address
    pub fn control_socket(&self) -> String {
        format!("{}:{}", self.bind_address, self.control_port)
    }

    /// Get data port range for PASV mode
    pub fn data_port_range(&self) -> RangeInclusive<u16> {
        self.data_port_min..=self.data_port_max
    }

    /// Get connection timeout as Duration
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    pub fn store_settings(&self) -> StoreSettings {
        StoreSettings {
            buffer_size: self.buffer_size,
            poll_interval: Duration::from_millis(self.session_poll_interval_ms),
            reply_flush_timeout: Duration::from_secs(self.reply_flush_timeout_secs),
        }
    }
}
