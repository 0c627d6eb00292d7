//! Runtime configuration loaded from JSON.
//!
//! Devices typically keep their broker settings as a small JSON blob in
//! flash. [`Config::from_json`] parses it without allocating; string fields
//! borrow from the input, so escaped characters are not supported.
//!
//! ```rust
//! use mqtt_rpc::config::Config;
//!
//! let config = Config::from_json(
//!     r#"{"host":"broker.local","client_id":"node-7","username":"node","password":"pw"}"#,
//! )
//! .unwrap();
//! assert_eq!(config.port, 1883);
//! assert_eq!(config.keep_alive_seconds, 60);
//! assert_eq!(config.username, Some("node"));
//! ```

use crate::network::application::mqtt::{
    DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_PING_TIMEOUT_MS, ManagerOptions, Options,
};
use crate::network::error::Error;
use serde::Deserialize;

/// Errors raised while loading a configuration.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ConfigError {
    /// The input is not valid JSON for [`Config`].
    Parse,
    /// A value is out of range (empty host, client id too long, zero
    /// failure threshold).
    InvalidValue,
}

#[cfg(feature = "defmt")]
impl defmt::Format for ConfigError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            ConfigError::Parse => defmt::write!(f, "Parse"),
            ConfigError::InvalidValue => defmt::write!(f, "InvalidValue"),
        }
    }
}

/// Broker, session and reconnect settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config<'a> {
    /// Broker host name or address.
    pub host: &'a str,
    /// Broker port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// MQTT client identifier.
    pub client_id: &'a str,
    /// Keep-alive interval in seconds.
    #[serde(default = "default_keep_alive")]
    pub keep_alive_seconds: u16,
    /// Request a clean session.
    #[serde(default = "default_true")]
    pub clean_session: bool,
    /// User name sent with CONNECT.
    #[serde(default, borrow)]
    pub username: Option<&'a str>,
    /// Password sent with CONNECT.
    #[serde(default, borrow)]
    pub password: Option<&'a str>,
    /// CONNACK timeout.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u32,
    /// PINGRESP timeout.
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout_ms: u32,
    /// Consecutive failures before standoff.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Delay between reconnect attempts.
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u32,
    /// Longest standoff.
    #[serde(default = "default_standoff")]
    pub standoff_ms: u32,
}

fn default_port() -> u16 {
    1883
}

fn default_keep_alive() -> u16 {
    60
}

fn default_true() -> bool {
    true
}

fn default_connect_timeout() -> u32 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

fn default_ping_timeout() -> u32 {
    DEFAULT_PING_TIMEOUT_MS
}

fn default_failure_threshold() -> u32 {
    ManagerOptions::default().failure_threshold
}

fn default_reconnect_delay() -> u32 {
    ManagerOptions::default().reconnect_delay_ms
}

fn default_standoff() -> u32 {
    ManagerOptions::default().standoff_ms
}

impl<'a> Config<'a> {
    /// Parse and check a JSON configuration.
    pub fn from_json(json: &'a str) -> Result<Self, ConfigError> {
        let (config, _) =
            serde_json_core::from_str::<Config<'a>>(json).map_err(|_| ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that the JSON schema cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() || self.client_id.is_empty() || self.failure_threshold == 0 {
            return Err(ConfigError::InvalidValue);
        }
        if self.password.is_some() && self.username.is_none() {
            return Err(ConfigError::InvalidValue);
        }
        self.client_options()
            .map(|_| ())
            .map_err(|_| ConfigError::InvalidValue)
    }

    /// Session options for [`MqttClient`](crate::network::application::mqtt::MqttClient).
    pub fn client_options(&self) -> Result<Options, Error> {
        let mut options = Options::new(self.client_id)?;
        options.keep_alive_seconds = self.keep_alive_seconds;
        options.clean_session = self.clean_session;
        options.connect_timeout_ms = self.connect_timeout_ms;
        options.ping_timeout_ms = self.ping_timeout_ms;
        Ok(options)
    }

    /// Reconnect policy for
    /// [`ConnectionManager`](crate::network::application::mqtt::ConnectionManager).
    pub fn manager_options(&self) -> ManagerOptions {
        ManagerOptions {
            failure_threshold: self.failure_threshold,
            reconnect_delay_ms: self.reconnect_delay_ms,
            standoff_ms: self.standoff_ms,
        }
    }
}
