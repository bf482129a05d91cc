//! Device configuration
//!
//! Configuration is fixed at build/deploy time and loaded from a YAML file:
//!
//! ```yaml
//! device_id: cam01
//! wifi:
//!   ssid: workshop
//!   password: hunter22
//!   auth: wpa2
//! broker:
//!   host: 192.168.1.20
//!   port: 1883
//! http:
//!   port: 8080
//! ```
//!
//! Every section is optional and falls back to the device defaults; durations
//! are given in milliseconds.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::backoff::BackoffPolicy;
use crate::streaming::StreamTiming;
use crate::{EdgeCamError, Result};

/// Longest send or receive timeout accepted for HTTP clients.
pub const MAX_SOCKET_TIMEOUT: Duration = Duration::from_secs(10);

/// Complete device configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Identifier used in status topics
    pub device_id: String,
    pub wifi: WifiConfig,
    pub broker: BrokerConfig,
    pub http: HttpConfig,
    pub timing: TimingConfig,
    pub backoff: BackoffPolicy,
}

/// Station credentials
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WifiConfig {
    pub ssid: String,
    pub password: String,
    pub auth: AuthMode,
}

/// Authentication mode of the access point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    #[default]
    Open,
    Wpa2,
}

/// Status broker address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 1883 }
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    pub port: u16,
    /// How long a single stream write may wait on a slow client
    #[serde(rename = "send_timeout_ms", with = "millis")]
    pub send_timeout: Duration,
    /// How long a client may take to deliver its request headers
    #[serde(rename = "recv_timeout_ms", with = "millis")]
    pub recv_timeout: Duration,
    /// Concurrent `/stream` clients
    pub max_streams: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            send_timeout: Duration::from_secs(5),
            recv_timeout: Duration::from_secs(5),
            max_streams: 1,
        }
    }
}

/// Startup, status and streaming delays
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingConfig {
    #[serde(rename = "startup_timeout_ms", with = "millis")]
    pub startup_timeout: Duration,
    #[serde(rename = "status_interval_ms", with = "millis")]
    pub status_interval: Duration,
    #[serde(rename = "frame_interval_ms", with = "millis")]
    pub frame_interval: Duration,
    #[serde(rename = "empty_retry_ms", with = "millis")]
    pub empty_retry: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            startup_timeout: Duration::from_secs(30),
            status_interval: Duration::from_secs(5),
            frame_interval: StreamTiming::DEFAULT_FRAME_INTERVAL,
            empty_retry: StreamTiming::DEFAULT_EMPTY_RETRY,
        }
    }
}

impl TimingConfig {
    /// Session pacing derived from this configuration
    pub fn stream_timing(&self) -> StreamTiming {
        StreamTiming { frame_interval: self.frame_interval, empty_retry: self.empty_retry }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_id: "cam01".to_string(),
            wifi: WifiConfig::default(),
            broker: BrokerConfig::default(),
            http: HttpConfig::default(),
            timing: TimingConfig::default(),
            backoff: BackoffPolicy::default(),
        }
    }
}

impl Config {
    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| EdgeCamError::file_error(path.to_path_buf(), e))?;
        Self::from_yaml_str(&contents)
    }

    /// Check cross-field constraints that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.wifi.ssid.is_empty() {
            return Err(EdgeCamError::config("wifi.ssid must not be empty"));
        }

        if self.wifi.auth == AuthMode::Wpa2 && self.wifi.password.is_empty() {
            return Err(EdgeCamError::config("wifi.password is required for wpa2"));
        }

        if self.device_id.is_empty() || self.device_id.contains(['/', '#', '+']) {
            return Err(EdgeCamError::config(format!(
                "device_id '{}' is not usable in a topic",
                self.device_id
            )));
        }

        // Re-run the policy constructor so deserialized values obey the same rule.
        BackoffPolicy::new(self.backoff.short(), self.backoff.long())?;

        if self.http.max_streams == 0 {
            return Err(EdgeCamError::config("http.max_streams must be at least 1"));
        }

        check_socket_timeout("http.send_timeout_ms", self.http.send_timeout)?;
        check_socket_timeout("http.recv_timeout_ms", self.http.recv_timeout)?;

        Ok(())
    }

    /// Broker URI for the status publisher
    pub fn broker_uri(&self) -> String {
        format!("mqtt://{}:{}", self.broker.host, self.broker.port)
    }

    /// Topic the online event is published to
    pub fn event_topic(&self) -> String {
        format!("gd/{}/event", self.device_id)
    }
}

fn check_socket_timeout(key: &str, timeout: Duration) -> Result<()> {
    if timeout.is_zero() || timeout >= MAX_SOCKET_TIMEOUT {
        return Err(EdgeCamError::config(format!(
            "{key} must be between 1 and {}",
            MAX_SOCKET_TIMEOUT.as_millis() - 1
        )));
    }
    Ok(())
}

/// Serde adapter storing a [`Duration`] as whole milliseconds
pub(crate) mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
