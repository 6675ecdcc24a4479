//! Configuration management for the status display.
//!
//! Handles loading, saving, and validating configuration from JSON files.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "/opt/epaper-status/config.json";

/// Upper bound for the configurable metrics capacity
pub const MAX_METRICS_CAPACITY: usize = 16;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Network attachment settings
///
/// Credentials are owned by the system network manager; the controller only
/// watches the interface and waits for it to come up.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// Interface whose link state gates the broker session
    #[serde(default = "default_interface")]
    pub interface: String,

    /// How long one attach attempt may block the loop
    #[serde(default = "default_attach_timeout")]
    pub attach_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            interface: default_interface(),
            attach_timeout_secs: default_attach_timeout(),
        }
    }
}

/// Broker session settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MqttConfig {
    #[serde(default = "default_broker")]
    pub broker: String,

    #[serde(default = "default_mqtt_port")]
    pub port: u16,

    /// Empty username means an anonymous session
    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Empty client id is derived from the device MAC address
    #[serde(default)]
    pub client_id: String,

    /// Status topic carrying JSON payloads
    #[serde(default = "default_topic")]
    pub topic: String,

    /// Presence topic for last-will and online announcements (empty disables)
    #[serde(default = "default_will_topic")]
    pub will_topic: String,

    #[serde(default = "default_will_message")]
    pub will_message: String,

    #[serde(default = "default_online_message")]
    pub online_message: String,

    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Bodies larger than this are rejected by the decoder
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,

    /// How long each tick services inbound traffic
    #[serde(default = "default_service_window")]
    pub service_window_ms: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker: default_broker(),
            port: default_mqtt_port(),
            username: String::new(),
            password: String::new(),
            client_id: String::new(),
            topic: default_topic(),
            will_topic: default_will_topic(),
            will_message: default_will_message(),
            online_message: default_online_message(),
            keep_alive_secs: default_keep_alive(),
            connect_timeout_secs: default_connect_timeout(),
            max_message_bytes: default_max_message_bytes(),
            service_window_ms: default_service_window(),
        }
    }
}

impl MqttConfig {
    /// Check if a presence topic is configured
    pub fn has_presence(&self) -> bool {
        !self.will_topic.trim().is_empty()
    }

    /// Credentials to present, if any
    pub fn credentials(&self) -> Option<(String, String)> {
        if self.username.is_empty() {
            None
        } else {
            Some((self.username.clone(), self.password.clone()))
        }
    }
}

/// Which rendering backend drives the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Single full-frame buffer, partial refresh
    Partial,
    /// Page-buffered monochrome frame, full refresh
    Paged,
    /// Paged rendering into a PNG file instead of the panel
    Snapshot,
}

/// GPIO pin assignments (BCM numbering)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PinConfig {
    pub rst: u8,
    pub dc: u8,
    pub busy: u8,
    pub pwr: u8,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            rst: 17,
            dc: 25,
            busy: 24,
            pwr: 18,
        }
    }
}

/// Panel and rendering settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisplayConfig {
    #[serde(default = "default_backend")]
    pub backend: BackendKind,

    /// Native panel width in pixels (before rotation)
    #[serde(default = "default_display_width")]
    pub width: u32,

    /// Native panel height in pixels (before rotation)
    #[serde(default = "default_display_height")]
    pub height: u32,

    /// Display rotation in degrees (0, 90, 180, 270)
    #[serde(default = "default_rotation")]
    pub rotation: u16,

    /// Minimum time between periodic refreshes
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    /// Maximum number of metric lines kept from a payload
    #[serde(default = "default_metrics_capacity")]
    pub metrics_capacity: usize,

    /// Physical rows per page for the paged backend
    #[serde(default = "default_page_height")]
    pub page_height: u32,

    /// Default subtitle until a payload names one
    #[serde(default = "default_device_name")]
    pub device_name: String,

    /// Output file for the snapshot backend
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,

    #[serde(default)]
    pub pins: PinConfig,

    #[serde(default = "default_spi_speed")]
    pub spi_speed_hz: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            width: default_display_width(),
            height: default_display_height(),
            rotation: default_rotation(),
            refresh_interval_secs: default_refresh_interval(),
            metrics_capacity: default_metrics_capacity(),
            page_height: default_page_height(),
            device_name: default_device_name(),
            snapshot_path: default_snapshot_path(),
            pins: PinConfig::default(),
            spi_speed_hz: default_spi_speed(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub mqtt: MqttConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    /// Enable verbose logging
    #[serde(default)]
    pub verbose: bool,
}

fn default_interface() -> String {
    "wlan0".to_string()
}

fn default_attach_timeout() -> u64 {
    15
}

fn default_broker() -> String {
    "192.168.1.50".to_string()
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_topic() -> String {
    "status/display".to_string()
}

fn default_will_topic() -> String {
    "status/display/availability".to_string()
}

fn default_will_message() -> String {
    "offline".to_string()
}

fn default_online_message() -> String {
    "online".to_string()
}

fn default_keep_alive() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_max_message_bytes() -> usize {
    1024
}

fn default_service_window() -> u64 {
    250
}

fn default_backend() -> BackendKind {
    BackendKind::Partial
}

fn default_display_width() -> u32 {
    128
}

fn default_display_height() -> u32 {
    250
}

fn default_rotation() -> u16 {
    90
}

fn default_refresh_interval() -> u64 {
    60
}

fn default_metrics_capacity() -> usize {
    4
}

fn default_page_height() -> u32 {
    64
}

fn default_device_name() -> String {
    "e-Paper Status".to_string()
}

fn default_snapshot_path() -> String {
    "/tmp/epaper-status.png".to_string()
}

fn default_spi_speed() -> u32 {
    4_000_000
}

impl Config {
    /// Load configuration from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file atomically
    ///
    /// Uses a write-to-temp-then-rename pattern to prevent corruption
    /// if power is lost during the write operation.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;

        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &content)?;

        std::fs::rename(&tmp_path, path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp_path);
            ConfigError::ReadError(e)
        })?;

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.interface.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "network.interface cannot be empty".to_string(),
            ));
        }

        if self.network.attach_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "network.attach_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.mqtt.broker.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "mqtt.broker cannot be empty".to_string(),
            ));
        }

        if self.mqtt.port == 0 {
            return Err(ConfigError::ValidationError(
                "mqtt.port must be greater than 0".to_string(),
            ));
        }

        if self.mqtt.topic.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "mqtt.topic cannot be empty".to_string(),
            ));
        }

        if self.mqtt.connect_timeout_secs == 0 || self.mqtt.keep_alive_secs == 0 {
            return Err(ConfigError::ValidationError(
                "mqtt timeouts must be greater than 0".to_string(),
            ));
        }

        if self.mqtt.service_window_ms == 0 {
            return Err(ConfigError::ValidationError(
                "mqtt.service_window_ms must be greater than 0".to_string(),
            ));
        }

        if self.mqtt.max_message_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "mqtt.max_message_bytes must be greater than 0".to_string(),
            ));
        }

        if !matches!(self.display.rotation, 0 | 90 | 180 | 270) {
            return Err(ConfigError::ValidationError(
                "rotation must be 0, 90, 180, or 270".to_string(),
            ));
        }

        if self.display.refresh_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "refresh_interval_secs must be at least 1".to_string(),
            ));
        }

        if self.display.metrics_capacity == 0 || self.display.metrics_capacity > MAX_METRICS_CAPACITY
        {
            return Err(ConfigError::ValidationError(format!(
                "metrics_capacity must be between 1 and {}",
                MAX_METRICS_CAPACITY
            )));
        }

        if self.display.width < 8 || self.display.width > 2000 || self.display.width % 8 != 0 {
            return Err(ConfigError::ValidationError(
                "display width must be a multiple of 8 between 8 and 2000".to_string(),
            ));
        }

        if self.display.height < 8 || self.display.height > 2000 {
            return Err(ConfigError::ValidationError(
                "display height must be between 8 and 2000".to_string(),
            ));
        }

        if self.display.page_height == 0 {
            return Err(ConfigError::ValidationError(
                "page_height must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn attach_timeout(&self) -> Duration {
        Duration::from_secs(self.network.attach_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.mqtt.connect_timeout_secs)
    }

    pub fn service_window(&self) -> Duration {
        Duration::from_millis(self.mqtt.service_window_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.display.refresh_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.display.metrics_capacity, 4);
        assert_eq!(config.refresh_interval(), Duration::from_secs(60));
        assert_eq!(config.attach_timeout(), Duration::from_secs(15));
        assert!(config.mqtt.has_presence());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"mqtt": {"broker": "10.0.0.2", "topic": "lab/status"}}"#)
                .unwrap();
        assert_eq!(config.mqtt.broker, "10.0.0.2");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.mqtt.will_message, "offline");
        assert_eq!(config.display.backend, BackendKind::Partial);
    }

    #[test]
    fn rejects_bad_rotation_and_capacity() {
        let mut config = Config::default();
        config.display.rotation = 45;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));

        let mut config = Config::default();
        config.display.metrics_capacity = MAX_METRICS_CAPACITY + 1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.display.width = 122;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_service_window() {
        let config: Config =
            serde_json::from_str(r#"{"mqtt": {"service_window_ms": 0}}"#).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(msg)) if msg.contains("service_window_ms")
        ));
    }

    #[test]
    fn empty_username_means_anonymous() {
        let mut mqtt = MqttConfig::default();
        assert_eq!(mqtt.credentials(), None);
        mqtt.username = "display".to_string();
        mqtt.password = "secret".to_string();
        assert_eq!(
            mqtt.credentials(),
            Some(("display".to_string(), "secret".to_string()))
        );
        mqtt.will_topic = "  ".to_string();
        assert!(!mqtt.has_presence());
    }

    #[test]
    fn save_then_load_keeps_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.display.backend = BackendKind::Paged;
        config.mqtt.topic = "home/status".to_string();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.display.backend, BackendKind::Paged);
        assert_eq!(loaded.mqtt.topic, "home/status");
        assert!(!path.with_extension("json.tmp").exists());
    }
}
