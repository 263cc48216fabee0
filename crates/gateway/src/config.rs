//! Gateway client configuration
//!
//! Loaded from JSON; every field has a default so a partial file (or `{}`) is valid.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Connection and request settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Gateway host
    #[serde(default = "default_host")]
    pub host: String,

    /// Gateway port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Client id; each concurrent connection to one gateway needs its own
    #[serde(default)]
    pub client_id: i32,

    /// Default wait applied by `RequestHandle::wait`; `None` waits indefinitely
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: Option<u64>,

    /// Capacity of the outbound request channel
    #[serde(default = "default_channel_capacity")]
    pub outbound_channel_capacity: usize,

    /// Capacity of the inbound event channel
    #[serde(default = "default_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Capacity of the general listener broadcast channel
    #[serde(default = "default_notification_capacity")]
    pub notification_capacity: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    4002
}

fn default_request_timeout_ms() -> Option<u64> {
    Some(30_000)
}

fn default_channel_capacity() -> usize {
    1024
}

fn default_notification_capacity() -> usize {
    256
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            client_id: 0,
            request_timeout_ms: default_request_timeout_ms(),
            outbound_channel_capacity: default_channel_capacity(),
            event_channel_capacity: default_channel_capacity(),
            notification_capacity: default_notification_capacity(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::from_json(&content)
    }

    /// Parse and validate configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("host must not be empty".to_string()));
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid("port must be non-zero".to_string()));
        }
        if self.outbound_channel_capacity == 0
            || self.event_channel_capacity == 0
            || self.notification_capacity == 0
        {
            return Err(ConfigError::Invalid(
                "channel capacities must be non-zero".to_string(),
            ));
        }
        if self.request_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "request_timeout_ms must be non-zero (omit it to wait indefinitely)".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_endpoint(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    pub fn with_client_id(mut self, client_id: i32) -> Self {
        self.client_id = client_id;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout_ms = timeout.map(|t| t.as_millis() as u64);
        self
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_uses_defaults() {
        let config = GatewayConfig::from_json("{}").unwrap();
        assert_eq!(config, GatewayConfig::default());
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_partial_json() {
        let config = GatewayConfig::from_json(
            r#"{"host": "10.0.0.5", "port": 7497, "client_id": 12, "request_timeout_ms": null}"#,
        )
        .unwrap();
        assert_eq!(config.host, "10.0.0.5");
        assert_eq!(config.port, 7497);
        assert_eq!(config.client_id, 12);
        assert_eq!(config.request_timeout(), None);
        assert_eq!(config.event_channel_capacity, 1024);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            GatewayConfig::from_json(r#"{"port": 0}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            GatewayConfig::from_json(r#"{"notification_capacity": 0}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            GatewayConfig::from_json("not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = GatewayConfig::from_file("/nonexistent/gateway.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_builders() {
        let config = GatewayConfig::default()
            .with_endpoint("gw.local", 4001)
            .with_client_id(7)
            .with_request_timeout(Some(Duration::from_millis(250)));
        assert_eq!(config.host, "gw.local");
        assert_eq!(config.request_timeout_ms, Some(250));
        assert!(config.validate().is_ok());
    }
}
