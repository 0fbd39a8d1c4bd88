//! WebSocket configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use super::server::Environment;

/// Real-time transport configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketConfig {
    /// Origins allowed to open a stream (comma-separated, `*.example.com`
    /// matches any subdomain). Ignored in development.
    pub allowed_origins: Option<String>,

    /// Seconds between keep-alive pings
    #[serde(default = "default_ping_interval")]
    pub ping_interval_secs: u64,

    /// Seconds without any inbound frame before the connection is dropped
    /// (0 disables the check)
    #[serde(default = "default_pong_timeout")]
    pub pong_timeout_secs: u64,

    /// Seconds a single frame write may take
    #[serde(default = "default_write_timeout")]
    pub write_timeout_secs: u64,

    /// Largest accepted inbound message in bytes
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,

    /// Outbound frames queued per connection before it counts as slow
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,

    /// Connections allowed in one session room
    #[serde(default = "default_max_connections_per_session")]
    pub max_connections_per_session: usize,
}

impl WebSocketConfig {
    /// Get allowed origins as a vector
    pub fn allowed_origins_list(&self) -> Vec<String> {
        self.allowed_origins
            .as_ref()
            .map(|s| {
                s.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    pub fn pong_timeout(&self) -> Option<Duration> {
        (self.pong_timeout_secs > 0).then(|| Duration::from_secs(self.pong_timeout_secs))
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    /// Validate WebSocket configuration
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.ping_interval_secs == 0 {
            return Err(ValidationError::InvalidPingInterval);
        }
        if self.pong_timeout_secs != 0 && self.pong_timeout_secs <= self.ping_interval_secs {
            return Err(ValidationError::PongTimeoutTooShort);
        }
        if self.write_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        if self.max_message_size == 0 {
            return Err(ValidationError::InvalidMessageSize);
        }
        if self.outbound_buffer == 0 {
            return Err(ValidationError::InvalidOutboundBuffer);
        }
        if self.max_connections_per_session == 0 {
            return Err(ValidationError::InvalidSessionCapacity);
        }
        if *environment == Environment::Production && self.allowed_origins_list().is_empty() {
            return Err(ValidationError::MissingRequired("websocket.allowed_origins"));
        }
        Ok(())
    }
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            allowed_origins: None,
            ping_interval_secs: default_ping_interval(),
            pong_timeout_secs: default_pong_timeout(),
            write_timeout_secs: default_write_timeout(),
            max_message_size: default_max_message_size(),
            outbound_buffer: default_outbound_buffer(),
            max_connections_per_session: default_max_connections_per_session(),
        }
    }
}

fn default_ping_interval() -> u64 {
    30
}

fn default_pong_timeout() -> u64 {
    60
}

fn default_write_timeout() -> u64 {
    10
}

fn default_max_message_size() -> usize {
    1024 * 1024
}

fn default_outbound_buffer() -> usize {
    64
}

fn default_max_connections_per_session() -> usize {
    100
}
