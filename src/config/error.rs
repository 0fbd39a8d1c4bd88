//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid bind address: {0}")]
    InvalidBindAddress(String),

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Ping interval must be at least one second")]
    InvalidPingInterval,

    #[error("Pong timeout must exceed the ping interval")]
    PongTimeoutTooShort,

    #[error("Outbound buffer must hold at least one frame")]
    InvalidOutboundBuffer,

    #[error("Per-session connection limit must be at least one")]
    InvalidSessionCapacity,

    #[error("Maximum message size must be positive")]
    InvalidMessageSize,
}
