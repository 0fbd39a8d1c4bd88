//! Error taxonomy for the real-time layer.
//!
//! Handler errors bubble up to the dispatcher, which logs them and decides
//! what (if anything) the sender sees. None of them end a read loop.

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode};

use super::messages::EventKind;

/// Read/write failure on one connection. Never affects other connections.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Connection closed")]
    Closed,

    #[error("Outbound queue full")]
    Backpressure,

    #[error("Failed to encode frame: {0}")]
    Encode(String),
}

/// Malformed envelope, unknown event kind or payload of the wrong shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Malformed envelope: {0}")]
    Malformed(String),

    #[error("event field is required")]
    MissingEvent,

    #[error("unknown event: {0}")]
    UnknownEvent(String),

    #[error("Invalid {event} payload: {reason}")]
    InvalidPayload { event: EventKind, reason: String },

    #[error("Binary frames are not supported")]
    UnsupportedFrame,
}

impl ProtocolError {
    pub fn invalid_payload(event: EventKind, reason: impl Into<String>) -> Self {
        ProtocolError::InvalidPayload {
            event,
            reason: reason.into(),
        }
    }
}

/// Everything a handler can fail with.
#[derive(Debug, Error)]
pub enum WsError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Not authorized: {0}")]
    Authorization(String),

    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("Broadcast reached {delivered} of {attempted} connections: {first}")]
    PartialBroadcast {
        attempted: usize,
        delivered: usize,
        first: TransportError,
    },
}

impl WsError {
    /// Category code shown to the client in `error` frames.
    pub fn code(&self) -> &'static str {
        match self {
            WsError::Transport(_) => "TRANSPORT_ERROR",
            WsError::Protocol(_) => "PROTOCOL_ERROR",
            WsError::Authorization(_) => ErrorCode::Forbidden.as_str(),
            WsError::Domain(err) => err.code.as_str(),
            WsError::PartialBroadcast { .. } => "PARTIAL_BROADCAST",
        }
    }

    /// Whether the sender should get a reply describing this error.
    ///
    /// Transport failures mean the sender's own stream is gone, and partial
    /// fan-out failures concern other recipients.
    pub fn notifies_sender(&self) -> bool {
        !matches!(self, WsError::Transport(_) | WsError::PartialBroadcast { .. })
    }
}
