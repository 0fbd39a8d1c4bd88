//! WebSocket wire envelope for planning poker sessions.
//!
//! Defines the protocol between server and connected clients:
//! - Client → Server: `{"event": <kind>, ...kind-specific fields}`
//! - Server → Client: `{"event": <kind>, "data": <payload>}`
//!
//! Inbound frames are decoded once, at the boundary, into one validated
//! payload type per event kind.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{SessionId, UserId, VoteId};
use crate::domain::session::SessionView;

use super::error::{ProtocolError, TransportError};

// ============================================
// Client → Server Messages
// ============================================

/// Every event kind a client may send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    JoinSession,
    Vote,
    RevealCards,
    ResetVotes,
    ToggleAutoReveal,
    KickUser,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        EventKind::JoinSession,
        EventKind::Vote,
        EventKind::RevealCards,
        EventKind::ResetVotes,
        EventKind::ToggleAutoReveal,
        EventKind::KickUser,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::JoinSession => "join_session",
            EventKind::Vote => "vote",
            EventKind::RevealCards => "reveal_cards",
            EventKind::ResetVotes => "reset_votes",
            EventKind::ToggleAutoReveal => "toggle_auto_reveal",
            EventKind::KickUser => "kick_user",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownEvent(s.to_string()))
    }
}

/// `join_session` payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JoinSessionPayload {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub user_name: String,
    pub is_watcher: bool,
}

/// `vote` payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VotePayload {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub value: String,
}

/// Payload shared by `reveal_cards`, `reset_votes` and `toggle_auto_reveal`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionPayload {
    pub session_id: SessionId,
}

/// `kick_user` payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KickUserPayload {
    pub session_id: SessionId,
    pub initiator_user_id: UserId,
    pub target_user: UserId,
}

/// A decoded, validated inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    JoinSession(JoinSessionPayload),
    Vote(VotePayload),
    RevealCards(SessionPayload),
    ResetVotes(SessionPayload),
    ToggleAutoReveal(SessionPayload),
    KickUser(KickUserPayload),
}

impl InboundEvent {
    /// Decodes one text frame.
    ///
    /// Any shape problem, from invalid JSON to a missing field, comes back
    /// as a single [`ProtocolError`].
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))?;

        let kind: EventKind = value
            .get("event")
            .and_then(serde_json::Value::as_str)
            .ok_or(ProtocolError::MissingEvent)?
            .parse()?;

        let event = match kind {
            EventKind::JoinSession => {
                let payload: JoinSessionPayload = payload(kind, value)?;
                if payload.user_name.trim().is_empty() {
                    return Err(ProtocolError::invalid_payload(kind, "user_name cannot be empty"));
                }
                InboundEvent::JoinSession(payload)
            }
            EventKind::Vote => {
                let payload: VotePayload = payload(kind, value)?;
                if payload.value.trim().is_empty() {
                    return Err(ProtocolError::invalid_payload(kind, "value cannot be empty"));
                }
                InboundEvent::Vote(payload)
            }
            EventKind::RevealCards => InboundEvent::RevealCards(payload(kind, value)?),
            EventKind::ResetVotes => InboundEvent::ResetVotes(payload(kind, value)?),
            EventKind::ToggleAutoReveal => InboundEvent::ToggleAutoReveal(payload(kind, value)?),
            EventKind::KickUser => InboundEvent::KickUser(payload(kind, value)?),
        };
        Ok(event)
    }

    pub fn kind(&self) -> EventKind {
        match self {
            InboundEvent::JoinSession(_) => EventKind::JoinSession,
            InboundEvent::Vote(_) => EventKind::Vote,
            InboundEvent::RevealCards(_) => EventKind::RevealCards,
            InboundEvent::ResetVotes(_) => EventKind::ResetVotes,
            InboundEvent::ToggleAutoReveal(_) => EventKind::ToggleAutoReveal,
            InboundEvent::KickUser(_) => EventKind::KickUser,
        }
    }

    pub fn session_id(&self) -> SessionId {
        match self {
            InboundEvent::JoinSession(p) => p.session_id,
            InboundEvent::Vote(p) => p.session_id,
            InboundEvent::RevealCards(p)
            | InboundEvent::ResetVotes(p)
            | InboundEvent::ToggleAutoReveal(p) => p.session_id,
            InboundEvent::KickUser(p) => p.session_id,
        }
    }
}

fn payload<T: DeserializeOwned>(kind: EventKind, value: serde_json::Value) -> Result<T, ProtocolError> {
    serde_json::from_value(value).map_err(|e| ProtocolError::invalid_payload(kind, e.to_string()))
}

// ============================================
// Server → Client Messages
// ============================================

/// Every event kind the server sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboundEvent {
    /// Full session snapshot, broadcast to the room.
    SessionUpdated,
    /// Acknowledgement to the joiner.
    JoinSession,
    /// Confirmation to the voter.
    Vote,
    /// Acknowledgement to the kick initiator.
    UserKicked,
    /// Public notice that someone was kicked.
    UserKickedBroadcast,
    /// Kick refused.
    KickUserError,
    /// Direct notice to the kicked user.
    Kicked,
    /// Protocol or domain failure, sender only.
    Error,
}

/// Outbound envelope.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundMessage<T = serde_json::Value> {
    pub event: OutboundEvent,
    pub data: T,
}

impl<T: Serialize> OutboundMessage<T> {
    pub fn new(event: OutboundEvent, data: T) -> Self {
        Self { event, data }
    }

    /// Encodes the envelope as one JSON text frame.
    pub fn encode(&self) -> Result<String, TransportError> {
        serde_json::to_string(self).map_err(|e| TransportError::Encode(e.to_string()))
    }
}

/// `join_session` acknowledgement data.
#[derive(Debug, Clone, Serialize)]
pub struct JoinAckData {
    pub id: UserId,
    pub name: String,
    pub session_id: SessionId,
    pub is_watcher: bool,
}

/// `vote` confirmation data.
#[derive(Debug, Clone, Serialize)]
pub struct VoteAckData {
    pub id: VoteId,
    pub session_id: SessionId,
    pub user_id: UserId,
    pub value: String,
}

/// `kicked` data.
#[derive(Debug, Clone, Serialize)]
pub struct KickedData {
    pub session_id: SessionId,
    pub message: String,
}

/// `user_kicked_broadcast` data.
#[derive(Debug, Clone, Serialize)]
pub struct UserKickedBroadcastData {
    pub kicked_user_id: UserId,
    pub kicked_user_name: String,
}

/// `user_kicked` data.
#[derive(Debug, Clone, Serialize)]
pub struct UserKickedData {
    pub kicked_user_name: String,
}

/// `kick_user_error` data.
#[derive(Debug, Clone, Serialize)]
pub struct KickErrorData {
    pub message: String,
}

/// `error` data.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorData {
    pub code: String,
    pub message: String,
}

pub fn session_updated(view: &SessionView) -> OutboundMessage<&SessionView> {
    OutboundMessage::new(OutboundEvent::SessionUpdated, view)
}

pub fn error_message(code: impl Into<String>, message: impl Into<String>) -> OutboundMessage<ErrorData> {
    OutboundMessage::new(
        OutboundEvent::Error,
        ErrorData {
            code: code.into(),
            message: message.into(),
        },
    )
}
