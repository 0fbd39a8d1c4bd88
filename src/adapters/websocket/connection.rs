//! One live client stream.
//!
//! A [`Connection`] is created when the transport upgrade completes and is
//! shared (`Arc`) between its read loop, its writer, its heartbeat and any
//! room it has joined. Outbound frames go through a bounded queue that a
//! dedicated writer task drains into the socket, so sending never blocks.
//!
//! ```text
//! Upgraded ──join──▶ Joined(session, user) ──close──▶ Closing ──▶ Closed
//!     └───────────────────close───────────────────────▲
//! ```

use serde::Serialize;
use std::fmt;
use tokio::sync::{mpsc, watch, RwLock};
use uuid::Uuid;

use crate::domain::foundation::{SessionId, Timestamp, UserId};

use super::error::TransportError;
use super::messages::OutboundMessage;

/// Unique identifier for a WebSocket connection.
///
/// Generated server-side when a client connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A frame queued for the writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Ping,
    /// Final frame written after the queue is flushed on shutdown.
    Close,
}

/// Session membership established by a successful join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub session_id: SessionId,
    pub user_id: UserId,
}

/// Per-connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Upgraded,
    Joined(Binding),
    Closing,
    Closed,
}

/// Handle to one live client stream.
pub struct Connection {
    id: ConnectionId,
    outbound: mpsc::Sender<Frame>,
    state: RwLock<ConnectionState>,
    last_activity: RwLock<Timestamp>,
    shutdown: watch::Sender<bool>,
}

impl Connection {
    /// Creates a connection with an outbound queue of `buffer` frames.
    ///
    /// Returns the receiving half of the queue for the writer task.
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<Frame>) {
        let (outbound, rx) = mpsc::channel(buffer.max(1));
        let (shutdown, _) = watch::channel(false);
        let conn = Self {
            id: ConnectionId::new(),
            outbound,
            state: RwLock::new(ConnectionState::Upgraded),
            last_activity: RwLock::new(Timestamp::now()),
            shutdown,
        };
        (conn, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    // === Outbound ===

    /// Queues an already encoded text frame.
    pub fn send_text(&self, text: String) -> Result<(), TransportError> {
        self.send_frame(Frame::Text(text))
    }

    /// Encodes and queues one envelope.
    pub fn send<T: Serialize>(&self, message: &OutboundMessage<T>) -> Result<(), TransportError> {
        self.send_text(message.encode()?)
    }

    /// Queues a frame without waiting.
    ///
    /// A full queue means the client is not keeping up; the frame is
    /// dropped and reported as backpressure.
    pub fn send_frame(&self, frame: Frame) -> Result<(), TransportError> {
        self.outbound.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TransportError::Backpressure,
            mpsc::error::TrySendError::Closed(_) => TransportError::Closed,
        })
    }

    // === Lifecycle ===

    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    /// Current binding, if the connection has joined a session.
    pub async fn binding(&self) -> Option<Binding> {
        match *self.state.read().await {
            ConnectionState::Joined(binding) => Some(binding),
            _ => None,
        }
    }

    /// Records a successful join. Returns the previous binding, if any.
    ///
    /// Has no effect once the connection is closing.
    pub async fn bind(&self, binding: Binding) -> Option<Binding> {
        let mut state = self.state.write().await;
        match *state {
            ConnectionState::Upgraded => {
                *state = ConnectionState::Joined(binding);
                None
            }
            ConnectionState::Joined(previous) => {
                *state = ConnectionState::Joined(binding);
                Some(previous)
            }
            ConnectionState::Closing | ConnectionState::Closed => None,
        }
    }

    /// Drops the binding without closing the stream.
    ///
    /// Used when the server removes a user out-of-band, so the later
    /// stream close triggers no session-level cleanup.
    pub async fn unbind(&self) -> Option<Binding> {
        let mut state = self.state.write().await;
        match *state {
            ConnectionState::Joined(binding) => {
                *state = ConnectionState::Upgraded;
                Some(binding)
            }
            _ => None,
        }
    }

    /// Moves to `Closing`, returning the binding held at that moment.
    ///
    /// Only the first call observes the binding.
    pub async fn begin_close(&self) -> Option<Binding> {
        let mut state = self.state.write().await;
        let binding = match *state {
            ConnectionState::Joined(binding) => Some(binding),
            _ => None,
        };
        if !matches!(*state, ConnectionState::Closed) {
            *state = ConnectionState::Closing;
        }
        binding
    }

    pub async fn mark_closed(&self) {
        *self.state.write().await = ConnectionState::Closed;
    }

    // === Activity ===

    pub async fn touch(&self) {
        *self.last_activity.write().await = Timestamp::now();
    }

    pub async fn last_activity(&self) -> Timestamp {
        *self.last_activity.read().await
    }

    // === Cancellation ===

    /// Receiver for the shared cancellation signal.
    pub fn cancelled(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Signals the read loop, writer and heartbeat to stop.
    pub fn close(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.shutdown.borrow()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::websocket::messages::error_message;

    fn binding() -> Binding {
        Binding {
            session_id: SessionId::new(),
            user_id: UserId::new(),
        }
    }

    #[tokio::test]
    async fn new_connection_is_upgraded_and_unbound() {
        let (conn, _rx) = Connection::new(4);
        assert_eq!(conn.state().await, ConnectionState::Upgraded);
        assert_eq!(conn.binding().await, None);
    }

    #[tokio::test]
    async fn bind_then_rebind_returns_previous() {
        let (conn, _rx) = Connection::new(4);
        let first = binding();
        let second = binding();

        assert_eq!(conn.bind(first).await, None);
        assert_eq!(conn.bind(second).await, Some(first));
        assert_eq!(conn.binding().await, Some(second));
    }

    #[tokio::test]
    async fn begin_close_reports_binding_once() {
        let (conn, _rx) = Connection::new(4);
        let b = binding();
        conn.bind(b).await;

        assert_eq!(conn.begin_close().await, Some(b));
        assert_eq!(conn.begin_close().await, None);
        assert_eq!(conn.state().await, ConnectionState::Closing);
    }

    #[tokio::test]
    async fn unbound_connection_closes_without_binding() {
        let (conn, _rx) = Connection::new(4);
        assert_eq!(conn.begin_close().await, None);
    }

    #[tokio::test]
    async fn bind_after_close_is_ignored() {
        let (conn, _rx) = Connection::new(4);
        conn.begin_close().await;
        conn.bind(binding()).await;
        assert_eq!(conn.binding().await, None);
    }

    #[tokio::test]
    async fn send_queues_encoded_frame() {
        let (conn, mut rx) = Connection::new(4);
        conn.send(&error_message("X", "y")).unwrap();

        match rx.recv().await {
            Some(Frame::Text(text)) => assert!(text.contains(r#""event":"error""#)),
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[tokio::test]
    async fn full_queue_reports_backpressure() {
        let (conn, _rx) = Connection::new(1);
        conn.send_frame(Frame::Ping).unwrap();
        assert_eq!(conn.send_frame(Frame::Ping), Err(TransportError::Backpressure));
    }

    #[tokio::test]
    async fn dropped_receiver_reports_closed() {
        let (conn, rx) = Connection::new(1);
        drop(rx);
        assert_eq!(conn.send_frame(Frame::Ping), Err(TransportError::Closed));
    }

    #[tokio::test]
    async fn close_flips_cancellation_signal() {
        let (conn, _rx) = Connection::new(1);
        let mut cancelled = conn.cancelled();
        assert!(!conn.is_cancelled());

        conn.close();
        cancelled.changed().await.unwrap();
        assert!(*cancelled.borrow());
    }
}
