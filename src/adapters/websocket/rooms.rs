//! Session registry: which live connections are in which session room.
//!
//! # Architecture
//!
//! ```text
//! Room: session-123    Room: session-456
//! ├── conn-a           ├── conn-d
//! ├── conn-b           └── conn-e
//! └── conn-c
//! ```
//!
//! A broadcast for session-123 reaches only connections a, b and c. A room
//! exists only while it has at least one member.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, SessionId, UserId};

use super::connection::{Connection, ConnectionId};
use super::error::{TransportError, WsError};
use super::messages::OutboundMessage;

/// Default per-session connection cap.
pub const DEFAULT_MAX_CONNECTIONS_PER_SESSION: usize = 100;

/// Room member: the connection plus the user it joined as.
#[derive(Clone)]
struct Member {
    conn: Arc<Connection>,
    user_id: UserId,
}

/// Thread-safe map from session to the connections joined to it.
///
/// # Thread Safety
///
/// One `RwLock` guards the map. It is held only for lookup and mutation;
/// sends happen on a snapshot taken under the read lock, so a slow client
/// never stalls joins, leaves or other rooms' broadcasts.
pub struct SessionRegistry {
    rooms: RwLock<HashMap<SessionId, Vec<Member>>>,
    max_per_session: usize,
}

impl SessionRegistry {
    pub fn new(max_per_session: usize) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            max_per_session: max_per_session.max(1),
        }
    }

    /// Adds a connection to a session room, creating the room if needed.
    ///
    /// Duplicate joins append; callers make sure a connection leaves its
    /// previous room first.
    ///
    /// # Errors
    ///
    /// `SESSION_FULL` when the room already holds the configured maximum.
    pub async fn join(
        &self,
        session_id: &SessionId,
        user_id: &UserId,
        conn: Arc<Connection>,
    ) -> Result<(), DomainError> {
        let mut rooms = self.rooms.write().await;

        let size = rooms.get(session_id).map(Vec::len).unwrap_or(0);
        if size >= self.max_per_session {
            return Err(DomainError::new(
                ErrorCode::SessionFull,
                format!("Session {} is full", session_id),
            ));
        }

        rooms.entry(*session_id).or_default().push(Member {
            conn,
            user_id: *user_id,
        });
        Ok(())
    }

    /// Removes a connection from a room. No-op if it isn't there.
    pub async fn leave(&self, session_id: &SessionId, conn_id: ConnectionId) {
        let mut rooms = self.rooms.write().await;

        let now_empty = match rooms.get_mut(session_id) {
            Some(room) => {
                if let Some(pos) = room.iter().position(|m| m.conn.id() == conn_id) {
                    room.remove(pos);
                }
                room.is_empty()
            }
            None => false,
        };
        if now_empty {
            rooms.remove(session_id);
        }
    }

    /// Removes every connection a user holds in a room and returns them.
    ///
    /// Used to force a user out independently of their own stream.
    pub async fn remove_user(&self, session_id: &SessionId, user_id: &UserId) -> Vec<Arc<Connection>> {
        let mut rooms = self.rooms.write().await;

        let Some(room) = rooms.get_mut(session_id) else {
            return Vec::new();
        };
        let (removed, kept): (Vec<Member>, Vec<Member>) =
            room.drain(..).partition(|m| m.user_id == *user_id);
        *room = kept;
        if room.is_empty() {
            rooms.remove(session_id);
        }

        removed.into_iter().map(|m| m.conn).collect()
    }

    /// Connections a user currently holds in a room.
    pub async fn connections_for_user(
        &self,
        session_id: &SessionId,
        user_id: &UserId,
    ) -> Vec<Arc<Connection>> {
        self.rooms
            .read()
            .await
            .get(session_id)
            .map(|room| {
                room.iter()
                    .filter(|m| m.user_id == *user_id)
                    .map(|m| Arc::clone(&m.conn))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Sends a message to every connection in a room.
    ///
    /// The message is encoded once. A failed recipient does not stop
    /// delivery to the rest; failures are aggregated into
    /// [`WsError::PartialBroadcast`] once every send has been attempted.
    /// An absent room is a successful no-op.
    pub async fn broadcast<T: Serialize>(
        &self,
        session_id: &SessionId,
        message: &OutboundMessage<T>,
    ) -> Result<(), WsError> {
        let text = message.encode()?;

        let recipients: Vec<Arc<Connection>> = {
            let rooms = self.rooms.read().await;
            match rooms.get(session_id) {
                Some(room) => room.iter().map(|m| Arc::clone(&m.conn)).collect(),
                None => return Ok(()),
            }
        };

        let attempted = recipients.len();
        let mut delivered = 0;
        let mut first: Option<TransportError> = None;

        for conn in recipients {
            match conn.send_text(text.clone()) {
                Ok(()) => delivered += 1,
                Err(err) => {
                    tracing::warn!(
                        session_id = %session_id,
                        connection_id = %conn.id(),
                        error = %err,
                        "Broadcast to connection failed"
                    );
                    first.get_or_insert(err);
                }
            }
        }

        match first {
            None => Ok(()),
            Some(first) => Err(WsError::PartialBroadcast {
                attempted,
                delivered,
                first,
            }),
        }
    }

    /// Sends a message to one connection.
    pub fn send_direct<T: Serialize>(
        &self,
        conn: &Connection,
        message: &OutboundMessage<T>,
    ) -> Result<(), TransportError> {
        conn.send(message)
    }

    /// Number of active rooms.
    pub async fn count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Number of connections across all rooms.
    pub async fn connection_count(&self) -> usize {
        self.rooms.read().await.values().map(Vec::len).sum()
    }

    /// Number of connections in one room (0 if it doesn't exist).
    pub async fn room_size(&self, session_id: &SessionId) -> usize {
        self.rooms
            .read()
            .await
            .get(session_id)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Whether a room exists.
    pub async fn contains_room(&self, session_id: &SessionId) -> bool {
        self.rooms.read().await.contains_key(session_id)
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONNECTIONS_PER_SESSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::websocket::connection::Frame;
    use crate::adapters::websocket::messages::error_message;
    use proptest::prelude::*;
    use tokio::sync::mpsc;

    fn conn() -> (Arc<Connection>, mpsc::Receiver<Frame>) {
        let (conn, rx) = Connection::new(8);
        (Arc::new(conn), rx)
    }

    #[tokio::test]
    async fn join_creates_room_if_not_exists() {
        let registry = SessionRegistry::default();
        let session_id = SessionId::new();
        let (c, _rx) = conn();

        registry.join(&session_id, &UserId::new(), c).await.unwrap();

        assert_eq!(registry.count().await, 1);
        assert_eq!(registry.room_size(&session_id).await, 1);
    }

    #[tokio::test]
    async fn leave_cleans_up_empty_room() {
        let registry = SessionRegistry::default();
        let session_id = SessionId::new();
        let (c, _rx) = conn();

        registry.join(&session_id, &UserId::new(), c.clone()).await.unwrap();
        registry.leave(&session_id, c.id()).await;

        assert!(!registry.contains_room(&session_id).await);
        assert_eq!(registry.connection_count().await, 0);
    }

    #[tokio::test]
    async fn leave_of_absent_connection_is_noop() {
        let registry = SessionRegistry::default();
        let session_id = SessionId::new();
        let (member, _rx1) = conn();
        let (stranger, _rx2) = conn();

        registry.join(&session_id, &UserId::new(), member).await.unwrap();
        registry.leave(&session_id, stranger.id()).await;
        registry.leave(&SessionId::new(), stranger.id()).await;

        assert_eq!(registry.room_size(&session_id).await, 1);
    }

    #[tokio::test]
    async fn join_beyond_cap_is_session_full() {
        let registry = SessionRegistry::new(2);
        let session_id = SessionId::new();
        let (a, _ra) = conn();
        let (b, _rb) = conn();
        let (c, _rc) = conn();

        registry.join(&session_id, &UserId::new(), a).await.unwrap();
        registry.join(&session_id, &UserId::new(), b).await.unwrap();
        let err = registry.join(&session_id, &UserId::new(), c).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::SessionFull);
        assert_eq!(registry.room_size(&session_id).await, 2);
    }

    #[tokio::test]
    async fn broadcast_reaches_every_member_of_the_room_only() {
        let registry = SessionRegistry::default();
        let room_1 = SessionId::new();
        let room_2 = SessionId::new();
        let (a, mut ra) = conn();
        let (b, mut rb) = conn();
        let (other, mut ro) = conn();

        registry.join(&room_1, &UserId::new(), a).await.unwrap();
        registry.join(&room_1, &UserId::new(), b).await.unwrap();
        registry.join(&room_2, &UserId::new(), other).await.unwrap();

        registry
            .broadcast(&room_1, &error_message("X", "hello"))
            .await
            .unwrap();

        assert!(matches!(ra.try_recv(), Ok(Frame::Text(_))));
        assert!(matches!(rb.try_recv(), Ok(Frame::Text(_))));
        assert!(ro.try_recv().is_err());
    }

    #[tokio::test]
    async fn broadcast_to_nonexistent_room_is_noop() {
        let registry = SessionRegistry::default();
        registry
            .broadcast(&SessionId::new(), &error_message("X", "nobody"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn one_failed_recipient_does_not_block_the_rest() {
        let registry = SessionRegistry::default();
        let session_id = SessionId::new();
        let (a, mut ra) = conn();
        let (broken, broken_rx) = conn();
        let (c, mut rc) = conn();
        drop(broken_rx);

        registry.join(&session_id, &UserId::new(), a).await.unwrap();
        registry.join(&session_id, &UserId::new(), broken).await.unwrap();
        registry.join(&session_id, &UserId::new(), c).await.unwrap();

        let err = registry
            .broadcast(&session_id, &error_message("X", "fan-out"))
            .await
            .unwrap_err();

        match err {
            WsError::PartialBroadcast {
                attempted,
                delivered,
                first,
            } => {
                assert_eq!(attempted, 3);
                assert_eq!(delivered, 2);
                assert_eq!(first, TransportError::Closed);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(ra.try_recv().is_ok());
        assert!(rc.try_recv().is_ok());
    }

    #[tokio::test]
    async fn full_queue_recipient_does_not_block_broadcast() {
        let registry = SessionRegistry::default();
        let session_id = SessionId::new();
        let (slow, slow_rx) = Connection::new(1);
        let slow = Arc::new(slow);
        let (healthy, mut healthy_rx) = conn();
        slow.send_frame(Frame::Ping).unwrap();

        registry.join(&session_id, &UserId::new(), slow).await.unwrap();
        registry.join(&session_id, &UserId::new(), healthy).await.unwrap();

        let err = registry
            .broadcast(&session_id, &error_message("X", "slow"))
            .await
            .unwrap_err();

        match err {
            WsError::PartialBroadcast {
                attempted,
                delivered,
                first,
            } => {
                assert_eq!(attempted, 2);
                assert_eq!(delivered, 1);
                assert_eq!(first, TransportError::Backpressure);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(matches!(healthy_rx.try_recv(), Ok(Frame::Text(_))));
        drop(slow_rx);
    }

    #[tokio::test]
    async fn remove_user_takes_all_of_their_connections() {
        let registry = SessionRegistry::default();
        let session_id = SessionId::new();
        let target = UserId::new();
        let (t1, _r1) = conn();
        let (t2, _r2) = conn();
        let (other, _r3) = conn();

        registry.join(&session_id, &target, t1).await.unwrap();
        registry.join(&session_id, &target, t2).await.unwrap();
        registry.join(&session_id, &UserId::new(), other).await.unwrap();

        let removed = registry.remove_user(&session_id, &target).await;

        assert_eq!(removed.len(), 2);
        assert_eq!(registry.room_size(&session_id).await, 1);
        assert!(registry.connections_for_user(&session_id, &target).await.is_empty());
    }

    #[tokio::test]
    async fn connection_count_spans_rooms() {
        let registry = SessionRegistry::default();
        let (a, _ra) = conn();
        let (b, _rb) = conn();
        let (c, _rc) = conn();

        registry.join(&SessionId::new(), &UserId::new(), a).await.unwrap();
        registry.join(&SessionId::new(), &UserId::new(), b).await.unwrap();
        registry.join(&SessionId::new(), &UserId::new(), c).await.unwrap();

        assert_eq!(registry.count().await, 3);
        assert_eq!(registry.connection_count().await, 3);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Join { conn: usize, room: usize },
        Leave { conn: usize, room: usize },
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..4usize, 0..2usize).prop_map(|(conn, room)| Op::Join { conn, room }),
            (0..4usize, 0..2usize).prop_map(|(conn, room)| Op::Leave { conn, room }),
        ]
    }

    proptest! {
        #[test]
        fn room_size_tracks_joins_minus_leaves(ops in prop::collection::vec(op(), 0..40)) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let registry = SessionRegistry::new(usize::MAX);
                let rooms = [SessionId::new(), SessionId::new()];
                let conns: Vec<_> = (0..4).map(|_| conn()).collect();
                let mut model: HashMap<usize, Vec<usize>> = HashMap::new();

                for op in ops {
                    match op {
                        Op::Join { conn, room } => {
                            registry
                                .join(&rooms[room], &UserId::new(), conns[conn].0.clone())
                                .await
                                .unwrap();
                            model.entry(room).or_default().push(conn);
                        }
                        Op::Leave { conn, room } => {
                            registry.leave(&rooms[room], conns[conn].0.id()).await;
                            if let Some(members) = model.get_mut(&room) {
                                if let Some(pos) = members.iter().position(|c| *c == conn) {
                                    members.remove(pos);
                                }
                            }
                        }
                    }
                }

                for (idx, session_id) in rooms.iter().enumerate() {
                    let expected = model.get(&idx).map(Vec::len).unwrap_or(0);
                    assert_eq!(registry.room_size(session_id).await, expected);
                    assert_eq!(registry.contains_room(session_id).await, expected > 0);
                }
            });
        }
    }
}
