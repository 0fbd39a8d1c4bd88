//! KickUserHandler - lets the session creator remove a participant.

use std::sync::Arc;

use crate::adapters::websocket::connection::Connection;
use crate::adapters::websocket::error::WsError;
use crate::adapters::websocket::messages::{
    KickUserPayload, KickedData, OutboundEvent, OutboundMessage, UserKickedBroadcastData,
    UserKickedData,
};
use crate::domain::foundation::{SessionId, UserId};

use super::HandlerContext;

/// Handler for `kick_user`.
pub struct KickUserHandler {
    ctx: Arc<HandlerContext>,
}

impl KickUserHandler {
    pub fn new(ctx: Arc<HandlerContext>) -> Self {
        Self { ctx }
    }

    pub async fn handle(&self, conn: &Connection, payload: KickUserPayload) -> Result<(), WsError> {
        let session_id = payload.session_id;

        // 1. Authorize - only the creator may kick
        let view = self.ctx.sessions.get_session_by_id(&session_id).await?;
        if view.creator_id != payload.initiator_user_id {
            tracing::warn!(
                session_id = %session_id,
                user_id = %payload.initiator_user_id,
                "Kick refused for non-creator"
            );
            return Err(WsError::Authorization(
                "Only the session creator can kick users".to_string(),
            ));
        }

        // 2. Resolve the target and mark them offline
        let target = self.ctx.users.get_user(&payload.target_user).await?;
        self.ctx.sessions.disconnect_user(&target.id, &session_id).await?;

        // 3. Take the target's connections out of the room
        let kicked_conns = self.detach(&session_id, &target.id).await;

        // 4. Tell the target, then everyone else
        let kicked = OutboundMessage::new(
            OutboundEvent::Kicked,
            KickedData {
                session_id,
                message: "You have been removed from the session".to_string(),
            },
        );
        for target_conn in &kicked_conns {
            if let Err(err) = self.ctx.registry.send_direct(target_conn, &kicked) {
                tracing::debug!(connection_id = %target_conn.id(), error = %err, "Kick notice not delivered");
            }
        }

        let notice = OutboundMessage::new(
            OutboundEvent::UserKickedBroadcast,
            UserKickedBroadcastData {
                kicked_user_id: target.id,
                kicked_user_name: target.name.clone(),
            },
        );
        self.ctx.broadcast_logged(&session_id, &notice).await;

        // 5. Close the target's streams once the notice is queued
        for target_conn in &kicked_conns {
            target_conn.close();
        }

        tracing::info!(
            session_id = %session_id,
            user_id = %target.id,
            connections = kicked_conns.len(),
            "User kicked"
        );

        // 6. Refresh the room, then acknowledge to the initiator
        self.ctx.broadcast_session_state(&session_id).await?;

        let ack = OutboundMessage::new(
            OutboundEvent::UserKicked,
            UserKickedData {
                kicked_user_name: target.name,
            },
        );
        if let Err(err) = self.ctx.registry.send_direct(conn, &ack) {
            tracing::debug!(connection_id = %conn.id(), error = %err, "Kick ack not delivered");
        }
        Ok(())
    }

    /// Removes a user's connections from the room and unbinds them in one
    /// step, so a stream closing mid-kick finds nothing left to clean up.
    async fn detach(&self, session_id: &SessionId, user_id: &UserId) -> Vec<Arc<Connection>> {
        let conns = self.ctx.registry.remove_user(session_id, user_id).await;
        for conn in &conns {
            conn.unbind().await;
        }
        conns
    }
}
