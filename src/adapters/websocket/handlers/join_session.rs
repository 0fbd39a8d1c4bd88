//! JoinSessionHandler - binds a connection to a session room.
//!
//! The `is_watcher` flag in the payload is only echoed in the ack; snapshots
//! and the auto-reveal voter check use the stored user record.

use std::sync::Arc;

use crate::adapters::websocket::connection::{Binding, Connection};
use crate::adapters::websocket::error::WsError;
use crate::adapters::websocket::messages::{JoinAckData, JoinSessionPayload, OutboundEvent, OutboundMessage};

use super::HandlerContext;

/// Handler for `join_session`.
pub struct JoinSessionHandler {
    ctx: Arc<HandlerContext>,
}

impl JoinSessionHandler {
    pub fn new(ctx: Arc<HandlerContext>) -> Self {
        Self { ctx }
    }

    pub async fn handle(&self, conn: &Arc<Connection>, payload: JoinSessionPayload) -> Result<(), WsError> {
        let binding = Binding {
            session_id: payload.session_id,
            user_id: payload.user_id,
        };

        // 1. A stream holds one room at a time
        if let Some(previous) = conn.binding().await {
            self.leave_previous(conn, previous, binding).await;
        }

        // 2. Mark the user online
        self.ctx
            .sessions
            .connect_user_to_session(&payload.user_id, &payload.session_id)
            .await?;

        // 3. Enter the room, undoing step 2 if the room refuses us
        if let Err(err) = self
            .ctx
            .registry
            .join(&payload.session_id, &payload.user_id, Arc::clone(conn))
            .await
        {
            if let Err(rollback) = self
                .ctx
                .sessions
                .disconnect_user(&payload.user_id, &payload.session_id)
                .await
            {
                tracing::warn!(
                    session_id = %payload.session_id,
                    user_id = %payload.user_id,
                    error = %rollback,
                    "Failed to roll back refused join"
                );
            }
            return Err(err.into());
        }
        conn.bind(binding).await;

        tracing::info!(
            session_id = %payload.session_id,
            user_id = %payload.user_id,
            connection_id = %conn.id(),
            is_watcher = payload.is_watcher,
            "User joined session"
        );

        // 4. Acknowledge to the joiner
        let ack = OutboundMessage::new(
            OutboundEvent::JoinSession,
            JoinAckData {
                id: payload.user_id,
                name: payload.user_name,
                session_id: payload.session_id,
                is_watcher: payload.is_watcher,
            },
        );
        if let Err(err) = self.ctx.registry.send_direct(conn, &ack) {
            tracing::debug!(connection_id = %conn.id(), error = %err, "Join ack not delivered");
        }

        // 5. Everyone sees the new participant
        self.ctx.broadcast_session_state(&payload.session_id).await?;
        Ok(())
    }

    async fn leave_previous(&self, conn: &Connection, previous: Binding, next: Binding) {
        self.ctx.registry.leave(&previous.session_id, conn.id()).await;
        conn.unbind().await;

        if previous == next {
            return;
        }
        if let Err(err) = self
            .ctx
            .sessions
            .disconnect_user(&previous.user_id, &previous.session_id)
            .await
        {
            tracing::warn!(
                session_id = %previous.session_id,
                user_id = %previous.user_id,
                error = %err,
                "Failed to leave previous session"
            );
            return;
        }
        if let Err(err) = self.ctx.broadcast_session_state(&previous.session_id).await {
            tracing::warn!(session_id = %previous.session_id, error = %err, "Failed to refresh previous session");
        }
    }
}
