//! VoteHandler - records a vote and refreshes the room.

use std::sync::Arc;

use crate::adapters::websocket::connection::Connection;
use crate::adapters::websocket::error::WsError;
use crate::adapters::websocket::messages::{
    session_updated, OutboundEvent, OutboundMessage, VoteAckData, VotePayload,
};
use crate::domain::session::Vote;

use super::HandlerContext;

/// Handler for `vote`.
pub struct VoteHandler {
    ctx: Arc<HandlerContext>,
}

impl VoteHandler {
    pub fn new(ctx: Arc<HandlerContext>) -> Self {
        Self { ctx }
    }

    pub async fn handle(&self, conn: &Connection, payload: VotePayload) -> Result<(), WsError> {
        // 1. Persist (one vote per user per session, last value wins)
        let vote = Vote::new(payload.session_id, payload.user_id, payload.value);
        let vote_id = self.ctx.votes.save_vote(&vote).await?;

        tracing::debug!(
            session_id = %vote.session_id,
            user_id = %vote.user_id,
            "Vote recorded"
        );

        // 2. Confirm to the voter
        let ack = OutboundMessage::new(
            OutboundEvent::Vote,
            VoteAckData {
                id: vote_id,
                session_id: vote.session_id,
                user_id: vote.user_id,
                value: vote.value,
            },
        );
        if let Err(err) = self.ctx.registry.send_direct(conn, &ack) {
            tracing::debug!(connection_id = %conn.id(), error = %err, "Vote ack not delivered");
        }

        // 3. Auto-reveal once every active voter is in
        let view = self.ctx.sessions.get_session_by_id(&vote.session_id).await?;
        if view.auto_reveal && !view.cards_revealed && view.all_voters_voted() {
            self.ctx
                .sessions
                .reveal_cards_in_session(&vote.session_id, true)
                .await?;
            tracing::info!(session_id = %vote.session_id, "All votes in, cards auto-revealed");
            self.ctx.broadcast_session_state(&vote.session_id).await?;
            return Ok(());
        }

        // 4. Everyone sees the new (masked) vote
        self.ctx
            .broadcast_logged(&vote.session_id, &session_updated(&view))
            .await;
        Ok(())
    }
}
