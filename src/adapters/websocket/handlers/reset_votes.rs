//! ResetVotesHandler - starts a new voting round.

use std::sync::Arc;

use crate::adapters::websocket::error::WsError;
use crate::adapters::websocket::messages::SessionPayload;

use super::HandlerContext;

/// Handler for `reset_votes`.
pub struct ResetVotesHandler {
    ctx: Arc<HandlerContext>,
}

impl ResetVotesHandler {
    pub fn new(ctx: Arc<HandlerContext>) -> Self {
        Self { ctx }
    }

    pub async fn handle(&self, payload: SessionPayload) -> Result<(), WsError> {
        // 1. Drop every vote, then hide the cards again
        self.ctx.votes.delete_votes_in_session(&payload.session_id).await?;
        self.ctx
            .sessions
            .reveal_cards_in_session(&payload.session_id, false)
            .await?;
        tracing::info!(session_id = %payload.session_id, "Votes reset");

        // 2. Broadcast the empty round
        self.ctx.broadcast_session_state(&payload.session_id).await?;
        Ok(())
    }
}
