//! ToggleAutoRevealHandler - flips the session's auto-reveal flag.

use std::sync::Arc;

use crate::adapters::websocket::error::WsError;
use crate::adapters::websocket::messages::SessionPayload;

use super::HandlerContext;

/// Handler for `toggle_auto_reveal`.
pub struct ToggleAutoRevealHandler {
    ctx: Arc<HandlerContext>,
}

impl ToggleAutoRevealHandler {
    pub fn new(ctx: Arc<HandlerContext>) -> Self {
        Self { ctx }
    }

    pub async fn handle(&self, payload: SessionPayload) -> Result<(), WsError> {
        self.ctx
            .sessions
            .auto_reveal_cards_in_session(&payload.session_id)
            .await?;

        let view = self.ctx.broadcast_session_state(&payload.session_id).await?;
        tracing::info!(
            session_id = %payload.session_id,
            auto_reveal = view.auto_reveal,
            "Auto-reveal toggled"
        );
        Ok(())
    }
}
