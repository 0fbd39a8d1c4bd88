//! RevealCardsHandler - exposes every cast vote.

use std::sync::Arc;

use crate::adapters::websocket::error::WsError;
use crate::adapters::websocket::messages::SessionPayload;

use super::HandlerContext;

/// Handler for `reveal_cards`.
pub struct RevealCardsHandler {
    ctx: Arc<HandlerContext>,
}

impl RevealCardsHandler {
    pub fn new(ctx: Arc<HandlerContext>) -> Self {
        Self { ctx }
    }

    pub async fn handle(&self, payload: SessionPayload) -> Result<(), WsError> {
        self.ctx
            .sessions
            .reveal_cards_in_session(&payload.session_id, true)
            .await?;
        tracing::info!(session_id = %payload.session_id, "Cards revealed");

        self.ctx.broadcast_session_state(&payload.session_id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::websocket::handlers::test_support::{drain, Fixture};
    use crate::adapters::websocket::handlers::VoteHandler;
    use crate::adapters::websocket::messages::VotePayload;
    use crate::domain::foundation::SessionId;

    #[tokio::test]
    async fn reveal_exposes_real_values_and_most_common() {
        let fx = Fixture::new().await;
        let ada = fx.user("Ada").await;
        let bob = fx.user("Bob").await;
        let (ada_conn, _ada_rx) = fx.joined(&ada).await;
        let (_bob_conn, mut bob_rx) = fx.joined(&bob).await;

        VoteHandler::new(fx.ctx.clone())
            .handle(
                &ada_conn,
                VotePayload {
                    session_id: fx.session.id,
                    user_id: ada.id,
                    value: "13".into(),
                },
            )
            .await
            .unwrap();
        drain(&mut bob_rx);

        RevealCardsHandler::new(fx.ctx.clone())
            .handle(SessionPayload {
                session_id: fx.session.id,
            })
            .await
            .unwrap();

        let frames = drain(&mut bob_rx);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["data"]["cards_revealed"], true);
        assert_eq!(frames[0]["data"]["votes"][ada.id.to_string()], "13");
        assert_eq!(frames[0]["data"]["most_common_vote"], "13");
    }

    #[tokio::test]
    async fn reveal_of_unknown_session_broadcasts_nothing() {
        let fx = Fixture::new().await;
        let ada = fx.user("Ada").await;
        let (_conn, mut rx) = fx.joined(&ada).await;
        drain(&mut rx);

        let err = RevealCardsHandler::new(fx.ctx.clone())
            .handle(SessionPayload {
                session_id: SessionId::new(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.code(), "SESSION_NOT_FOUND");
        assert!(drain(&mut rx).is_empty());
    }
}
