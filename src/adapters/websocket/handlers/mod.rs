//! Event handlers - one per inbound event kind.
//!
//! Every handler follows the same shape: call the state collaborators,
//! answer the sender directly where the protocol requires it, then
//! re-fetch the canonical session snapshot and broadcast it to the room.

mod auto_reveal;
mod join_session;
mod kick_user;
mod reset_votes;
mod reveal_cards;
mod vote;

pub use auto_reveal::ToggleAutoRevealHandler;
pub use join_session::JoinSessionHandler;
pub use kick_user::KickUserHandler;
pub use reset_votes::ResetVotesHandler;
pub use reveal_cards::RevealCardsHandler;
pub use vote::VoteHandler;

use serde::Serialize;
use std::sync::Arc;

use crate::domain::foundation::SessionId;
use crate::domain::session::SessionView;
use crate::ports::{SessionService, UserService, VoteService};

use super::error::WsError;
use super::messages::{session_updated, OutboundMessage};
use super::rooms::SessionRegistry;

/// Collaborators shared by every handler.
#[derive(Clone)]
pub struct HandlerContext {
    pub registry: Arc<SessionRegistry>,
    pub sessions: Arc<dyn SessionService>,
    pub votes: Arc<dyn VoteService>,
    pub users: Arc<dyn UserService>,
}

impl HandlerContext {
    pub fn new(
        registry: Arc<SessionRegistry>,
        sessions: Arc<dyn SessionService>,
        votes: Arc<dyn VoteService>,
        users: Arc<dyn UserService>,
    ) -> Self {
        Self {
            registry,
            sessions,
            votes,
            users,
        }
    }

    /// Re-fetches the session and broadcasts `session_updated` to its room.
    ///
    /// A failed fetch is returned to the caller. Fan-out failures are logged
    /// and swallowed: the remaining recipients were still served.
    pub async fn broadcast_session_state(&self, session_id: &SessionId) -> Result<SessionView, WsError> {
        let view = self.sessions.get_session_by_id(session_id).await?;
        self.broadcast_logged(session_id, &session_updated(&view)).await;
        Ok(view)
    }

    /// Broadcasts a message, logging instead of failing on partial delivery.
    pub async fn broadcast_logged<T: Serialize>(
        &self,
        session_id: &SessionId,
        message: &OutboundMessage<T>,
    ) {
        if let Err(err) = self.registry.broadcast(session_id, message).await {
            tracing::warn!(
                session_id = %session_id,
                event = ?message.event,
                error = %err,
                "Broadcast incomplete"
            );
        }
    }
}
