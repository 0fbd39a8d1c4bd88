//! Event dispatcher: decodes inbound frames and routes them to handlers.
//!
//! The handler table is built once at construction and never changes.
//! Routing is an exhaustive match over [`InboundEvent`], so adding an event
//! kind without a handler does not compile.

use std::sync::Arc;

use crate::domain::foundation::SessionId;

use super::connection::Connection;
use super::error::WsError;
use super::handlers::{
    HandlerContext, JoinSessionHandler, KickUserHandler, ResetVotesHandler, RevealCardsHandler,
    ToggleAutoRevealHandler, VoteHandler,
};
use super::messages::{error_message, EventKind, InboundEvent, KickErrorData, OutboundEvent, OutboundMessage};

struct HandlerTable {
    join_session: JoinSessionHandler,
    vote: VoteHandler,
    reveal_cards: RevealCardsHandler,
    reset_votes: ResetVotesHandler,
    toggle_auto_reveal: ToggleAutoRevealHandler,
    kick_user: KickUserHandler,
}

/// Routes decoded events to their handlers and owns error replies.
pub struct EventDispatcher {
    ctx: Arc<HandlerContext>,
    handlers: HandlerTable,
}

impl EventDispatcher {
    pub fn new(ctx: Arc<HandlerContext>) -> Self {
        let handlers = HandlerTable {
            join_session: JoinSessionHandler::new(ctx.clone()),
            vote: VoteHandler::new(ctx.clone()),
            reveal_cards: RevealCardsHandler::new(ctx.clone()),
            reset_votes: ResetVotesHandler::new(ctx.clone()),
            toggle_auto_reveal: ToggleAutoRevealHandler::new(ctx.clone()),
            kick_user: KickUserHandler::new(ctx.clone()),
        };
        Self { ctx, handlers }
    }

    pub fn context(&self) -> &Arc<HandlerContext> {
        &self.ctx
    }

    /// Processes one inbound text frame.
    ///
    /// Never fails: every error is logged and, where appropriate, answered
    /// to the sender. The caller's read loop keeps going either way.
    pub async fn handle_text(&self, conn: &Arc<Connection>, text: &str) {
        let event = match InboundEvent::decode(text) {
            Ok(event) => event,
            Err(err) => {
                tracing::debug!(connection_id = %conn.id(), error = %err, "Rejected inbound frame");
                self.reply_error(conn, None, &WsError::from(err));
                return;
            }
        };

        let kind = event.kind();
        tracing::debug!(
            connection_id = %conn.id(),
            session_id = %event.session_id(),
            event = %kind,
            "Dispatching event"
        );

        if let Err(err) = self.dispatch(conn, event).await {
            if err.notifies_sender() {
                tracing::warn!(connection_id = %conn.id(), event = %kind, error = %err, "Handler failed");
            } else {
                tracing::debug!(connection_id = %conn.id(), event = %kind, error = %err, "Handler failed");
            }
            self.reply_error(conn, Some(kind), &err);
        }
    }

    /// Routes one decoded event.
    pub async fn dispatch(&self, conn: &Arc<Connection>, event: InboundEvent) -> Result<(), WsError> {
        match event {
            InboundEvent::JoinSession(p) => self.handlers.join_session.handle(conn, p).await,
            InboundEvent::Vote(p) => self.handlers.vote.handle(conn, p).await,
            InboundEvent::RevealCards(p) => self.handlers.reveal_cards.handle(p).await,
            InboundEvent::ResetVotes(p) => self.handlers.reset_votes.handle(p).await,
            InboundEvent::ToggleAutoReveal(p) => self.handlers.toggle_auto_reveal.handle(p).await,
            InboundEvent::KickUser(p) => self.handlers.kick_user.handle(conn, p).await,
        }
    }

    /// Answers a failed event to its sender only.
    ///
    /// Refused kicks get `kick_user_error`; everything else that concerns
    /// the sender gets a generic `error` frame.
    pub fn reply_error(&self, conn: &Connection, kind: Option<EventKind>, err: &WsError) {
        if !err.notifies_sender() {
            return;
        }

        let sent = match (kind, err) {
            (Some(EventKind::KickUser), WsError::Authorization(message)) => {
                let reply = OutboundMessage::new(
                    OutboundEvent::KickUserError,
                    KickErrorData {
                        message: message.clone(),
                    },
                );
                self.ctx.registry.send_direct(conn, &reply)
            }
            _ => self
                .ctx
                .registry
                .send_direct(conn, &error_message(err.code(), reply_text(err))),
        };

        if let Err(send_err) = sent {
            tracing::debug!(connection_id = %conn.id(), error = %send_err, "Error reply not delivered");
        }
    }

    /// Session-level cleanup for a closing stream.
    ///
    /// Only a connection that completed a join leaves a room and is marked
    /// offline; one that never joined has nothing to undo.
    pub async fn disconnect(&self, conn: &Connection) {
        let Some(binding) = conn.begin_close().await else {
            tracing::debug!(connection_id = %conn.id(), "Closed before joining a session");
            return;
        };

        self.ctx.registry.leave(&binding.session_id, conn.id()).await;

        if let Err(err) = self
            .ctx
            .sessions
            .disconnect_user(&binding.user_id, &binding.session_id)
            .await
        {
            tracing::warn!(
                session_id = %binding.session_id,
                user_id = %binding.user_id,
                error = %err,
                "Failed to mark user offline"
            );
            return;
        }

        tracing::info!(
            session_id = %binding.session_id,
            user_id = %binding.user_id,
            connection_id = %conn.id(),
            "User left session"
        );
        self.refresh(&binding.session_id).await;
    }

    async fn refresh(&self, session_id: &SessionId) {
        if let Err(err) = self.ctx.broadcast_session_state(session_id).await {
            tracing::warn!(session_id = %session_id, error = %err, "Failed to refresh session");
        }
    }
}

/// Client-facing message for an error frame.
fn reply_text(err: &WsError) -> String {
    match err {
        WsError::Protocol(inner) => inner.to_string(),
        WsError::Authorization(message) => message.clone(),
        WsError::Domain(domain) => domain.message.clone(),
        other => other.to_string(),
    }
}
