//! Session service port.
//!
//! Owns durable session state: which users are connected to which session
//! and the reveal/auto-reveal flags. The WebSocket layer only ever talks to
//! it through this trait and never caches what it returns.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, SessionId, UserId};
use crate::domain::session::SessionView;

/// Port for session state owned by the persistence collaborator.
#[async_trait]
pub trait SessionService: Send + Sync {
    /// Canonical snapshot of a session, votes masked unless revealed.
    ///
    /// # Errors
    ///
    /// - `SessionNotFound` if the session doesn't exist
    async fn get_session_by_id(&self, session_id: &SessionId) -> Result<SessionView, DomainError>;

    /// Marks a user as online in a session.
    ///
    /// # Errors
    ///
    /// - `SessionNotFound` / `UserNotFound` for unknown ids
    async fn connect_user_to_session(
        &self,
        user_id: &UserId,
        session_id: &SessionId,
    ) -> Result<(), DomainError>;

    /// Marks a user as offline in a session.
    ///
    /// Disconnecting a user that is not connected is not an error.
    async fn disconnect_user(&self, user_id: &UserId, session_id: &SessionId)
        -> Result<(), DomainError>;

    /// Sets the reveal flag.
    async fn reveal_cards_in_session(
        &self,
        session_id: &SessionId,
        reveal: bool,
    ) -> Result<(), DomainError>;

    /// Toggles the auto-reveal flag.
    async fn auto_reveal_cards_in_session(&self, session_id: &SessionId) -> Result<(), DomainError>;
}
