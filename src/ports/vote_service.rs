//! Vote service port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, SessionId, VoteId};
use crate::domain::session::Vote;

/// Port for vote persistence.
#[async_trait]
pub trait VoteService: Send + Sync {
    /// Stores a vote, replacing any earlier vote by the same user in the
    /// same session. Returns the id of the stored vote.
    async fn save_vote(&self, vote: &Vote) -> Result<VoteId, DomainError>;

    /// Removes every vote cast in a session.
    async fn delete_votes_in_session(&self, session_id: &SessionId) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_service_is_object_safe() {
        fn _accepts_dyn(_service: &dyn VoteService) {}
    }
}
