//! Canonical session snapshot broadcast to every participant.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::foundation::{SessionId, UserId};

use super::{most_common_vote, DeckType, Session, User, Vote, HIDDEN_VOTE};

/// A participant as shown inside a session snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: UserId,
    pub name: String,
    pub is_creator: bool,
    pub is_watcher: bool,
    pub on_session: bool,
}

/// Full session state as clients see it.
///
/// Vote values are masked with `"hidden"` until the cards are revealed, and
/// `most_common_vote` is only computed once they are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    pub id: SessionId,
    pub name: String,
    pub deck_type: DeckType,
    pub cards_revealed: bool,
    pub creator_id: UserId,
    pub creator_name: String,
    pub allow_emoji: bool,
    pub auto_reveal: bool,
    pub created_via: String,
    pub deck_values: Vec<String>,
    pub users: Vec<SessionUser>,
    pub votes: BTreeMap<UserId, String>,
    pub most_common_vote: Option<String>,
}

impl SessionView {
    /// Builds the snapshot from stored records.
    ///
    /// `users` are the participants currently connected to the session.
    pub fn build(session: &Session, users: &[User], votes: &[Vote]) -> Self {
        let votes_by_user: BTreeMap<UserId, String> = votes
            .iter()
            .filter(|v| v.session_id == session.id)
            .map(|v| {
                let value = if session.cards_revealed {
                    v.value.clone()
                } else {
                    HIDDEN_VOTE.to_string()
                };
                (v.user_id, value)
            })
            .collect();

        let most_common_vote = if session.cards_revealed {
            most_common_vote(
                votes
                    .iter()
                    .filter(|v| v.session_id == session.id)
                    .map(|v| v.value.as_str()),
                session.deck_type.values(),
            )
        } else {
            None
        };

        let mut users: Vec<SessionUser> = users
            .iter()
            .map(|u| SessionUser {
                id: u.id,
                name: u.name.clone(),
                is_creator: session.is_creator(&u.id),
                is_watcher: u.is_watcher,
                on_session: u.on_session,
            })
            .collect();
        users.sort_by_key(|u| u.id);

        Self {
            id: session.id,
            name: session.name.clone(),
            deck_type: session.deck_type,
            cards_revealed: session.cards_revealed,
            creator_id: session.creator_id,
            creator_name: session.creator_name.clone(),
            allow_emoji: session.allow_emoji,
            auto_reveal: session.auto_reveal,
            created_via: session.created_via.clone(),
            deck_values: session
                .deck_type
                .values()
                .iter()
                .map(|v| v.to_string())
                .collect(),
            users,
            votes: votes_by_user,
            most_common_vote,
        }
    }

    /// True when every connected non-watcher has a vote on record.
    ///
    /// A session without voters is never considered complete.
    pub fn all_voters_voted(&self) -> bool {
        let mut voters = self
            .users
            .iter()
            .filter(|u| !u.is_watcher && u.on_session)
            .peekable();
        voters.peek().is_some() && voters.all(|u| self.votes.contains_key(&u.id))
    }

    pub fn user(&self, user_id: &UserId) -> Option<&SessionUser> {
        self.users.iter().find(|u| u.id == *user_id)
    }
}
