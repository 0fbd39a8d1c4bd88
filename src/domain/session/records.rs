//! Stored session, user and vote records.
//!
//! These are what a persistence adapter holds. Clients never see them
//! directly; they receive a [`SessionView`](super::SessionView).

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{SessionId, Timestamp, UserId, VoteId};

use super::DeckType;

/// A planning poker session as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub name: String,
    pub deck_type: DeckType,
    pub cards_revealed: bool,
    pub creator_id: UserId,
    pub creator_name: String,
    pub allow_emoji: bool,
    pub auto_reveal: bool,
    pub created_via: String,
    pub created_at: Timestamp,
    pub updated_at: Option<Timestamp>,
}

impl Session {
    /// A fresh session with cards hidden and auto-reveal off.
    pub fn new(
        name: impl Into<String>,
        deck_type: DeckType,
        creator_id: UserId,
        creator_name: impl Into<String>,
    ) -> Self {
        Self {
            id: SessionId::new(),
            name: name.into(),
            deck_type,
            cards_revealed: false,
            creator_id,
            creator_name: creator_name.into(),
            allow_emoji: true,
            auto_reveal: false,
            created_via: "web".to_string(),
            created_at: Timestamp::now(),
            updated_at: None,
        }
    }

    pub fn is_creator(&self, user_id: &UserId) -> bool {
        self.creator_id == *user_id
    }
}

/// A participant known to the user service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    #[serde(default)]
    pub is_guest: bool,
    #[serde(default)]
    pub is_watcher: bool,
    #[serde(default)]
    pub on_session: bool,
}

impl User {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_guest: false,
            is_watcher: false,
            on_session: false,
        }
    }

    pub fn watcher(mut self) -> Self {
        self.is_watcher = true;
        self
    }
}

/// One participant's vote in one session. Unique per (session, user).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub id: VoteId,
    pub session_id: SessionId,
    pub user_id: UserId,
    pub value: String,
    pub created_at: Timestamp,
    pub updated_at: Option<Timestamp>,
}

impl Vote {
    pub fn new(session_id: SessionId, user_id: UserId, value: impl Into<String>) -> Self {
        Self {
            id: VoteId::new(),
            session_id,
            user_id,
            value: value.into(),
            created_at: Timestamp::now(),
            updated_at: None,
        }
    }
}
