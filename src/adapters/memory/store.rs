//! In-memory implementation of the session, vote and user ports.
//!
//! Stands in for the database-backed collaborator in tests and single-node
//! demos. All state lives behind one `RwLock`; every operation takes the
//! lock once and never awaits while holding it across another call.

use async_trait::async_trait;
use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, SessionId, Timestamp, UserId, VoteId};
use crate::domain::session::{Session, SessionView, User, Vote};
use crate::ports::{SessionService, UserService, VoteService};

#[derive(Default)]
struct StoreState {
    sessions: HashMap<SessionId, Session>,
    users: HashMap<UserId, User>,
    /// Users currently connected to each session.
    connections: HashMap<SessionId, BTreeSet<UserId>>,
    votes: HashMap<(SessionId, UserId), Vote>,
}

/// In-memory planning poker store.
///
/// Features:
/// - Votes upserted per (session, user), last value wins
/// - Snapshot masking shared with every other adapter via [`SessionView::build`]
/// - Outage simulation and call counters for assertions
pub struct InMemoryPlanningStore {
    state: RwLock<StoreState>,
    unavailable: AtomicBool,
    disconnect_calls: AtomicUsize,
}

impl InMemoryPlanningStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            unavailable: AtomicBool::new(false),
            disconnect_calls: AtomicUsize::new(0),
        }
    }

    /// Adds or replaces a user.
    pub async fn insert_user(&self, user: User) {
        self.state.write().await.users.insert(user.id, user);
    }

    /// Adds or replaces a session.
    pub async fn insert_session(&self, session: Session) {
        self.state.write().await.sessions.insert(session.id, session);
    }

    /// Number of known sessions.
    pub async fn session_count(&self) -> usize {
        self.state.read().await.sessions.len()
    }

    /// Whether a user is currently marked online in a session.
    pub async fn is_connected(&self, user_id: &UserId, session_id: &SessionId) -> bool {
        self.state
            .read()
            .await
            .connections
            .get(session_id)
            .map(|users| users.contains(user_id))
            .unwrap_or(false)
    }

    // === Test Helpers ===

    /// Makes every port call fail with `DATABASE_ERROR` while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// How many times `disconnect_user` has been called.
    pub fn disconnect_calls(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), DomainError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DomainError::new(
                ErrorCode::DatabaseError,
                "Session store unavailable",
            ));
        }
        Ok(())
    }
}

impl Default for InMemoryPlanningStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionService for InMemoryPlanningStore {
    async fn get_session_by_id(&self, session_id: &SessionId) -> Result<SessionView, DomainError> {
        self.check_available()?;
        let state = self.state.read().await;

        let session = state
            .sessions
            .get(session_id)
            .ok_or_else(|| DomainError::session_not_found(session_id))?;

        let users: Vec<User> = state
            .connections
            .get(session_id)
            .into_iter()
            .flatten()
            .filter_map(|id| state.users.get(id))
            .cloned()
            .collect();

        let votes: Vec<Vote> = state
            .votes
            .values()
            .filter(|v| v.session_id == *session_id)
            .cloned()
            .collect();

        Ok(SessionView::build(session, &users, &votes))
    }

    async fn connect_user_to_session(
        &self,
        user_id: &UserId,
        session_id: &SessionId,
    ) -> Result<(), DomainError> {
        self.check_available()?;
        let mut state = self.state.write().await;

        if !state.sessions.contains_key(session_id) {
            return Err(DomainError::session_not_found(session_id));
        }
        let user = state
            .users
            .get_mut(user_id)
            .ok_or_else(|| DomainError::user_not_found(user_id))?;
        user.on_session = true;

        state
            .connections
            .entry(*session_id)
            .or_default()
            .insert(*user_id);
        Ok(())
    }

    async fn disconnect_user(
        &self,
        user_id: &UserId,
        session_id: &SessionId,
    ) -> Result<(), DomainError> {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let mut state = self.state.write().await;

        let now_empty = match state.connections.get_mut(session_id) {
            Some(users) => {
                users.remove(user_id);
                users.is_empty()
            }
            None => false,
        };
        if now_empty {
            state.connections.remove(session_id);
        }
        if let Some(user) = state.users.get_mut(user_id) {
            user.on_session = false;
        }
        Ok(())
    }

    async fn reveal_cards_in_session(
        &self,
        session_id: &SessionId,
        reveal: bool,
    ) -> Result<(), DomainError> {
        self.check_available()?;
        let mut state = self.state.write().await;
        let session = state
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| DomainError::session_not_found(session_id))?;
        session.cards_revealed = reveal;
        session.updated_at = Some(Timestamp::now());
        Ok(())
    }

    async fn auto_reveal_cards_in_session(&self, session_id: &SessionId) -> Result<(), DomainError> {
        self.check_available()?;
        let mut state = self.state.write().await;
        let session = state
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| DomainError::session_not_found(session_id))?;
        session.auto_reveal = !session.auto_reveal;
        session.updated_at = Some(Timestamp::now());
        Ok(())
    }
}

#[async_trait]
impl VoteService for InMemoryPlanningStore {
    async fn save_vote(&self, vote: &Vote) -> Result<VoteId, DomainError> {
        self.check_available()?;
        let mut state = self.state.write().await;

        if !state.sessions.contains_key(&vote.session_id) {
            return Err(DomainError::session_not_found(vote.session_id));
        }

        let key = (vote.session_id, vote.user_id);
        let id = match state.votes.entry(key) {
            Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                existing.value = vote.value.clone();
                existing.updated_at = Some(Timestamp::now());
                existing.id
            }
            Entry::Vacant(entry) => {
                entry.insert(vote.clone());
                vote.id
            }
        };
        Ok(id)
    }

    async fn delete_votes_in_session(&self, session_id: &SessionId) -> Result<(), DomainError> {
        self.check_available()?;
        self.state
            .write()
            .await
            .votes
            .retain(|(sid, _), _| sid != session_id);
        Ok(())
    }
}

#[async_trait]
impl UserService for InMemoryPlanningStore {
    async fn get_user(&self, user_id: &UserId) -> Result<User, DomainError> {
        self.check_available()?;
        self.state
            .read()
            .await
            .users
            .get(user_id)
            .cloned()
            .ok_or_else(|| DomainError::user_not_found(user_id))
    }
}
