//! YAML fixtures for the in-memory store.
//!
//! ```yaml
//! users:
//!   - id: 0b6c6e0a-4c1e-4b8e-9a51-0f3f3bb0a001
//!     name: Ada
//! sessions:
//!   - id: 5f0c3c1e-7d1a-4a5e-8a43-2b1f0f7c9001
//!     name: Sprint 12 refinement
//!     deck_type: fibonacci
//!     creator_id: 0b6c6e0a-4c1e-4b8e-9a51-0f3f3bb0a001
//! ```

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::domain::foundation::{SessionId, Timestamp, UserId};
use crate::domain::session::{DeckType, Session, User};

use super::InMemoryPlanningStore;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid seed file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Session '{session}' references unknown creator {creator}")]
    UnknownCreator { session: String, creator: UserId },
}

#[derive(Debug, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub sessions: Vec<SeedSession>,
}

#[derive(Debug, Deserialize)]
pub struct SeedSession {
    pub id: SessionId,
    pub name: String,
    #[serde(default)]
    pub deck_type: DeckType,
    pub creator_id: UserId,
    #[serde(default)]
    pub auto_reveal: bool,
    #[serde(default = "default_allow_emoji")]
    pub allow_emoji: bool,
}

fn default_allow_emoji() -> bool {
    true
}

impl SeedData {
    pub fn from_yaml(raw: &str) -> Result<Self, SeedError> {
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml(&raw)
    }

    /// Loads users first, then sessions, resolving creator names.
    pub async fn apply(self, store: &InMemoryPlanningStore) -> Result<(), SeedError> {
        for user in &self.users {
            store.insert_user(user.clone()).await;
        }

        for seed in self.sessions {
            let creator = self
                .users
                .iter()
                .find(|u| u.id == seed.creator_id)
                .ok_or_else(|| SeedError::UnknownCreator {
                    session: seed.name.clone(),
                    creator: seed.creator_id,
                })?;

            store
                .insert_session(Session {
                    id: seed.id,
                    name: seed.name,
                    deck_type: seed.deck_type,
                    cards_revealed: false,
                    creator_id: seed.creator_id,
                    creator_name: creator.name.clone(),
                    allow_emoji: seed.allow_emoji,
                    auto_reveal: seed.auto_reveal,
                    created_via: "seed".to_string(),
                    created_at: Timestamp::now(),
                    updated_at: None,
                })
                .await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::SessionService;
    use std::io::Write;

    const SEED: &str = r#"
users:
  - id: 0b6c6e0a-4c1e-4b8e-9a51-0f3f3bb0a001
    name: Ada
  - id: 0b6c6e0a-4c1e-4b8e-9a51-0f3f3bb0a002
    name: Eve
    is_watcher: true
sessions:
  - id: 5f0c3c1e-7d1a-4a5e-8a43-2b1f0f7c9001
    name: Sprint 12 refinement
    deck_type: tshirt
    creator_id: 0b6c6e0a-4c1e-4b8e-9a51-0f3f3bb0a001
"#;

    #[tokio::test]
    async fn seed_file_populates_store() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SEED.as_bytes()).unwrap();

        let store = InMemoryPlanningStore::new();
        SeedData::from_file(file.path()).unwrap().apply(&store).await.unwrap();

        let session_id: SessionId = "5f0c3c1e-7d1a-4a5e-8a43-2b1f0f7c9001".parse().unwrap();
        let view = store.get_session_by_id(&session_id).await.unwrap();
        assert_eq!(view.creator_name, "Ada");
        assert_eq!(view.deck_type, DeckType::TShirt);
        assert_eq!(view.deck_values.len(), 6);
    }

    #[tokio::test]
    async fn unknown_creator_is_rejected() {
        let raw = r#"
sessions:
  - id: 5f0c3c1e-7d1a-4a5e-8a43-2b1f0f7c9001
    name: Orphan
    creator_id: 0b6c6e0a-4c1e-4b8e-9a51-0f3f3bb0a009
"#;
        let store = InMemoryPlanningStore::new();
        let err = SeedData::from_yaml(raw).unwrap().apply(&store).await.unwrap_err();
        assert!(matches!(err, SeedError::UnknownCreator { .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = SeedData::from_file("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, SeedError::Io(_)));
    }
}
