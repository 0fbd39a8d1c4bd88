//! Session module - planning poker sessions, decks, votes and snapshots.

mod consensus;
mod deck;
mod records;
mod view;

pub use consensus::most_common_vote;
pub use deck::DeckType;
pub use records::{Session, User, Vote};
pub use view::{SessionUser, SessionView};

/// Placeholder shown for every cast vote until cards are revealed.
pub const HIDDEN_VOTE: &str = "hidden";
