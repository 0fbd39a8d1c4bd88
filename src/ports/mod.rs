//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the real-time layer and the collaborators that own durable state.
//! Adapters implement these ports.
//!
//! - `SessionService` - sessions, connected users, reveal flags
//! - `VoteService` - votes keyed per (session, user)
//! - `UserService` - user lookups

mod session_service;
mod user_service;
mod vote_service;

pub use session_service::SessionService;
pub use user_service::UserService;
pub use vote_service::VoteService;
