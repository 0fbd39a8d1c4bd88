//! Domain layer - planning poker vocabulary and pure rules.
//!
//! Nothing in here performs I/O. Snapshot masking and most-common-vote
//! resolution live here so every state adapter produces identical views.

pub mod foundation;
pub mod session;
