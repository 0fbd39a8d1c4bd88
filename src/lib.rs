//! Planning Poker - real-time estimation session server
//!
//! Participants hold one WebSocket stream each into a shared session. Every
//! action (join, vote, reveal, reset, kick, auto-reveal toggle) is applied to
//! session state and the refreshed snapshot is fanned out to everyone else
//! connected to that session.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
