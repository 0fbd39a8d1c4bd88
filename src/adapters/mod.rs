//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `memory` - In-memory session/vote/user store (tests, single-node runs)
//! - `websocket` - Real-time transport, session registry and event handlers

pub mod memory;
pub mod websocket;

pub use memory::InMemoryPlanningStore;
pub use websocket::{websocket_router, EventDispatcher, SessionRegistry, WebSocketState};
