//! WebSocket adapter: the real-time core of the planning poker server.
//!
//! Connected clients send events (join, vote, reveal, ...) over one stream
//! each. Every event mutates session state through the ports and then fans
//! the refreshed session snapshot out to everyone in the same session.
//!
//! # Architecture
//!
//! ```text
//!  client stream ──▶ lifecycle (read loop) ──▶ EventDispatcher ──▶ handler
//!                                                                     │
//!         ┌───────────────────── ports (session/vote/user) ◀──────────┤
//!         │                                                           ▼
//!         └─▶ canonical snapshot ──▶ SessionRegistry::broadcast ──▶ every
//!                                    Room: session-123               connection
//!                                    ├── conn-a                      in the room
//!                                    └── conn-b
//! ```
//!
//! # Components
//!
//! - [`messages`] - Wire envelope and payload types
//! - [`connection`] - One live stream: bounded outbound queue, state, cancellation
//! - [`rooms`] - Session registry and fan-out
//! - [`handlers`] - One handler per inbound event kind
//! - [`dispatcher`] - Decoding, routing and error replies
//! - [`lifecycle`] - Read loop, writer and heartbeat per connection
//! - [`origin`] - Upgrade origin policy
//! - [`handler`] - Axum upgrade and health endpoints

pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod handlers;
pub mod lifecycle;
pub mod messages;
pub mod origin;
pub mod rooms;

pub use connection::{Binding, Connection, ConnectionId, ConnectionState, Frame};
pub use dispatcher::EventDispatcher;
pub use error::{ProtocolError, TransportError, WsError};
pub use handler::{websocket_router, ws_handler, WebSocketState};
pub use handlers::HandlerContext;
pub use lifecycle::{run_connection, InboundFrame, LifecycleSettings};
pub use messages::{EventKind, InboundEvent, OutboundEvent, OutboundMessage};
pub use origin::OriginPolicy;
pub use rooms::SessionRegistry;
