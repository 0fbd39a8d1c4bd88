//! WebSocket upgrade handler and operational endpoints.
//!
//! Handles the HTTP → WebSocket upgrade and hands the stream to the
//! connection lifecycle:
//! 1. Check the `Origin` header against the configured policy
//! 2. Upgrade with the configured message size limit
//! 3. Run read loop, writer and heartbeat until the stream ends

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures::{future, SinkExt, StreamExt};
use http::{header, HeaderMap, StatusCode};
use serde::Serialize;

use super::{
    connection::{Connection, Frame},
    dispatcher::EventDispatcher,
    lifecycle::{run_connection, InboundFrame, LifecycleSettings},
    origin::OriginPolicy,
    rooms::SessionRegistry,
};

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct WebSocketState {
    pub dispatcher: Arc<EventDispatcher>,
    pub origins: Arc<OriginPolicy>,
    pub settings: LifecycleSettings,
    /// Outbound frames queued per connection
    pub outbound_buffer: usize,
    /// Largest accepted inbound message in bytes
    pub max_message_size: usize,
}

impl WebSocketState {
    pub fn new(dispatcher: Arc<EventDispatcher>, origins: OriginPolicy) -> Self {
        Self {
            dispatcher,
            origins: Arc::new(origins),
            settings: LifecycleSettings::default(),
            outbound_buffer: 64,
            max_message_size: 1024 * 1024,
        }
    }

    pub fn with_settings(mut self, settings: LifecycleSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_limits(mut self, outbound_buffer: usize, max_message_size: usize) -> Self {
        self.outbound_buffer = outbound_buffer;
        self.max_message_size = max_message_size;
        self
    }

    fn registry(&self) -> &Arc<SessionRegistry> {
        &self.dispatcher.context().registry
    }
}

/// Handle WebSocket upgrade requests.
///
/// Route: `GET /ws`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<WebSocketState>,
) -> Response {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok());

    if !state.origins.allows(origin) {
        tracing::warn!(origin = origin.unwrap_or_default(), "Rejected upgrade from disallowed origin");
        return (StatusCode::FORBIDDEN, "Origin not allowed").into_response();
    }

    ws.max_message_size(state.max_message_size)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

/// Runs an established WebSocket connection to completion.
async fn handle_socket(socket: WebSocket, state: WebSocketState) {
    let (sender, receiver) = socket.split();
    let (conn, outbound) = Connection::new(state.outbound_buffer);

    let sink = sender.with(|frame: Frame| future::ready(Ok::<_, axum::Error>(to_message(frame))));
    let stream = receiver.map(|result| result.map(from_message));

    run_connection(
        state.dispatcher,
        Arc::new(conn),
        outbound,
        stream,
        sink,
        state.settings,
    )
    .await;
}

fn to_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text),
        Frame::Ping => Message::Ping(Vec::new()),
        Frame::Close => Message::Close(None),
    }
}

fn from_message(message: Message) -> InboundFrame {
    match message {
        Message::Text(text) => InboundFrame::Text(text),
        Message::Binary(_) => InboundFrame::Binary,
        Message::Ping(_) => InboundFrame::Ping,
        Message::Pong(_) => InboundFrame::Pong,
        Message::Close(_) => InboundFrame::Close,
    }
}

/// Real-time health snapshot.
#[derive(Debug, Serialize)]
pub struct WsHealth {
    pub status: &'static str,
    pub active_sessions: usize,
    pub total_connections: usize,
}

/// Route: `GET /health/ws`
pub async fn ws_health(State(state): State<WebSocketState>) -> Json<WsHealth> {
    let registry = state.registry();
    Json(WsHealth {
        status: "healthy",
        active_sessions: registry.count().await,
        total_connections: registry.connection_count().await,
    })
}

/// Route: `GET /health`
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Create axum router for the WebSocket and health endpoints.
///
/// # Example
///
/// ```ignore
/// let app = websocket_router().with_state(ws_state);
/// ```
pub fn websocket_router() -> Router<WebSocketState> {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health/ws", get(ws_health))
        .route("/health", get(health))
}
