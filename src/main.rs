//! Planning Poker server binary
//!
//! Loads configuration from the environment, seeds the in-memory store if a
//! seed file is configured, and serves the WebSocket endpoint until Ctrl+C.

use std::sync::Arc;

use anyhow::Context;
use http::HeaderValue;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use planning_poker::adapters::memory::{InMemoryPlanningStore, SeedData};
use planning_poker::adapters::websocket::{
    websocket_router, EventDispatcher, HandlerContext, LifecycleSettings, OriginPolicy,
    SessionRegistry, WebSocketState,
};
use planning_poker::config::{AppConfig, LogFormat, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    init_tracing(&config.server);

    tracing::info!(
        environment = ?config.server.environment,
        "Starting planning poker server"
    );

    // Session state
    let store = Arc::new(InMemoryPlanningStore::new());
    if let Some(path) = &config.store.seed_file {
        SeedData::from_file(path)
            .with_context(|| format!("Failed to read seed file {}", path.display()))?
            .apply(&store)
            .await
            .context("Failed to apply seed data")?;
        tracing::info!(
            seed_file = %path.display(),
            sessions = store.session_count().await,
            "Session store seeded"
        );
    }

    // Real-time core
    let registry = Arc::new(SessionRegistry::new(
        config.websocket.max_connections_per_session,
    ));
    let ctx = Arc::new(HandlerContext::new(
        registry,
        store.clone(),
        store.clone(),
        store,
    ));
    let dispatcher = Arc::new(EventDispatcher::new(ctx));

    let origins = OriginPolicy::new(
        config.server.is_development(),
        config.websocket.allowed_origins_list(),
    );
    let ws_state = WebSocketState::new(dispatcher, origins.clone())
        .with_settings(LifecycleSettings {
            ping_interval: config.websocket.ping_interval(),
            pong_timeout: config.websocket.pong_timeout(),
            write_timeout: config.websocket.write_timeout(),
        })
        .with_limits(
            config.websocket.outbound_buffer,
            config.websocket.max_message_size,
        );

    let app = websocket_router()
        .with_state(ws_state)
        .layer(TimeoutLayer::new(std::time::Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(cors_layer(origins))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(address = %addr, "Listening (ws: /ws, health: /health, /health/ws)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Installs the global subscriber. `RUST_LOG` overrides the configured filter.
fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&server.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    match server.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// CORS for the plain HTTP endpoints, sharing the upgrade origin policy.
fn cors_layer(origins: OriginPolicy) -> CorsLayer {
    CorsLayer::new().allow_origin(AllowOrigin::predicate(
        move |origin: &HeaderValue, _parts| {
            origin
                .to_str()
                .map(|origin| origins.allows(Some(origin)))
                .unwrap_or(false)
        },
    ))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
