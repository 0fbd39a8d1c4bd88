//! Per-connection lifecycle: read loop, writer and heartbeat.
//!
//! Three tasks share one cancellation signal:
//!
//! ```text
//!            ┌──────────────┐  decode + dispatch
//! stream ──▶ │  read loop   │ ─────────────────▶ EventDispatcher
//!            └──────────────┘
//!            ┌──────────────┐  drains outbound queue
//! sink   ◀── │    writer    │ ◀───────────────── Connection::send
//!            └──────────────┘
//!            ┌──────────────┐  ping every interval,
//!            │  heartbeat   │  cancel when idle too long
//!            └──────────────┘
//! ```
//!
//! Whichever side stops first flips the signal; [`run_connection`] returns
//! only after all three are done, so no timer outlives its stream.

use futures::{Sink, SinkExt, Stream, StreamExt};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, timeout, Instant};

use super::connection::{Connection, Frame};
use super::dispatcher::EventDispatcher;
use super::error::{ProtocolError, TransportError, WsError};

/// Transport-neutral view of one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    Text(String),
    Binary,
    Ping,
    Pong,
    Close,
}

/// Keep-alive and write limits for one connection.
#[derive(Debug, Clone, Copy)]
pub struct LifecycleSettings {
    /// Zero disables the heartbeat entirely.
    pub ping_interval: Duration,
    /// `None` disables the idle check.
    pub pong_timeout: Option<Duration>,
    pub write_timeout: Duration,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(30),
            pong_timeout: Some(Duration::from_secs(60)),
            write_timeout: Duration::from_secs(10),
        }
    }
}

/// Drives one connection from upgrade to close.
pub async fn run_connection<S, E, W>(
    dispatcher: Arc<EventDispatcher>,
    conn: Arc<Connection>,
    outbound: mpsc::Receiver<Frame>,
    stream: S,
    sink: W,
    settings: LifecycleSettings,
) where
    S: Stream<Item = Result<InboundFrame, E>> + Unpin,
    E: fmt::Display,
    W: Sink<Frame> + Unpin + Send + 'static,
    W::Error: fmt::Display,
{
    tracing::info!(connection_id = %conn.id(), "Connection opened");

    let writer = tokio::spawn(write_loop(
        Arc::clone(&conn),
        outbound,
        sink,
        settings.write_timeout,
    ));
    let heartbeat = tokio::spawn(heartbeat_loop(Arc::clone(&conn), settings));

    read_loop(&dispatcher, &conn, stream).await;

    conn.close();
    dispatcher.disconnect(&conn).await;

    for (task, result) in [("heartbeat", heartbeat.await), ("writer", writer.await)] {
        if let Err(err) = result {
            tracing::warn!(connection_id = %conn.id(), task, error = %err, "Connection task failed");
        }
    }
    conn.mark_closed().await;

    tracing::info!(connection_id = %conn.id(), "Connection closed");
}

async fn read_loop<S, E>(dispatcher: &EventDispatcher, conn: &Arc<Connection>, mut stream: S)
where
    S: Stream<Item = Result<InboundFrame, E>> + Unpin,
    E: fmt::Display,
{
    let mut cancelled = conn.cancelled();

    loop {
        let next = tokio::select! {
            _ = wait_cancelled(&mut cancelled) => break,
            next = stream.next() => next,
        };
        let Some(result) = next else {
            break;
        };

        conn.touch().await;

        match result {
            Ok(InboundFrame::Text(text)) => dispatcher.handle_text(conn, &text).await,
            Ok(InboundFrame::Binary) => {
                dispatcher.reply_error(conn, None, &WsError::from(ProtocolError::UnsupportedFrame));
            }
            Ok(InboundFrame::Ping | InboundFrame::Pong) => {}
            Ok(InboundFrame::Close) => {
                tracing::debug!(connection_id = %conn.id(), "Client sent close frame");
                break;
            }
            Err(err) => {
                tracing::debug!(connection_id = %conn.id(), error = %err, "Receive error");
                break;
            }
        }
    }
}

async fn write_loop<W>(
    conn: Arc<Connection>,
    mut outbound: mpsc::Receiver<Frame>,
    mut sink: W,
    write_timeout: Duration,
) where
    W: Sink<Frame> + Unpin,
    W::Error: fmt::Display,
{
    let mut cancelled = conn.cancelled();

    loop {
        tokio::select! {
            _ = wait_cancelled(&mut cancelled) => break,
            frame = outbound.recv() => {
                let Some(frame) = frame else { break };
                if let Err(err) = write(&mut sink, frame, write_timeout).await {
                    tracing::debug!(connection_id = %conn.id(), error = %err, "Send error, closing connection");
                    conn.close();
                    return;
                }
            }
        }
    }

    // Flush what was queued before the close (e.g. a kick notice)
    while let Ok(frame) = outbound.try_recv() {
        if write(&mut sink, frame, write_timeout).await.is_err() {
            return;
        }
    }
    let _ = write(&mut sink, Frame::Close, write_timeout).await;
}

async fn write<W>(sink: &mut W, frame: Frame, limit: Duration) -> Result<(), TransportError>
where
    W: Sink<Frame> + Unpin,
    W::Error: fmt::Display,
{
    match timeout(limit, sink.send(frame)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => {
            tracing::trace!(error = %err, "Sink rejected frame");
            Err(TransportError::Closed)
        }
        Err(_) => Err(TransportError::Backpressure),
    }
}

/// Resolves once the connection's cancellation signal is set.
async fn wait_cancelled(cancelled: &mut watch::Receiver<bool>) {
    let _ = cancelled.wait_for(|stop| *stop).await;
}

async fn heartbeat_loop(conn: Arc<Connection>, settings: LifecycleSettings) {
    if settings.ping_interval.is_zero() {
        tracing::debug!(connection_id = %conn.id(), "Heartbeat disabled");
        return;
    }
    let mut cancelled = conn.cancelled();
    let mut ticker = interval_at(Instant::now() + settings.ping_interval, settings.ping_interval);

    loop {
        tokio::select! {
            _ = wait_cancelled(&mut cancelled) => break,
            _ = ticker.tick() => {
                if let Some(limit) = settings.pong_timeout {
                    let idle = conn.last_activity().await.elapsed().to_std().unwrap_or_default();
                    if idle > limit {
                        tracing::info!(
                            connection_id = %conn.id(),
                            idle_secs = idle.as_secs(),
                            "Connection idle past timeout, closing"
                        );
                        conn.close();
                        break;
                    }
                }

                match conn.send_frame(Frame::Ping) {
                    Ok(()) => {}
                    Err(TransportError::Closed) => {
                        conn.close();
                        break;
                    }
                    Err(err) => {
                        tracing::debug!(connection_id = %conn.id(), error = %err, "Ping not queued");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::websocket::handlers::test_support::Fixture;
    use futures::channel::mpsc as fmpsc;
    use serde_json::json;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    /// Sink that never accepts a frame.
    struct StalledSink;

    impl Sink<Frame> for StalledSink {
        type Error = String;

        fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), String>> {
            Poll::Pending
        }

        fn start_send(self: Pin<&mut Self>, _item: Frame) -> Result<(), String> {
            Ok(())
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), String>> {
            Poll::Ready(Ok(()))
        }

        fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), String>> {
            Poll::Ready(Ok(()))
        }
    }

    struct Harness {
        inbound: fmpsc::UnboundedSender<Result<InboundFrame, String>>,
        written: fmpsc::UnboundedReceiver<Frame>,
        task: tokio::task::JoinHandle<()>,
        conn: Arc<Connection>,
    }

    fn start(fx: &Fixture, settings: LifecycleSettings) -> Harness {
        let dispatcher = Arc::new(EventDispatcher::new(fx.ctx.clone()));
        let (conn, outbound) = Connection::new(16);
        let conn = Arc::new(conn);
        let (inbound, stream) = fmpsc::unbounded();
        let (sink, written) = fmpsc::unbounded();

        let task = tokio::spawn(run_connection(
            dispatcher,
            Arc::clone(&conn),
            outbound,
            stream,
            sink,
            settings,
        ));
        Harness {
            inbound,
            written,
            task,
            conn,
        }
    }

    fn texts(written: &mut fmpsc::UnboundedReceiver<Frame>) -> Vec<serde_json::Value> {
        let mut out = Vec::new();
        while let Ok(Some(frame)) = written.try_next() {
            if let Frame::Text(text) = frame {
                out.push(serde_json::from_str(&text).unwrap());
            }
        }
        out
    }

    #[tokio::test]
    async fn join_then_stream_end_marks_user_offline() {
        let fx = Fixture::new().await;
        let ada = fx.user("Ada").await;
        let mut h = start(&fx, LifecycleSettings::default());

        let join = json!({
            "event": "join_session",
            "session_id": fx.session.id,
            "user_id": ada.id,
            "user_name": "Ada",
            "is_watcher": false
        });
        h.inbound
            .unbounded_send(Ok(InboundFrame::Text(join.to_string())))
            .unwrap();
        h.inbound.unbounded_send(Ok(InboundFrame::Close)).unwrap();
        h.task.await.unwrap();

        let frames = texts(&mut h.written);
        assert_eq!(frames[0]["event"], "join_session");
        assert_eq!(fx.store.disconnect_calls(), 1);
        assert_eq!(fx.ctx.registry.connection_count().await, 0);
        assert!(h.conn.is_cancelled());
    }

    #[tokio::test]
    async fn never_joined_close_has_no_session_cleanup() {
        let fx = Fixture::new().await;
        let h = start(&fx, LifecycleSettings::default());

        drop(h.inbound);
        h.task.await.unwrap();

        assert_eq!(fx.store.disconnect_calls(), 0);
    }

    #[tokio::test]
    async fn binary_frame_is_answered_and_loop_continues() {
        let fx = Fixture::new().await;
        let mut h = start(&fx, LifecycleSettings::default());

        h.inbound.unbounded_send(Ok(InboundFrame::Binary)).unwrap();
        h.inbound
            .unbounded_send(Ok(InboundFrame::Text("{\"event\":\"nope\"}".into())))
            .unwrap();
        h.inbound.unbounded_send(Ok(InboundFrame::Close)).unwrap();
        h.task.await.unwrap();

        let frames = texts(&mut h.written);
        assert_eq!(frames.len(), 2);
        assert!(frames.iter().all(|f| f["event"] == "error"));
    }

    #[tokio::test]
    async fn writer_ends_with_close_frame() {
        let fx = Fixture::new().await;
        let mut h = start(&fx, LifecycleSettings::default());

        h.inbound.unbounded_send(Ok(InboundFrame::Close)).unwrap();
        h.task.await.unwrap();

        let mut last = None;
        while let Ok(Some(frame)) = h.written.try_next() {
            last = Some(frame);
        }
        assert_eq!(last, Some(Frame::Close));
    }

    #[tokio::test]
    async fn idle_connection_is_pinged_then_closed() {
        let fx = Fixture::new().await;
        let settings = LifecycleSettings {
            ping_interval: Duration::from_millis(20),
            pong_timeout: Some(Duration::from_millis(70)),
            write_timeout: Duration::from_secs(1),
        };
        let mut h = start(&fx, settings);

        tokio::time::timeout(Duration::from_secs(5), &mut h.task)
            .await
            .expect("idle connection should be closed")
            .unwrap();

        let mut pings = 0;
        while let Ok(Some(frame)) = h.written.try_next() {
            if frame == Frame::Ping {
                pings += 1;
            }
        }
        assert!(pings >= 1);
        assert!(h.conn.is_cancelled());
        drop(h.inbound);
    }

    #[tokio::test]
    async fn forced_close_stops_every_task() {
        let fx = Fixture::new().await;
        let h = start(&fx, LifecycleSettings::default());

        h.conn.close();

        tokio::time::timeout(Duration::from_secs(5), h.task)
            .await
            .expect("close should end the connection")
            .unwrap();
        drop(h.inbound);
    }

    #[tokio::test]
    async fn stalled_sink_closes_connection() {
        let fx = Fixture::new().await;
        let dispatcher = Arc::new(EventDispatcher::new(fx.ctx.clone()));
        let (conn, outbound) = Connection::new(16);
        let conn = Arc::new(conn);
        let (inbound, stream) = fmpsc::unbounded::<Result<InboundFrame, String>>();
        let settings = LifecycleSettings {
            write_timeout: Duration::from_millis(50),
            ..LifecycleSettings::default()
        };

        let task = tokio::spawn(run_connection(
            dispatcher,
            Arc::clone(&conn),
            outbound,
            stream,
            StalledSink,
            settings,
        ));
        // Any reply gives the writer something to block on
        inbound.unbounded_send(Ok(InboundFrame::Binary)).unwrap();

        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("stalled write should end the connection")
            .unwrap();
        assert!(conn.is_cancelled());
        drop(inbound);
    }

    #[tokio::test]
    async fn zero_ping_interval_disables_heartbeat() {
        let fx = Fixture::new().await;
        let settings = LifecycleSettings {
            ping_interval: Duration::ZERO,
            pong_timeout: Some(Duration::from_millis(10)),
            write_timeout: Duration::from_secs(1),
        };
        let mut h = start(&fx, settings);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!h.conn.is_cancelled());

        h.inbound.unbounded_send(Ok(InboundFrame::Close)).unwrap();
        h.task.await.unwrap();

        while let Ok(Some(frame)) = h.written.try_next() {
            assert_ne!(frame, Frame::Ping);
        }
    }
}
