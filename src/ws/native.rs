//! Native WebSocket client — `tokio-tungstenite`.
//!
//! - Background tokio task for connection management
//! - Fixed-delay reconnection (one attempt scheduled per loss, no cap)
//! - Stream-based event delivery to consumer

use std::pin::Pin;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream, Stream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::WsError;
use crate::ws::{decode_frame, ConnectionState, WsConfig, WsEvent};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

// ─── Disconnect reasons ──────────────────────────────────────────────────────

enum DisconnectReason {
    UserRequested,
    Lost,
}

// ─── Background task state ───────────────────────────────────────────────────

struct TaskState {
    config: WsConfig,
    event_tx: mpsc::Sender<WsEvent>,
    shutdown_rx: oneshot::Receiver<()>,
    state: Arc<AtomicU16>,
}

impl TaskState {
    /// Deliver an event, waiting for channel capacity. Events are never
    /// dropped while a receiver exists.
    async fn emit(&self, event: WsEvent) {
        if self.event_tx.send(event).await.is_err() {
            tracing::debug!("WS event receiver dropped");
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.store(state as u16, Ordering::SeqCst);
    }
}

// ─── Public WsClient ─────────────────────────────────────────────────────────

/// Native WebSocket client using `tokio-tungstenite`.
///
/// Uses a background tokio task for connection management.
/// Events are delivered through an mpsc channel exposed as a `Stream`.
pub struct WsClient {
    config: WsConfig,
    shutdown_tx: Option<oneshot::Sender<()>>,
    event_rx: tokio::sync::Mutex<mpsc::Receiver<WsEvent>>,
    event_tx: mpsc::Sender<WsEvent>,
    task_handle: Option<JoinHandle<()>>,
    state: Arc<AtomicU16>,
}

impl WsClient {
    /// Create a new WS client. Does not connect yet.
    pub fn new(config: WsConfig) -> Self {
        let (event_tx, event_rx) = mpsc::channel(256);
        Self {
            config,
            shutdown_tx: None,
            event_rx: tokio::sync::Mutex::new(event_rx),
            event_tx,
            task_handle: None,
            state: Arc::new(AtomicU16::new(ConnectionState::Closed as u16)),
        }
    }

    pub fn config(&self) -> &WsConfig {
        &self.config
    }

    /// Connect to the feed.
    ///
    /// Spawns a background tokio task that owns the socket and reconnects
    /// after every loss until `disconnect()` is called.
    pub async fn connect(&mut self) -> Result<(), WsError> {
        if self.task_handle.as_ref().is_some_and(JoinHandle::is_finished) {
            // The task stopped on its own (reconnect disabled).
            self.task_handle = None;
            self.shutdown_tx = None;
        }
        if self.shutdown_tx.is_some() {
            return Ok(());
        }
        if self.config.url.is_empty() {
            return Err(WsError::ConnectionFailed("empty feed URL".into()));
        }

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        self.shutdown_tx = Some(shutdown_tx);
        self.state
            .store(ConnectionState::Connecting as u16, Ordering::SeqCst);

        let state = TaskState {
            config: self.config.clone(),
            event_tx: self.event_tx.clone(),
            shutdown_rx,
            state: Arc::clone(&self.state),
        };

        self.task_handle = Some(tokio::spawn(run_task(state)));
        Ok(())
    }

    /// Close the feed and stop reconnecting.
    pub async fn disconnect(&mut self) -> Result<(), WsError> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(mut handle) = self.task_handle.take() {
            if tokio::time::timeout(Duration::from_secs(5), &mut handle)
                .await
                .is_err()
            {
                tracing::warn!("WS task did not stop within 5s, aborting");
                handle.abort();
            }
        }

        self.state
            .store(ConnectionState::Closed as u16, Ordering::SeqCst);
        Ok(())
    }

    /// Whether the feed is currently open.
    pub fn is_connected(&self) -> bool {
        self.connection_state().is_open()
    }

    pub fn connection_state(&self) -> ConnectionState {
        ConnectionState::from(self.state.load(Ordering::SeqCst))
    }

    /// Force a fresh connection attempt, skipping any pending delay.
    pub async fn restart_connection(&mut self) {
        if self.connection_state() == ConnectionState::Connecting && self.shutdown_tx.is_some() {
            tracing::info!("Already connecting, skipping restart");
            return;
        }

        tracing::info!("Manual reconnection requested");
        self.disconnect().await.ok();
        if let Err(e) = self.connect().await {
            tracing::warn!("Restart failed: {}", e);
        }
    }

    /// Get a stream of events from the feed.
    ///
    /// The returned stream borrows `self`, so it must be dropped
    /// before calling `disconnect()`.
    pub fn events(&self) -> Pin<Box<dyn Stream<Item = WsEvent> + Send + '_>> {
        Box::pin(futures_util::stream::unfold(
            &self.event_rx,
            |rx| async move {
                let mut guard = rx.lock().await;
                guard.recv().await.map(|event| (event, rx))
            },
        ))
    }

    /// Receive the next event. `None` once the client is dropped.
    pub async fn next_event(&self) -> Option<WsEvent> {
        self.event_rx.lock().await.recv().await
    }
}

impl Drop for WsClient {
    fn drop(&mut self) {
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
    }
}

// ─── Background task ─────────────────────────────────────────────────────────

async fn run_task(mut state: TaskState) {
    let delay = state.config.reconnect_delay();
    loop {
        state.set_state(ConnectionState::Connecting);

        // ── 1. Attempt connection ────────────────────────────────────────
        let connected = tokio::select! {
            result = attempt_connect(&state.config.url) => result,
            _ = &mut state.shutdown_rx => {
                state.set_state(ConnectionState::Closed);
                return;
            }
        };

        let reason = match connected {
            Ok((sink, stream)) => {
                // ── 2. Connected ─────────────────────────────────────────
                state.set_state(ConnectionState::Open);
                tracing::info!(url = %state.config.url, "Quote feed connected");
                state.emit(WsEvent::Connected).await;

                run_connected(&mut state, sink, stream).await
            }
            Err(e) => {
                tracing::error!("WebSocket connection failed: {}", e);
                state
                    .emit(WsEvent::Error(format!("Connection failed: {}", e)))
                    .await;
                state
                    .emit(WsEvent::Disconnected {
                        code: None,
                        reason: e,
                    })
                    .await;
                DisconnectReason::Lost
            }
        };

        // ── 3. Post-disconnect decision ──────────────────────────────────
        state.set_state(ConnectionState::Closed);

        if matches!(reason, DisconnectReason::UserRequested) || !state.config.reconnect {
            return;
        }

        tracing::info!("Reconnecting to quote feed in {}ms", delay.as_millis());
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = &mut state.shutdown_rx => return,
        }
    }
}

/// The inner connected loop — runs until the connection breaks.
async fn run_connected(
    state: &mut TaskState,
    mut sink: SplitSink<WsStream, Message>,
    mut stream: SplitStream<WsStream>,
) -> DisconnectReason {
    let reason = loop {
        tokio::select! {
            // ── a) Incoming WS message ───────────────────────────────────
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let text_str: &str = text.as_ref();
                        match decode_frame(text_str) {
                            Ok(update) => state.emit(WsEvent::Message(update)).await,
                            Err(e) => {
                                tracing::warn!(
                                    raw = text_str,
                                    "Dropping undecodable quote frame: {}",
                                    e
                                );
                                state.emit(WsEvent::Error(e.to_string())).await;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = sink.send(Message::Pong(data)).await {
                            tracing::debug!("Pong failed: {}", e);
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = extract_close(frame.as_ref());
                        tracing::info!(code, %reason, "Quote feed closed by server");
                        state
                            .emit(WsEvent::Disconnected {
                                code: Some(code),
                                reason,
                            })
                            .await;
                        break DisconnectReason::Lost;
                    }
                    Some(Ok(_)) => {} // Binary, Pong, Frame — ignore
                    Some(Err(e)) => {
                        let reason = e.to_string();
                        tracing::error!("WebSocket error: {}", reason);
                        state
                            .emit(WsEvent::Disconnected {
                                code: None,
                                reason,
                            })
                            .await;
                        break DisconnectReason::Lost;
                    }
                    None => {
                        state
                            .emit(WsEvent::Disconnected {
                                code: None,
                                reason: "Stream ended".into(),
                            })
                            .await;
                        break DisconnectReason::Lost;
                    }
                }
            }

            // ── b) Shutdown from the public API ──────────────────────────
            _ = &mut state.shutdown_rx => {
                let _ = sink.send(Message::Close(Some(CloseFrame {
                    code: CloseCode::Normal,
                    reason: "Client disconnect".into(),
                }))).await;
                break DisconnectReason::UserRequested;
            }
        }
    };

    // Release the old connection before any new one is opened.
    let _ = sink.close().await;
    drop(stream);
    reason
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Attempt to establish a WebSocket connection with a 30-second timeout.
async fn attempt_connect(
    url: &str,
) -> Result<(SplitSink<WsStream, Message>, SplitStream<WsStream>), String> {
    let (ws_stream, _) = tokio::time::timeout(CONNECT_TIMEOUT, connect_async(url))
        .await
        .map_err(|_| "Connection timeout".to_string())?
        .map_err(|e| e.to_string())?;

    Ok(ws_stream.split())
}

/// Extract close code and reason from an optional CloseFrame.
fn extract_close(frame: Option<&CloseFrame>) -> (u16, String) {
    match frame {
        Some(f) => (f.code.into(), f.reason.to_string()),
        None => (1006, "No close frame".into()),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
