//! WebSocket layer — the single live quote feed.
//!
//! The actual WS transport is compile-time dispatched:
//! - `ws-native` feature → `tokio-tungstenite` (native.rs)
//! - `ws-wasm` feature → `web-sys::WebSocket` (wasm.rs)
//!
//! Both export a `WsClient` with the same lifecycle (connect, fixed-delay
//! reconnect, disconnect). This module defines the shared event/config types.
//!
//! The feed is push-only: the client never writes application frames.
//! Which instruments the backend pushes is controlled over HTTP
//! (`Subscriptions::register`).

#[cfg(feature = "ws-native")]
pub mod native;

#[cfg(feature = "ws-wasm")]
pub mod wasm;

use std::time::Duration;

use crate::domain::quote::QuoteUpdate;
use crate::error::WsError;

// ─── ConnectionState ─────────────────────────────────────────────────────────

/// Lifecycle of the feed connection.
///
/// Stored as a `u16` inside the clients so it can live in an atomic / a
/// thread-local cell. `2` (closing) and `3` (closed) both map to `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u16)]
pub enum ConnectionState {
    Connecting = 0,
    Open = 1,
    #[default]
    Closed = 3,
}

impl From<u16> for ConnectionState {
    fn from(value: u16) -> Self {
        match value {
            0 => ConnectionState::Connecting,
            1 => ConnectionState::Open,
            _ => ConnectionState::Closed,
        }
    }
}

impl ConnectionState {
    pub fn is_open(self) -> bool {
        self == ConnectionState::Open
    }
}

// ─── WsEvent ─────────────────────────────────────────────────────────────────

/// High-level events emitted by the WS client to the consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum WsEvent {
    /// Connection established.
    Connected,
    /// Connection lost. A reconnect is scheduled unless the client was
    /// disconnected explicitly.
    Disconnected { code: Option<u16>, reason: String },
    /// A decoded quote push.
    Message(QuoteUpdate),
    /// A frame that could not be decoded, or a failed connect.
    Error(String),
}

// ─── WsConfig ────────────────────────────────────────────────────────────────

/// Configuration for the WS client.
#[derive(Debug, Clone)]
pub struct WsConfig {
    pub url: String,
    pub reconnect: bool,
    /// Fixed delay between a lost connection and the next attempt.
    pub reconnect_delay_ms: u64,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            url: crate::network::DEFAULT_WS_URL.to_string(),
            reconnect: true,
            reconnect_delay_ms: crate::network::DEFAULT_RECONNECT_DELAY_MS,
        }
    }
}

impl WsConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

/// Decode one text frame into a quote update.
pub fn decode_frame(text: &str) -> Result<QuoteUpdate, WsError> {
    QuoteUpdate::from_frame(text)
}
