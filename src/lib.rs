//! # Quote Sync SDK
//!
//! Client-side real-time stock quote synchronization for native and WASM
//! targets: one live WebSocket feed, a merge-on-write quote store, and a
//! one-shot cache fallback for watched instruments the feed has not
//! covered yet.
//!
//! ## Architecture
//!
//! The SDK is organized in layers:
//!
//! 1. **Core** — Identifiers, quote records, store, tape, interest tracking (WASM-safe)
//! 2. **HTTP API** — `QuoteHttp` with per-endpoint retry policies
//! 3. **WebSocket** — Compile-time dispatch: `tokio-tungstenite` (native) / `web-sys` (WASM)
//! 4. **High-Level Client** — `QuoteClient` with nested sub-clients
//! 5. **Sync** — `QuoteSession` context object, the native `QuoteSync` driver and the
//!    single-threaded `LocalSync` driver used in the browser
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use quote_sync_sdk::prelude::*;
//! use std::sync::Arc;
//!
//! let client = QuoteClient::builder()
//!     .backend_host("quotes.example.com")
//!     .build()?;
//!
//! let sync = QuoteSync::start(Arc::new(client.clone()), client.ws_native()).await?;
//! sync.open_search("samsung").await?;
//!
//! let mut changes = sync.changes();
//! changes.changed().await?;
//! let session = sync.session();
//! for (id, quote) in session.read().await.store().iter() {
//!     println!("{id}: {:?}", quote.current_price);
//! }
//! ```

// ── Layer 1: Core ────────────────────────────────────────────────────────────

/// Shared newtypes used across all domains.
pub mod shared;

/// Domain modules (vertical slices): types, wire types, conversions, state.
pub mod domain;

/// Unified SDK error types.
pub mod error;

/// Network URL constants.
pub mod network;

// ── Layer 2: HTTP API ────────────────────────────────────────────────────────

/// HTTP client with retry policies.
#[cfg(feature = "http")]
pub mod http;

// ── Layer 3: WebSocket ───────────────────────────────────────────────────────

/// WebSocket client: connection state, events, config.
pub mod ws;

// ── Layer 4: High-Level Client ───────────────────────────────────────────────

/// `QuoteClient` — the primary entry point.
#[cfg(feature = "http")]
pub mod client;

// ── Layer 5: Sync ────────────────────────────────────────────────────────────

/// Session state, fallback reconciliation, native and browser drivers.
pub mod sync;

// ── Prelude ──────────────────────────────────────────────────────────────────

pub mod prelude {
    // Shared newtypes
    pub use crate::shared::{FluctuationSign, StockId};

    // Domain types
    pub use crate::domain::daily::DailyPrice;
    pub use crate::domain::interest::state::InterestTracker;
    pub use crate::domain::interest::{InterestChange, InterestSet, ViewKey};
    pub use crate::domain::quote::{QuoteRecord, QuoteStore, QuoteTape, QuoteUpdate, TAPE_CAPACITY};
    pub use crate::domain::search::SearchQuery;

    // Errors
    pub use crate::error::{HttpError, SdkError, WsError};

    // Network
    pub use crate::network::{DEFAULT_API_URL, DEFAULT_RECONNECT_DELAY_MS, DEFAULT_WS_URL};

    // HTTP client + sub-clients
    #[cfg(feature = "http")]
    pub use crate::client::{
        DailyClient, QuoteClient, QuoteClientBuilder, QuotesClient, SearchClient,
        SubscriptionsClient,
    };
    #[cfg(feature = "http")]
    pub use crate::http::retry::{RetryConfig, RetryPolicy};

    // WebSocket types
    pub use crate::ws::{ConnectionState, WsConfig, WsEvent};

    // Sync
    pub use crate::sync::local::LocalSync;
    pub use crate::sync::{
        FallbackMode, FallbackOutcome, FallbackRequest, QuoteSession, SyncBackend,
    };
    #[cfg(feature = "ws-native")]
    pub use crate::sync::driver::QuoteSync;
}
