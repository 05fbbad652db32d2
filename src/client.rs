//! High-level client — `QuoteClient` with nested sub-client accessors.
//!
//! Each domain has its own sub-client in `domain/<name>/client.rs`.
//! This module keeps the builder and accessor methods.

use crate::domain::daily::client::Daily;
use crate::domain::interest::client::Subscriptions;
use crate::domain::quote::client::Quotes;
use crate::domain::search::client::Search;
use crate::error::SdkError;
use crate::http::QuoteHttp;
use crate::network::{self, BACKEND_HOST_ENV, DEFAULT_RECONNECT_DELAY_MS};
use crate::ws::WsConfig;

use std::time::Duration;

// Re-export sub-client types for convenience.
pub use crate::domain::daily::client::Daily as DailyClient;
pub use crate::domain::interest::client::Subscriptions as SubscriptionsClient;
pub use crate::domain::quote::client::Quotes as QuotesClient;
pub use crate::domain::search::client::Search as SearchClient;

/// The primary entry point for REST access to the quote backend.
///
/// Provides nested sub-client accessors for each domain:
/// `client.quotes()`, `client.search()`, etc.
#[derive(Clone)]
pub struct QuoteClient {
    pub(crate) http: QuoteHttp,
    pub(crate) ws_config: WsConfig,
}

impl QuoteClient {
    pub fn builder() -> QuoteClientBuilder {
        QuoteClientBuilder::default()
    }

    // ── Sub-client accessors ─────────────────────────────────────────────

    pub fn quotes(&self) -> Quotes<'_> {
        Quotes { client: self }
    }

    pub fn search(&self) -> Search<'_> {
        Search { client: self }
    }

    pub fn subscriptions(&self) -> Subscriptions<'_> {
        Subscriptions { client: self }
    }

    pub fn daily(&self) -> Daily<'_> {
        Daily { client: self }
    }

    /// Get a WS config for creating the feed connection.
    ///
    /// The WS client is not embedded in `QuoteClient`; its lifetime belongs
    /// to the session (see `sync::QuoteSession`).
    pub fn ws_config(&self) -> &WsConfig {
        &self.ws_config
    }

    /// Create a new native feed connection from the current config.
    #[cfg(feature = "ws-native")]
    pub fn ws_native(&self) -> crate::ws::native::WsClient {
        crate::ws::native::WsClient::new(self.ws_config.clone())
    }
}

// ═════════════════════════════════════════════════════════════════════════════
// Builder
// ═════════════════════════════════════════════════════════════════════════════

pub struct QuoteClientBuilder {
    base_url: String,
    ws_url: String,
    reconnect_delay: Duration,
}

impl Default for QuoteClientBuilder {
    fn default() -> Self {
        Self {
            base_url: network::DEFAULT_API_URL.to_string(),
            ws_url: network::DEFAULT_WS_URL.to_string(),
            reconnect_delay: Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
        }
    }
}

impl QuoteClientBuilder {
    /// Start from `STOCK_BACKEND_URL` if it is set, defaults otherwise.
    pub fn from_env() -> Self {
        match std::env::var(BACKEND_HOST_ENV) {
            Ok(host) if !host.trim().is_empty() => Self::default().backend_host(&host),
            _ => Self::default(),
        }
    }

    pub fn base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    pub fn ws_url(mut self, url: &str) -> Self {
        self.ws_url = url.to_string();
        self
    }

    /// Derive both the REST base URL and the feed URL from one host.
    pub fn backend_host(mut self, host: &str) -> Self {
        let (api, ws) = network::urls_for_host(host);
        self.base_url = api;
        self.ws_url = ws;
        self
    }

    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn build(self) -> Result<QuoteClient, SdkError> {
        Ok(QuoteClient {
            http: QuoteHttp::new(&self.base_url)?,
            ws_config: WsConfig {
                url: self.ws_url,
                reconnect_delay_ms: u64::try_from(self.reconnect_delay.as_millis())
                    .unwrap_or(u64::MAX),
                ..WsConfig::default()
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let client = QuoteClient::builder().build().unwrap();
        assert_eq!(client.ws_config().url, network::DEFAULT_WS_URL);
        assert_eq!(client.ws_config().reconnect_delay_ms, 5_000);
        assert!(client.ws_config().reconnect);
    }

    #[test]
    fn test_builder_backend_host() {
        let client = QuoteClient::builder()
            .backend_host("quotes.example.com")
            .reconnect_delay(Duration::from_millis(250))
            .build()
            .unwrap();
        assert_eq!(client.http.base_url(), "https://quotes.example.com");
        assert_eq!(client.ws_config().url, "wss://quotes.example.com/ws/stock");
        assert_eq!(client.ws_config().reconnect_delay_ms, 250);
    }

    #[test]
    fn test_builder_clamps_huge_reconnect_delay() {
        let client = QuoteClient::builder()
            .reconnect_delay(Duration::MAX)
            .build()
            .unwrap();
        assert_eq!(client.ws_config().reconnect_delay_ms, u64::MAX);
    }
}
