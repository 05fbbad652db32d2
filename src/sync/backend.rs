//! The pull side of synchronization, as a port.
//!
//! `QuoteSession` only talks to the backend through this trait, so the
//! session logic runs unchanged against `QuoteClient` or a test double.

use async_trait::async_trait;

use crate::domain::quote::QuoteRecord;
use crate::domain::search::SearchQuery;
use crate::error::SdkError;
use crate::shared::StockId;

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait SyncBackend {
    /// Free-text query → ordered identifiers.
    async fn resolve_search(&self, query: &SearchQuery) -> Result<Vec<StockId>, SdkError>;

    /// Tell the backend which identifiers to push. Result is advisory.
    async fn register_interest(&self, stock_ids: &[StockId]) -> Result<(), SdkError>;

    /// One baseline record used to seed a search view.
    async fn baseline_quote(&self, stock_id: &StockId) -> Result<QuoteRecord, SdkError>;

    /// Cached snapshots, newest first. A single request, no retry.
    async fn cached_quotes(&self, stock_id: &StockId) -> Result<Vec<QuoteRecord>, SdkError>;
}

#[cfg(feature = "http")]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl SyncBackend for crate::client::QuoteClient {
    async fn resolve_search(&self, query: &SearchQuery) -> Result<Vec<StockId>, SdkError> {
        self.search().resolve(query).await
    }

    async fn register_interest(&self, stock_ids: &[StockId]) -> Result<(), SdkError> {
        self.subscriptions().register(stock_ids).await
    }

    async fn baseline_quote(&self, stock_id: &StockId) -> Result<QuoteRecord, SdkError> {
        self.quotes().popular(stock_id).await
    }

    async fn cached_quotes(&self, stock_id: &StockId) -> Result<Vec<QuoteRecord>, SdkError> {
        self.quotes().cached(stock_id).await
    }
}
