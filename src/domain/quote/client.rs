//! Quotes sub-client — baseline and fallback cache pulls.

use super::{decode_cached, QuoteRecord};
use crate::client::QuoteClient;
use crate::error::SdkError;
use crate::shared::StockId;

pub struct Quotes<'a> {
    pub(crate) client: &'a QuoteClient,
}

impl<'a> Quotes<'a> {
    /// Baseline profile/popularity record used to seed the store.
    pub async fn popular(&self, stock_id: &StockId) -> Result<QuoteRecord, SdkError> {
        let mut record = self.client.http.get_popular(stock_id).await?;
        record.stock_id.get_or_insert_with(|| stock_id.clone());
        Ok(record)
    }

    /// Recent cached snapshots, newest first. Empty when the cache has nothing.
    ///
    /// Issues exactly one request.
    pub async fn cached(&self, stock_id: &StockId) -> Result<Vec<QuoteRecord>, SdkError> {
        let raw = self.client.http.get_cached_quotes(stock_id).await?;
        Ok(decode_cached(raw))
    }
}
