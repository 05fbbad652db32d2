//! Search sub-client — query → ordered identifiers.

use super::SearchQuery;
use crate::client::QuoteClient;
use crate::error::SdkError;
use crate::shared::StockId;

pub struct Search<'a> {
    pub(crate) client: &'a QuoteClient,
}

impl<'a> Search<'a> {
    /// Resolve a free-text query to matching identifiers, best match first.
    pub async fn resolve(&self, query: &SearchQuery) -> Result<Vec<StockId>, SdkError> {
        let ids = self.client.http.search_stock_ids(query.as_str()).await?;
        tracing::debug!(%query, matches = ids.len(), "Search resolved");
        Ok(ids)
    }
}
