//! Daily sub-client — refresh-then-fetch of daily aggregates.

use super::DailyPrice;
use crate::client::QuoteClient;
use crate::error::SdkError;
use crate::shared::StockId;

pub struct Daily<'a> {
    pub(crate) client: &'a QuoteClient,
}

impl<'a> Daily<'a> {
    /// Trigger a backend refresh, then fetch the aggregates.
    /// A failed refresh is logged; the fetch still runs.
    pub async fn get(&self, stock_id: &StockId) -> Result<Vec<DailyPrice>, SdkError> {
        if let Err(e) = self.client.http.refresh_daily_prices(stock_id).await {
            tracing::warn!(%stock_id, "Daily price refresh failed: {}", e);
        }
        Ok(self.client.http.get_daily_prices(stock_id).await?)
    }

    /// Fetch without asking for a refresh.
    pub async fn cached(&self, stock_id: &StockId) -> Result<Vec<DailyPrice>, SdkError> {
        Ok(self.client.http.get_daily_prices(stock_id).await?)
    }
}
