//! Subscriptions sub-client — tells the backend which instruments to push.

use crate::client::QuoteClient;
use crate::error::SdkError;
use crate::shared::StockId;

pub struct Subscriptions<'a> {
    pub(crate) client: &'a QuoteClient,
}

impl<'a> Subscriptions<'a> {
    /// Declare the current interest set so the feed can scope its pushes.
    ///
    /// Callers treat this as fire-and-forget; the result is for logging.
    pub async fn register(&self, stock_ids: &[StockId]) -> Result<(), SdkError> {
        self.client.http.update_subscriptions(stock_ids).await?;
        tracing::debug!(count = stock_ids.len(), "Subscription list updated");
        Ok(())
    }
}
