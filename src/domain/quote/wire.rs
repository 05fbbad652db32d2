//! Wire types for quote payloads (feed frames + REST).

use super::QuoteRecord;
use crate::error::WsError;
use crate::shared::StockId;

/// A pushed feed frame: one partial record that always names its instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteUpdate {
    pub stock_id: StockId,
    pub record: QuoteRecord,
}

impl QuoteUpdate {
    pub fn new(stock_id: StockId, record: QuoteRecord) -> Self {
        Self { stock_id, record }
    }

    /// Decode a raw text frame from the feed.
    pub fn from_frame(text: &str) -> Result<Self, WsError> {
        let record: QuoteRecord = serde_json::from_str(text)
            .map_err(|e| WsError::DeserializationError(e.to_string()))?;
        Self::try_from(record)
    }
}

impl TryFrom<QuoteRecord> for QuoteUpdate {
    type Error = WsError;

    fn try_from(record: QuoteRecord) -> Result<Self, Self::Error> {
        match record.stock_id.clone() {
            Some(stock_id) => Ok(Self { stock_id, record }),
            None => Err(WsError::MissingIdentifier),
        }
    }
}

/// REST response of the fallback cache: each entry is one JSON-encoded
/// record, newest first. Entries may also arrive as plain objects.
pub type CachedQuotesResponse = Vec<serde_json::Value>;

/// REST response of the popularity/profile endpoint.
pub type PopularResponse = QuoteRecord;
