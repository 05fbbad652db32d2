//! Quote store — app-owned, SDK-provided merge logic.

use super::QuoteRecord;
use crate::shared::StockId;
use std::collections::HashMap;

/// Identifier → latest known quote.
///
/// At most one record per identifier; every write goes through the
/// field-merge rule of [`QuoteRecord::merge`], so repeated or partial
/// updates never clear data.
#[derive(Debug, Clone, Default)]
pub struct QuoteStore {
    quotes: HashMap<StockId, QuoteRecord>,
}

impl QuoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a partial record into the live record for `stock_id`.
    pub fn merge(&mut self, stock_id: &StockId, partial: QuoteRecord) {
        let entry = self
            .quotes
            .entry(stock_id.clone())
            .or_insert_with(|| QuoteRecord::for_stock(stock_id.clone()));
        entry.merge(partial);
        tracing::debug!(%stock_id, "Merged quote update");
    }

    /// Merge a snapshot that must not overwrite fields the live record
    /// already holds.
    pub fn fill(&mut self, stock_id: &StockId, snapshot: QuoteRecord) {
        let entry = self
            .quotes
            .entry(stock_id.clone())
            .or_insert_with(|| QuoteRecord::for_stock(stock_id.clone()));
        entry.fill_missing(snapshot);
        tracing::debug!(%stock_id, "Filled quote from snapshot");
    }

    /// Replace the whole store with a fresh baseline.
    pub fn replace_all(&mut self, mapping: HashMap<StockId, QuoteRecord>) {
        self.quotes = mapping
            .into_iter()
            .map(|(stock_id, mut record)| {
                record.stock_id = Some(stock_id.clone());
                (stock_id, record)
            })
            .collect();
        tracing::debug!(count = self.quotes.len(), "Replaced quote store baseline");
    }

    pub fn get(&self, stock_id: &StockId) -> Option<&QuoteRecord> {
        self.quotes.get(stock_id)
    }

    pub fn contains(&self, stock_id: &StockId) -> bool {
        self.quotes.contains_key(stock_id)
    }

    /// Whether the stored record for `stock_id` has a live price.
    pub fn has_current_price(&self, stock_id: &StockId) -> bool {
        self.get(stock_id)
            .map(QuoteRecord::has_current_price)
            .unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StockId, &QuoteRecord)> {
        self.quotes.iter()
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn clear(&mut self) {
        self.quotes.clear();
    }
}
