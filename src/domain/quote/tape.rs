//! Live quote tape — bounded, newest-first history for one watched instrument.

use super::QuoteRecord;
use crate::shared::StockId;
use std::collections::VecDeque;

/// How many pushed records the tape keeps.
pub const TAPE_CAPACITY: usize = 10;

/// Rolling buffer of the most recent pushed records for one identifier.
///
/// Independent of the store's single-latest semantics: each entry is the
/// record as it was delivered, not the merged state.
#[derive(Debug, Clone)]
pub struct QuoteTape {
    stock_id: StockId,
    entries: VecDeque<QuoteRecord>,
    capacity: usize,
}

impl QuoteTape {
    pub fn new(stock_id: StockId) -> Self {
        Self::with_capacity(stock_id, TAPE_CAPACITY)
    }

    pub fn with_capacity(stock_id: StockId, capacity: usize) -> Self {
        Self {
            stock_id,
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn stock_id(&self) -> &StockId {
        &self.stock_id
    }

    /// Prepend a pushed record, evicting the oldest if at capacity.
    pub fn push(&mut self, record: QuoteRecord) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() >= self.capacity {
            self.entries.pop_back();
        }
        self.entries.push_front(record);
    }

    /// Replace all entries with a newest-first sequence (e.g. a cache pull).
    pub fn replace(&mut self, records: Vec<QuoteRecord>) {
        self.entries.clear();
        for record in records.into_iter().take(self.capacity) {
            self.entries.push_back(record);
        }
    }

    /// Append an older newest-first sequence behind the entries already
    /// held, up to capacity. Existing entries are never displaced.
    pub fn backfill(&mut self, records: Vec<QuoteRecord>) {
        let room = self.capacity.saturating_sub(self.entries.len());
        self.entries.extend(records.into_iter().take(room));
    }

    pub fn latest(&self) -> Option<&QuoteRecord> {
        self.entries.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QuoteRecord> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
