//! Interest domain — which instruments the active view watches.

#[cfg(feature = "http")]
pub mod client;
pub mod state;

use crate::shared::StockId;

pub use state::InterestTracker;

/// Identity of a view that declares interest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ViewKey {
    /// A search result page for `query`.
    Search { query: String },
    /// A single-instrument detail page.
    Detail { stock_id: StockId },
}

impl ViewKey {
    pub fn search(query: impl Into<String>) -> Self {
        Self::Search {
            query: query.into(),
        }
    }

    pub fn detail(stock_id: StockId) -> Self {
        Self::Detail { stock_id }
    }

    pub fn is_detail(&self) -> bool {
        matches!(self, Self::Detail { .. })
    }

    /// The watched identifier, for detail views.
    pub fn detail_id(&self) -> Option<&StockId> {
        match self {
            Self::Detail { stock_id } => Some(stock_id),
            Self::Search { .. } => None,
        }
    }
}

impl std::fmt::Display for ViewKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Search { query } => write!(f, "search:{}", query),
            Self::Detail { stock_id } => write!(f, "detail:{}", stock_id),
        }
    }
}

/// Ordered identifiers relevant to the active view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterestSet {
    view: ViewKey,
    stock_ids: Vec<StockId>,
}

impl InterestSet {
    /// Build a set, dropping duplicate identifiers but keeping first-seen order.
    pub fn new(view: ViewKey, stock_ids: Vec<StockId>) -> Self {
        let mut unique: Vec<StockId> = Vec::with_capacity(stock_ids.len());
        for id in stock_ids {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        Self {
            view,
            stock_ids: unique,
        }
    }

    pub fn view(&self) -> &ViewKey {
        &self.view
    }

    pub fn stock_ids(&self) -> &[StockId] {
        &self.stock_ids
    }

    pub fn contains(&self, stock_id: &StockId) -> bool {
        self.stock_ids.contains(stock_id)
    }

    pub fn len(&self) -> usize {
        self.stock_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stock_ids.is_empty()
    }
}

/// What changed when an interest set was replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterestChange {
    pub added: Vec<StockId>,
    pub removed: Vec<StockId>,
    /// The view itself differs from the previous one.
    pub view_changed: bool,
}

impl InterestChange {
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && !self.view_changed
    }
}
