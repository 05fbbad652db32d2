//! Fallback reconciliation: pull cached snapshots for watched identifiers
//! the live feed has not covered yet.
//!
//! Split into three steps so the caller decides where I/O runs:
//! [`plan`] (pure, claims guards), [`pull`] (one request per plan entry),
//! [`apply`] (pure, merges the outcome).

use crate::domain::interest::state::InterestTracker;
use crate::domain::interest::ViewKey;
use crate::domain::quote::{QuoteRecord, QuoteStore, QuoteTape};
use crate::shared::StockId;
use crate::sync::backend::SyncBackend;

/// What a fallback pull feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackMode {
    /// Only the newest record goes into the store.
    Latest,
    /// The newest record goes into the store and the sequence seeds the
    /// detail tape.
    WithHistory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackRequest {
    pub view: ViewKey,
    pub stock_id: StockId,
    pub mode: FallbackMode,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FallbackOutcome {
    Loaded {
        request: FallbackRequest,
        records: Vec<QuoteRecord>,
    },
    Empty {
        request: FallbackRequest,
    },
    Failed {
        request: FallbackRequest,
        reason: String,
    },
}

impl FallbackOutcome {
    pub fn request(&self) -> &FallbackRequest {
        match self {
            FallbackOutcome::Loaded { request, .. }
            | FallbackOutcome::Empty { request }
            | FallbackOutcome::Failed { request, .. } => request,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, FallbackOutcome::Loaded { .. })
    }
}

/// Whether `stock_id` still lacks data the given view can show.
pub fn is_missing(
    view: &ViewKey,
    stock_id: &StockId,
    store: &QuoteStore,
    tape: Option<&QuoteTape>,
) -> bool {
    if !store.has_current_price(stock_id) {
        return true;
    }
    match view.detail_id() {
        Some(detail) if detail == stock_id => !tape_has_entries(stock_id, tape),
        _ => false,
    }
}

fn tape_has_entries(stock_id: &StockId, tape: Option<&QuoteTape>) -> bool {
    tape.is_some_and(|t| t.stock_id() == stock_id && !t.is_empty())
}

/// Decide which identifiers need a fallback pull now.
///
/// Claims the guard of every identifier returned, in interest order, so a
/// second call before the interest set changes returns nothing for it.
/// History is only requested while the detail tape is still empty.
pub fn plan(
    tracker: &mut InterestTracker,
    store: &QuoteStore,
    tape: Option<&QuoteTape>,
) -> Vec<FallbackRequest> {
    let Some(set) = tracker.current() else {
        return Vec::new();
    };
    let view = set.view().clone();
    let candidates: Vec<StockId> = set
        .stock_ids()
        .iter()
        .filter(|id| is_missing(&view, id, store, tape))
        .cloned()
        .collect();

    let mut requests = Vec::new();
    for stock_id in candidates {
        if !tracker.try_claim_fallback(&stock_id) {
            continue;
        }
        let seeds_tape =
            view.detail_id() == Some(&stock_id) && !tape_has_entries(&stock_id, tape);
        let mode = if seeds_tape {
            FallbackMode::WithHistory
        } else {
            FallbackMode::Latest
        };
        requests.push(FallbackRequest {
            view: view.clone(),
            stock_id,
            mode,
        });
    }

    if !requests.is_empty() {
        tracing::debug!(%view, pulls = requests.len(), "Planned fallback pulls");
    }
    requests
}

/// Issue the single cache pull for `request`. Never fails: errors become
/// [`FallbackOutcome::Failed`].
pub async fn pull<B>(backend: &B, request: FallbackRequest) -> FallbackOutcome
where
    B: SyncBackend + ?Sized,
{
    match backend.cached_quotes(&request.stock_id).await {
        Ok(records) if records.is_empty() => {
            tracing::info!(stock_id = %request.stock_id, "Fallback cache has no data");
            FallbackOutcome::Empty { request }
        }
        Ok(records) => FallbackOutcome::Loaded { request, records },
        Err(e) => {
            tracing::warn!(stock_id = %request.stock_id, "Fallback pull failed: {}", e);
            FallbackOutcome::Failed {
                request,
                reason: e.to_string(),
            }
        }
    }
}

/// Merge a pull result. Returns whether anything changed.
///
/// Outcomes are applied even when the interest set has moved on since
/// the pull was planned. A snapshot never overwrites a price that live
/// pushes delivered while the pull was in flight: it only fills absent
/// fields then, and cached history goes behind the live tape entries.
pub fn apply(
    outcome: FallbackOutcome,
    store: &mut QuoteStore,
    tape: Option<&mut QuoteTape>,
) -> bool {
    let FallbackOutcome::Loaded { request, records } = outcome else {
        return false;
    };
    let Some(newest) = records.first().cloned() else {
        return false;
    };

    if store.has_current_price(&request.stock_id) {
        store.fill(&request.stock_id, newest);
    } else {
        store.merge(&request.stock_id, newest);
    }

    if request.mode == FallbackMode::WithHistory {
        if let Some(tape) = tape.filter(|t| t.stock_id() == &request.stock_id) {
            if tape.is_empty() {
                tape.replace(records);
            } else {
                tape.backfill(records);
            }
        }
    }

    tracing::debug!(stock_id = %request.stock_id, "Applied fallback snapshot");
    true
}
