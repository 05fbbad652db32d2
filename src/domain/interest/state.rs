//! Interest tracking plus the one-shot fallback guards.

use super::{InterestChange, InterestSet, ViewKey};
use crate::shared::StockId;
use std::collections::HashSet;

/// Owns the active [`InterestSet`] and the per-(view, identifier) guards
/// that allow at most one fallback pull per "still missing" episode.
///
/// An episode lasts until the identifier leaves the set or the view
/// changes; live data arriving in between does not release the guard.
#[derive(Debug, Clone, Default)]
pub struct InterestTracker {
    current: Option<InterestSet>,
    claimed: HashSet<(ViewKey, StockId)>,
}

impl InterestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the active interest set.
    ///
    /// Guards survive only for identifiers still watched by the same view.
    pub fn replace(&mut self, view: ViewKey, stock_ids: Vec<StockId>) -> InterestChange {
        let next = InterestSet::new(view, stock_ids);

        let change = match &self.current {
            Some(prev) => InterestChange {
                added: next
                    .stock_ids()
                    .iter()
                    .filter(|id| !prev.contains(id))
                    .cloned()
                    .collect(),
                removed: prev
                    .stock_ids()
                    .iter()
                    .filter(|id| !next.contains(id))
                    .cloned()
                    .collect(),
                view_changed: prev.view() != next.view(),
            },
            None => InterestChange {
                added: next.stock_ids().to_vec(),
                removed: Vec::new(),
                view_changed: true,
            },
        };

        let before = self.claimed.len();
        self.claimed
            .retain(|(view, id)| view == next.view() && next.contains(id));
        let reset = before - self.claimed.len();

        tracing::info!(
            view = %next.view(),
            watching = next.len(),
            reset_guards = reset,
            "Interest set replaced"
        );

        self.current = Some(next);
        change
    }

    pub fn current(&self) -> Option<&InterestSet> {
        self.current.as_ref()
    }

    pub fn view(&self) -> Option<&ViewKey> {
        self.current.as_ref().map(InterestSet::view)
    }

    pub fn is_interested(&self, stock_id: &StockId) -> bool {
        self.current
            .as_ref()
            .map(|set| set.contains(stock_id))
            .unwrap_or(false)
    }

    /// Consume the fallback guard for `stock_id` in the current view.
    ///
    /// Returns `true` exactly once per episode; `false` if the identifier
    /// is not of interest or its guard was already taken.
    pub fn try_claim_fallback(&mut self, stock_id: &StockId) -> bool {
        let Some(set) = &self.current else {
            return false;
        };
        if !set.contains(stock_id) {
            return false;
        }
        self.claimed.insert((set.view().clone(), stock_id.clone()))
    }

    pub fn is_claimed(&self, stock_id: &StockId) -> bool {
        self.current
            .as_ref()
            .map(|set| {
                self.claimed
                    .contains(&(set.view().clone(), stock_id.clone()))
            })
            .unwrap_or(false)
    }

    pub fn clear(&mut self) {
        self.current = None;
        self.claimed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<StockId> {
        raw.iter().map(|s| StockId::from(*s)).collect()
    }

    #[test]
    fn test_claim_once_per_episode() {
        let mut tracker = InterestTracker::new();
        tracker.replace(ViewKey::search("q"), ids(&["A", "B"]));
        let b = StockId::from("B");
        assert!(tracker.try_claim_fallback(&b));
        assert!(!tracker.try_claim_fallback(&b));
        assert!(!tracker.try_claim_fallback(&b));
        assert!(tracker.is_claimed(&b));
    }

    #[test]
    fn test_claim_requires_interest() {
        let mut tracker = InterestTracker::new();
        assert!(!tracker.try_claim_fallback(&StockId::from("A")));
        tracker.replace(ViewKey::search("q"), ids(&["A"]));
        assert!(!tracker.try_claim_fallback(&StockId::from("Z")));
    }

    #[test]
    fn test_redeclaring_same_set_keeps_guards() {
        let mut tracker = InterestTracker::new();
        let view = ViewKey::search("q");
        tracker.replace(view.clone(), ids(&["A", "B"]));
        assert!(tracker.try_claim_fallback(&StockId::from("B")));

        let change = tracker.replace(view, ids(&["A", "B"]));
        assert!(change.is_noop());
        assert!(!tracker.try_claim_fallback(&StockId::from("B")));
    }

    #[test]
    fn test_removed_identifiers_lose_guards() {
        let mut tracker = InterestTracker::new();
        let view = ViewKey::search("q");
        tracker.replace(view.clone(), ids(&["A", "B"]));
        assert!(tracker.try_claim_fallback(&StockId::from("A")));
        assert!(tracker.try_claim_fallback(&StockId::from("B")));

        let change = tracker.replace(view.clone(), ids(&["A"]));
        assert_eq!(change.removed, ids(&["B"]));
        assert!(!change.view_changed);

        // B returns: fresh episode. A stayed: still claimed.
        tracker.replace(view, ids(&["A", "B"]));
        assert!(tracker.try_claim_fallback(&StockId::from("B")));
        assert!(!tracker.try_claim_fallback(&StockId::from("A")));
    }

    #[test]
    fn test_view_change_resets_guards() {
        let mut tracker = InterestTracker::new();
        let a = StockId::from("A");
        tracker.replace(ViewKey::detail(a.clone()), vec![a.clone()]);
        assert!(tracker.try_claim_fallback(&a));

        let change = tracker.replace(ViewKey::detail(StockId::from("B")), ids(&["B"]));
        assert!(change.view_changed);
        assert_eq!(change.added, ids(&["B"]));
        assert_eq!(change.removed, ids(&["A"]));

        tracker.replace(ViewKey::detail(a.clone()), vec![a.clone()]);
        assert!(tracker.try_claim_fallback(&a));
    }

    #[test]
    fn test_first_replace_reports_everything_added() {
        let mut tracker = InterestTracker::new();
        let change = tracker.replace(ViewKey::search("q"), ids(&["A", "B"]));
        assert_eq!(change.added, ids(&["A", "B"]));
        assert!(change.view_changed);
        assert!(tracker.is_interested(&StockId::from("A")));
        tracker.clear();
        assert!(!tracker.is_interested(&StockId::from("A")));
    }
}
