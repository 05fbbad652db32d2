//! Client-side quote synchronization.
//!
//! [`QuoteSession`] is the context object a view layer holds for one
//! session: the quote store, the interest tracker with its fallback
//! guards, the detail tape and the feed state. Every write goes through
//! it, so whoever owns the session is the single writer.
//!
//! On native targets [`driver::QuoteSync`] owns a session behind a lock
//! and feeds it from the WebSocket and the backend. In the browser
//! [`local::LocalSync`] does the same on the single-threaded executor.
//! The `async` navigation methods below hold `&mut self` across backend
//! calls and suit callers that own the session outright.

pub mod backend;
#[cfg(feature = "ws-native")]
pub mod driver;
pub mod local;
pub mod reconciler;

use std::collections::HashMap;

use futures_util::future::{join, join_all};

use crate::domain::interest::state::InterestTracker;
use crate::domain::interest::{InterestChange, InterestSet, ViewKey};
use crate::domain::quote::{QuoteRecord, QuoteStore, QuoteTape, QuoteUpdate};
use crate::domain::search::SearchQuery;
use crate::error::SdkError;
use crate::shared::StockId;
use crate::ws::{ConnectionState, WsEvent};

pub use backend::SyncBackend;
pub use reconciler::{FallbackMode, FallbackOutcome, FallbackRequest};

#[derive(Debug, Clone, Default)]
pub struct QuoteSession {
    store: QuoteStore,
    interest: InterestTracker,
    tape: Option<QuoteTape>,
    connection: ConnectionState,
}

impl QuoteSession {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Feed ─────────────────────────────────────────────────────────────

    /// Apply one feed event. Returns whether observable state changed.
    pub fn handle_ws_event(&mut self, event: WsEvent) -> bool {
        match event {
            WsEvent::Connected => self.set_connection(ConnectionState::Open),
            WsEvent::Disconnected { code, reason } => {
                tracing::info!(?code, %reason, "Quote feed disconnected");
                self.set_connection(ConnectionState::Closed)
            }
            WsEvent::Message(update) => {
                self.apply_push(update);
                true
            }
            WsEvent::Error(reason) => {
                tracing::warn!("Quote feed error: {}", reason);
                false
            }
        }
    }

    fn set_connection(&mut self, state: ConnectionState) -> bool {
        let changed = self.connection != state;
        self.connection = state;
        changed
    }

    /// Merge a live push into the store and, when it concerns the detail
    /// instrument, prepend it to the tape.
    pub fn apply_push(&mut self, update: QuoteUpdate) {
        let QuoteUpdate { stock_id, record } = update;

        if let Some(tape) = self.tape.as_mut().filter(|t| t.stock_id() == &stock_id) {
            tape.push(record.clone());
        }
        self.store.merge(&stock_id, record);
        tracing::trace!(%stock_id, "Applied live push");
    }

    // ── Interest ─────────────────────────────────────────────────────────

    /// Replace the set of identifiers the active view watches.
    ///
    /// Entering a detail view for a new identifier starts an empty tape;
    /// any other view drops it.
    pub fn declare_interest(
        &mut self,
        view: ViewKey,
        stock_ids: Vec<StockId>,
    ) -> InterestChange {
        match view.detail_id() {
            Some(id) => {
                if self.tape.as_ref().map(QuoteTape::stock_id) != Some(id) {
                    self.tape = Some(QuoteTape::new(id.clone()));
                }
            }
            None => self.tape = None,
        }
        self.interest.replace(view, stock_ids)
    }

    /// Seed the store from baseline pulls, discarding what was there.
    pub fn seed_baseline(&mut self, mapping: HashMap<StockId, QuoteRecord>) {
        tracing::debug!(records = mapping.len(), "Seeding baseline quotes");
        self.store.replace_all(mapping);
    }

    // ── Fallback ─────────────────────────────────────────────────────────

    pub fn plan_fallbacks(&mut self) -> Vec<FallbackRequest> {
        reconciler::plan(&mut self.interest, &self.store, self.tape.as_ref())
    }

    pub fn apply_fallback(&mut self, outcome: FallbackOutcome) -> bool {
        reconciler::apply(outcome, &mut self.store, self.tape.as_mut())
    }

    /// Plan, pull concurrently and apply. Returns the number of pulls issued.
    pub async fn reconcile<B>(&mut self, backend: &B) -> usize
    where
        B: SyncBackend + ?Sized,
    {
        let requests = self.plan_fallbacks();
        let issued = requests.len();
        if issued == 0 {
            return 0;
        }

        let outcomes = join_all(
            requests
                .into_iter()
                .map(|request| reconciler::pull(backend, request)),
        )
        .await;
        for outcome in outcomes {
            self.apply_fallback(outcome);
        }
        issued
    }

    // ── Navigation ───────────────────────────────────────────────────────

    /// Resolve `query`, watch the results, seed baselines, then fill gaps
    /// from the cache. Returns the resolved identifiers.
    pub async fn open_search<B>(
        &mut self,
        backend: &B,
        query: &SearchQuery,
    ) -> Result<Vec<StockId>, SdkError>
    where
        B: SyncBackend + ?Sized,
    {
        let stock_ids = backend.resolve_search(query).await?;
        self.declare_interest(ViewKey::search(query.as_str()), stock_ids.clone());

        let baselines = join_all(stock_ids.iter().map(|id| async move {
            (id.clone(), backend.baseline_quote(id).await)
        }));
        let (registered, baselines) = join(backend.register_interest(&stock_ids), baselines).await;
        if let Err(e) = registered {
            tracing::warn!("Subscription registration failed: {}", e);
        }

        self.seed_baseline(collect_baselines(baselines));
        self.reconcile(backend).await;
        Ok(stock_ids)
    }

    /// Watch a single instrument with a live tape, then fill gaps from the
    /// cache. Returns the number of fallback pulls issued.
    pub async fn open_detail<B>(&mut self, backend: &B, stock_id: StockId) -> usize
    where
        B: SyncBackend + ?Sized,
    {
        let ids = vec![stock_id.clone()];
        self.declare_interest(ViewKey::detail(stock_id), ids.clone());
        if let Err(e) = backend.register_interest(&ids).await {
            tracing::warn!("Subscription registration failed: {}", e);
        }
        self.reconcile(backend).await
    }

    // ── Reads ────────────────────────────────────────────────────────────

    pub fn store(&self) -> &QuoteStore {
        &self.store
    }

    pub fn quote(&self, stock_id: &StockId) -> Option<&QuoteRecord> {
        self.store.get(stock_id)
    }

    pub fn tape(&self) -> Option<&QuoteTape> {
        self.tape.as_ref()
    }

    pub fn interest(&self) -> Option<&InterestSet> {
        self.interest.current()
    }

    pub fn tracker(&self) -> &InterestTracker {
        &self.interest
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_open()
    }

    /// Every watched identifier has a current price (false when nothing
    /// is watched).
    pub fn all_interested_priced(&self) -> bool {
        match self.interest.current() {
            Some(set) if !set.is_empty() => set
                .stock_ids()
                .iter()
                .all(|id| self.store.has_current_price(id)),
            _ => false,
        }
    }
}

/// Keep successful baseline pulls; failures are logged and left to the
/// fallback path.
pub(crate) fn collect_baselines(
    results: Vec<(StockId, Result<QuoteRecord, SdkError>)>,
) -> HashMap<StockId, QuoteRecord> {
    results
        .into_iter()
        .filter_map(|(stock_id, result)| match result {
            Ok(record) => Some((stock_id, record)),
            Err(e) => {
                tracing::warn!(%stock_id, "Baseline pull failed: {}", e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn push(id: &str, json: &str) -> QuoteUpdate {
        let mut record: QuoteRecord = serde_json::from_str(json).unwrap();
        record.stock_id = Some(StockId::from(id));
        QuoteUpdate::new(StockId::from(id), record)
    }

    #[test]
    fn test_connection_events_toggle_state() {
        let mut session = QuoteSession::new();
        assert_eq!(session.connection_state(), ConnectionState::Closed);
        assert!(session.handle_ws_event(WsEvent::Connected));
        assert!(session.is_connected());
        assert!(!session.handle_ws_event(WsEvent::Connected));
        assert!(session.handle_ws_event(WsEvent::Disconnected {
            code: Some(1006),
            reason: "gone".into()
        }));
        assert!(!session.is_connected());
        assert!(!session.handle_ws_event(WsEvent::Error("bad frame".into())));
    }

    #[test]
    fn test_push_merges_fields() {
        let mut session = QuoteSession::new();
        session.apply_push(push("A", r#"{"currentPrice":"100"}"#));
        session.apply_push(push("A", r#"{"acmlvol":"7"}"#));

        let quote = session.quote(&StockId::from("A")).unwrap();
        assert_eq!(quote.current_price, Some(Decimal::from(100)));
        assert_eq!(quote.accumulated_volume, Some(7));
    }

    #[test]
    fn test_detail_tape_follows_view() {
        let a = StockId::from("A");
        let mut session = QuoteSession::new();
        session.declare_interest(ViewKey::detail(a.clone()), vec![a.clone()]);
        session.apply_push(push("A", r#"{"currentPrice":"1"}"#));
        session.apply_push(push("B", r#"{"currentPrice":"2"}"#));
        session.apply_push(push("A", r#"{"currentPrice":"3"}"#));

        let tape = session.tape().unwrap();
        assert_eq!(tape.len(), 2);
        assert_eq!(tape.latest().unwrap().current_price, Some(Decimal::from(3)));

        // Same detail again keeps history; a search view drops it.
        session.declare_interest(ViewKey::detail(a.clone()), vec![a.clone()]);
        assert_eq!(session.tape().unwrap().len(), 2);
        session.declare_interest(ViewKey::search("x"), vec![a]);
        assert!(session.tape().is_none());
    }

    #[test]
    fn test_guard_held_until_view_changes() {
        let a = StockId::from("A");
        let mut session = QuoteSession::new();
        session.declare_interest(ViewKey::detail(a.clone()), vec![a.clone()]);
        assert_eq!(session.plan_fallbacks().len(), 1);

        session.apply_push(push("A", r#"{"currentPrice":"10"}"#));
        session.apply_push(push("A", r#"{"transactionVolume":"3"}"#));
        assert!(session.tracker().is_claimed(&a));
        assert!(session.plan_fallbacks().is_empty());

        session.declare_interest(ViewKey::search("q"), vec![a.clone()]);
        assert!(!session.tracker().is_claimed(&a));
    }

    #[test]
    fn test_all_interested_priced() {
        let mut session = QuoteSession::new();
        assert!(!session.all_interested_priced());
        session.declare_interest(ViewKey::search("q"), vec!["A".into(), "B".into()]);
        session.apply_push(push("A", r#"{"currentPrice":"1"}"#));
        assert!(!session.all_interested_priced());
        session.apply_push(push("B", r#"{"currentPrice":"2"}"#));
        assert!(session.all_interested_priced());
    }

    #[test]
    fn test_seed_baseline_replaces_store() {
        let mut session = QuoteSession::new();
        session.apply_push(push("OLD", r#"{"currentPrice":"1"}"#));
        let mut mapping = HashMap::new();
        mapping.insert(StockId::from("NEW"), QuoteRecord::default());
        session.seed_baseline(mapping);
        assert!(session.quote(&StockId::from("OLD")).is_none());
        assert!(session.store().contains(&StockId::from("NEW")));
    }
}
