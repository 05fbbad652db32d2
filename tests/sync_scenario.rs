//! Session-level scenarios against an in-memory backend.
//!
//! Run with:
//! ```bash
//! cargo test --test sync_scenario
//! ```

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use rust_decimal::Decimal;

use quote_sync_sdk::domain::interest::ViewKey;
use quote_sync_sdk::domain::quote::{QuoteRecord, QuoteUpdate};
use quote_sync_sdk::domain::search::SearchQuery;
use quote_sync_sdk::error::{HttpError, SdkError};
use quote_sync_sdk::shared::StockId;
use quote_sync_sdk::sync::{QuoteSession, SyncBackend};
use quote_sync_sdk::ws::WsEvent;

// ─── Fake backend ────────────────────────────────────────────────────────────

#[derive(Default)]
struct FakeBackend {
    search: HashMap<String, Vec<StockId>>,
    baselines: HashMap<StockId, QuoteRecord>,
    /// Raw cache payloads (JSON strings), newest first.
    cache: HashMap<StockId, Vec<String>>,
    failing_cache: Vec<StockId>,
    cache_pulls: Mutex<Vec<StockId>>,
    registrations: Mutex<Vec<Vec<StockId>>>,
    baseline_pulls: AtomicUsize,
}

impl FakeBackend {
    fn pulls_for(&self, id: &str) -> usize {
        self.cache_pulls
            .lock()
            .unwrap()
            .iter()
            .filter(|pulled| pulled.as_str() == id)
            .count()
    }
}

#[async_trait]
impl SyncBackend for FakeBackend {
    async fn resolve_search(&self, query: &SearchQuery) -> Result<Vec<StockId>, SdkError> {
        Ok(self.search.get(query.as_str()).cloned().unwrap_or_default())
    }

    async fn register_interest(&self, stock_ids: &[StockId]) -> Result<(), SdkError> {
        self.registrations.lock().unwrap().push(stock_ids.to_vec());
        Ok(())
    }

    async fn baseline_quote(&self, stock_id: &StockId) -> Result<QuoteRecord, SdkError> {
        self.baseline_pulls.fetch_add(1, Ordering::SeqCst);
        self.baselines
            .get(stock_id)
            .cloned()
            .ok_or_else(|| HttpError::NotFound(stock_id.to_string()).into())
    }

    async fn cached_quotes(&self, stock_id: &StockId) -> Result<Vec<QuoteRecord>, SdkError> {
        self.cache_pulls.lock().unwrap().push(stock_id.clone());
        if self.failing_cache.contains(stock_id) {
            return Err(HttpError::ServerError {
                status: 500,
                body: "cache down".into(),
            }
            .into());
        }
        let raw = self
            .cache
            .get(stock_id)
            .map(|entries| entries.iter().cloned().map(serde_json::Value::String).collect())
            .unwrap_or_default();
        Ok(quote_sync_sdk::domain::quote::decode_cached(raw))
    }
}

fn push(id: &str, json: &str) -> WsEvent {
    let mut value: serde_json::Value = serde_json::from_str(json).unwrap();
    value["stockId"] = serde_json::Value::String(id.into());
    WsEvent::Message(QuoteUpdate::from_frame(&value.to_string()).unwrap())
}

fn dec(s: &str) -> Option<Decimal> {
    Some(Decimal::from_str(s).unwrap())
}

// ─── Scenarios ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn live_push_then_single_fallback_for_the_gap() {
    let a = StockId::from("A");
    let b = StockId::from("B");
    let mut backend = FakeBackend::default();
    backend
        .cache
        .insert(b.clone(), vec![r#"{"currentPrice":200,"volume":10}"#.into()]);

    let mut session = QuoteSession::new();
    session.declare_interest(ViewKey::search("ab"), vec![a.clone(), b.clone()]);

    session.handle_ws_event(push("A", r#"{"currentPrice":100}"#));
    assert_eq!(session.quote(&a).unwrap().current_price, dec("100"));
    assert!(session.quote(&b).is_none());

    let issued = session.reconcile(&backend).await;
    assert_eq!(issued, 1);
    assert_eq!(backend.pulls_for("A"), 0);
    assert_eq!(backend.pulls_for("B"), 1);

    let quote_b = session.quote(&b).unwrap();
    assert_eq!(quote_b.current_price, dec("200"));
    assert_eq!(quote_b.accumulated_volume, Some(10));

    // Second check before the interest set changes: no new request.
    assert_eq!(session.reconcile(&backend).await, 0);
    assert_eq!(backend.pulls_for("B"), 1);
}

#[tokio::test]
async fn empty_or_failed_fallback_is_not_retried_within_the_episode() {
    let a = StockId::from("A");
    let b = StockId::from("B");
    let backend = FakeBackend {
        failing_cache: vec![b.clone()],
        ..FakeBackend::default()
    };

    let mut session = QuoteSession::new();
    session.declare_interest(ViewKey::search("ab"), vec![a.clone(), b.clone()]);

    assert_eq!(session.reconcile(&backend).await, 2);
    assert!(session.quote(&a).is_none());
    assert!(session.quote(&b).is_none());

    assert_eq!(session.reconcile(&backend).await, 0);
    assert_eq!(backend.pulls_for("A"), 1);
    assert_eq!(backend.pulls_for("B"), 1);

    // A different view starts a new episode.
    session.declare_interest(ViewKey::search("ba"), vec![b.clone(), a.clone()]);
    assert_eq!(session.reconcile(&backend).await, 2);
    assert_eq!(backend.pulls_for("B"), 2);
}

#[tokio::test]
async fn search_seeds_baselines_and_fills_missing_rows() {
    let a = StockId::from("A");
    let b = StockId::from("B");
    let mut backend = FakeBackend::default();
    backend.search.insert("chips".into(), vec![a.clone(), b.clone()]);
    backend.baselines.insert(
        a.clone(),
        serde_json::from_str(
            r#"{"stockId":"A","stockName":"Alpha","currentPrice":"50","ranking":1}"#,
        )
        .unwrap(),
    );
    backend.cache.insert(
        b.clone(),
        vec![
            r#"{"stockId":"B","currentPrice":"71","fluctuationSign":"2"}"#.into(),
            r#"{"stockId":"B","currentPrice":"70"}"#.into(),
        ],
    );

    let mut session = QuoteSession::new();
    let query = SearchQuery::parse(" chips ").unwrap();
    let ids = session.open_search(&backend, &query).await.unwrap();

    assert_eq!(ids, vec![a.clone(), b.clone()]);
    assert_eq!(backend.baseline_pulls.load(Ordering::SeqCst), 2);
    assert_eq!(
        backend.registrations.lock().unwrap().as_slice(),
        &[vec![a.clone(), b.clone()]]
    );
    assert_eq!(backend.pulls_for("A"), 0);
    assert_eq!(backend.pulls_for("B"), 1);

    assert_eq!(session.quote(&a).unwrap().stock_name.as_deref(), Some("Alpha"));
    assert_eq!(session.quote(&b).unwrap().current_price, dec("71"));
    assert!(session.all_interested_priced());

    // Live data keeps merging on top of the seeded rows.
    session.handle_ws_event(push("A", r#"{"fluctuationRate":"-1.5"}"#));
    let merged = session.quote(&a).unwrap();
    assert_eq!(merged.stock_name.as_deref(), Some("Alpha"));
    assert_eq!(merged.fluctuation_rate, dec("-1.5"));
}

#[tokio::test]
async fn detail_view_loads_history_from_cache_then_goes_live() {
    let a = StockId::from("A");
    let mut backend = FakeBackend::default();
    backend.cache.insert(
        a.clone(),
        (0..12)
            .map(|i| format!(r#"{{"stockId":"A","currentPrice":"{}"}}"#, 100 - i))
            .collect(),
    );

    let mut session = QuoteSession::new();
    assert_eq!(session.open_detail(&backend, a.clone()).await, 1);
    assert_eq!(
        backend.registrations.lock().unwrap().last().unwrap(),
        &vec![a.clone()]
    );

    let tape = session.tape().unwrap();
    assert_eq!(tape.len(), 10);
    assert_eq!(tape.latest().unwrap().current_price, dec("100"));
    assert_eq!(session.quote(&a).unwrap().current_price, dec("100"));

    session.handle_ws_event(push("A", r#"{"currentPrice":"101"}"#));
    let tape = session.tape().unwrap();
    assert_eq!(tape.len(), 10);
    assert_eq!(tape.latest().unwrap().current_price, dec("101"));
    let oldest = tape.iter().last().unwrap();
    assert_eq!(oldest.current_price, dec("92"));
}

#[tokio::test]
async fn detail_keeps_live_tape_after_a_partial_push() {
    let a = StockId::from("A");
    let mut backend = FakeBackend::default();
    backend
        .cache
        .insert(a.clone(), vec![r#"{"stockId":"A","currentPrice":"50"}"#.into()]);

    let mut session = QuoteSession::new();
    assert_eq!(session.open_detail(&backend, a.clone()).await, 1);
    for price in 101..=105 {
        session.handle_ws_event(push("A", &format!(r#"{{"currentPrice":"{price}"}}"#)));
    }
    session.handle_ws_event(push("A", r#"{"transactionVolume":"3"}"#));
    assert_eq!(session.tape().unwrap().len(), 7);

    assert_eq!(session.reconcile(&backend).await, 0);
    assert_eq!(backend.pulls_for("A"), 1);

    let tape = session.tape().unwrap();
    assert_eq!(tape.len(), 7);
    assert_eq!(tape.iter().nth(1).unwrap().current_price, dec("105"));
    assert_eq!(tape.iter().last().unwrap().current_price, dec("50"));
    let quote = session.quote(&a).unwrap();
    assert_eq!(quote.current_price, dec("105"));
    assert_eq!(quote.transaction_volume, Some(3));
}

#[tokio::test]
async fn undecodable_cache_entries_are_skipped() {
    let a = StockId::from("A");
    let mut backend = FakeBackend::default();
    backend.cache.insert(
        a.clone(),
        vec!["not json".into(), r#"{"stockId":"A","currentPrice":"9"}"#.into()],
    );

    let mut session = QuoteSession::new();
    session.declare_interest(ViewKey::search("a"), vec![a.clone()]);
    assert_eq!(session.reconcile(&backend).await, 1);
    assert_eq!(session.quote(&a).unwrap().current_price, dec("9"));
}
