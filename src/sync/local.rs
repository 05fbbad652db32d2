//! Single-threaded session driver for the browser.
//!
//! [`LocalSync`] shares one [`QuoteSession`] between the feed callback and
//! navigation. Backend calls run as spawned local tasks, and the session
//! is borrowed only to plan or apply, never across an `.await`. A push
//! that arrives while a pull is in flight merges right away.
//!
//! With the `ws-wasm` feature, [`LocalSync::for_browser`] spawns on
//! `wasm_bindgen_futures` and [`LocalSync::connect_feed`] routes
//! [`crate::ws::wasm::WsClient`] events into the session.

use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;

use futures_util::future::{join_all, LocalBoxFuture};
use futures_util::FutureExt;

use super::backend::SyncBackend;
use super::reconciler::{self, FallbackRequest};
use super::{collect_baselines, QuoteSession};
use crate::domain::interest::ViewKey;
use crate::domain::quote::QuoteRecord;
use crate::domain::search::SearchQuery;
use crate::error::SdkError;
use crate::shared::StockId;
use crate::ws::WsEvent;

/// Runs a task on the current thread's executor.
pub type Spawner = fn(LocalBoxFuture<'static, ()>);

struct Shared<B> {
    backend: Rc<B>,
    session: RefCell<QuoteSession>,
    /// Bumped on every navigation; stale search/baseline results are dropped.
    generation: Cell<u64>,
    revision: Cell<u64>,
    on_change: RefCell<Option<Box<dyn Fn(u64)>>>,
    spawn: Spawner,
}

/// Cheap-to-clone handle; every clone drives the same session.
pub struct LocalSync<B> {
    shared: Rc<Shared<B>>,
}

impl<B> Clone for LocalSync<B> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<B> LocalSync<B>
where
    B: SyncBackend + 'static,
{
    pub fn new(backend: Rc<B>, spawn: Spawner) -> Self {
        Self {
            shared: Rc::new(Shared {
                backend,
                session: RefCell::new(QuoteSession::new()),
                generation: Cell::new(0),
                revision: Cell::new(0),
                on_change: RefCell::new(None),
                spawn,
            }),
        }
    }

    /// Driver whose tasks run on the browser's microtask queue.
    #[cfg(feature = "ws-wasm")]
    pub fn for_browser(backend: Rc<B>) -> Self {
        Self::new(backend, |task| wasm_bindgen_futures::spawn_local(task))
    }

    /// Open the feed and apply its events to this session.
    #[cfg(feature = "ws-wasm")]
    pub fn connect_feed(&self, config: crate::ws::WsConfig) {
        let sync = self.clone();
        crate::ws::wasm::WsClient::connect(config, move |event| sync.handle_ws_event(event));
    }

    /// Register a callback run with the new revision after every change.
    pub fn on_change(&self, callback: impl Fn(u64) + 'static) {
        *self.shared.on_change.borrow_mut() = Some(Box::new(callback));
    }

    // ── Feed ─────────────────────────────────────────────────────────────

    pub fn handle_ws_event(&self, event: WsEvent) {
        if self
            .with_session(|session| session.handle_ws_event(event))
            .unwrap_or(false)
        {
            self.bump();
        }
    }

    // ── Navigation ───────────────────────────────────────────────────────

    /// Navigate to a search view. Blank queries are rejected here.
    pub fn open_search(&self, query: &str) -> Result<(), SdkError> {
        let query = SearchQuery::parse(query)?;
        let generation = self.next_generation();
        let sync = self.clone();
        self.spawn(sync.run_search(generation, query).boxed_local());
        Ok(())
    }

    /// Navigate to the detail view of one instrument. Returns the number
    /// of fallback pulls started.
    pub fn open_detail(&self, stock_id: impl Into<StockId>) -> usize {
        let stock_id = stock_id.into();
        self.next_generation();
        let ids = vec![stock_id.clone()];
        self.with_session(|session| {
            session.declare_interest(ViewKey::detail(stock_id), ids.clone())
        });
        self.bump();
        self.register(ids);
        self.reconcile()
    }

    /// Start a fallback pull for every missing identifier. Returns the
    /// number of pulls started.
    pub fn reconcile(&self) -> usize {
        let requests = self
            .with_session(QuoteSession::plan_fallbacks)
            .unwrap_or_default();
        let issued = requests.len();
        for request in requests {
            self.pull_fallback(request);
        }
        issued
    }

    // ── Reads ────────────────────────────────────────────────────────────

    pub fn session(&self) -> Ref<'_, QuoteSession> {
        self.shared.session.borrow()
    }

    pub fn quote(&self, stock_id: &StockId) -> Option<QuoteRecord> {
        self.session().quote(stock_id).cloned()
    }

    pub fn revision(&self) -> u64 {
        self.shared.revision.get()
    }

    // ── Internal ─────────────────────────────────────────────────────────

    async fn run_search(self, generation: u64, query: SearchQuery) {
        let backend = Rc::clone(&self.shared.backend);
        let stock_ids = match backend.resolve_search(&query).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(%query, "Search resolution failed: {}", e);
                Vec::new()
            }
        };
        if !self.is_current(generation) {
            tracing::debug!(%query, "Discarding superseded search result");
            return;
        }

        self.with_session(|session| {
            session.declare_interest(ViewKey::search(query.as_str()), stock_ids.clone())
        });
        self.bump();
        self.register(stock_ids.clone());

        let results = join_all(stock_ids.iter().map(|stock_id| {
            let backend = Rc::clone(&backend);
            async move { (stock_id.clone(), backend.baseline_quote(stock_id).await) }
        }))
        .await;
        if !self.is_current(generation) {
            tracing::debug!("Discarding superseded baseline pulls");
            return;
        }

        self.with_session(|session| session.seed_baseline(collect_baselines(results)));
        self.bump();
        self.reconcile();
    }

    fn pull_fallback(&self, request: FallbackRequest) {
        let sync = self.clone();
        self.spawn(
            async move {
                let outcome = reconciler::pull(sync.shared.backend.as_ref(), request).await;
                if sync
                    .with_session(|session| session.apply_fallback(outcome))
                    .unwrap_or(false)
                {
                    sync.bump();
                }
            }
            .boxed_local(),
        );
    }

    /// Fire-and-forget subscription update.
    fn register(&self, stock_ids: Vec<StockId>) {
        let backend = Rc::clone(&self.shared.backend);
        self.spawn(
            async move {
                if let Err(e) = backend.register_interest(&stock_ids).await {
                    tracing::warn!("Subscription registration failed: {}", e);
                }
            }
            .boxed_local(),
        );
    }

    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        (self.shared.spawn)(task);
    }

    fn next_generation(&self) -> u64 {
        let generation = self.shared.generation.get() + 1;
        self.shared.generation.set(generation);
        generation
    }

    fn is_current(&self, generation: u64) -> bool {
        self.shared.generation.get() == generation
    }

    fn with_session<R>(&self, f: impl FnOnce(&mut QuoteSession) -> R) -> Option<R> {
        match self.shared.session.try_borrow_mut() {
            Ok(mut session) => Some(f(&mut session)),
            Err(_) => {
                tracing::error!("Quote session already borrowed, update skipped");
                None
            }
        }
    }

    fn bump(&self) {
        let revision = self.shared.revision.get() + 1;
        self.shared.revision.set(revision);
        if let Ok(callback) = self.shared.on_change.try_borrow() {
            if let Some(f) = callback.as_ref() {
                f(revision);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::quote::QuoteUpdate;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::Notify;
    use tokio::task::LocalSet;

    #[derive(Default)]
    struct GatedBackend {
        gate: Notify,
        gated: Vec<&'static str>,
        cache_pulls: Mutex<Vec<StockId>>,
    }

    #[async_trait]
    impl SyncBackend for GatedBackend {
        async fn resolve_search(&self, query: &SearchQuery) -> Result<Vec<StockId>, SdkError> {
            if self.gated.contains(&query.as_str()) {
                self.gate.notified().await;
            }
            Ok(vec![StockId::from(query.as_str().to_uppercase())])
        }

        async fn register_interest(&self, _: &[StockId]) -> Result<(), SdkError> {
            Ok(())
        }

        async fn baseline_quote(&self, _: &StockId) -> Result<QuoteRecord, SdkError> {
            Ok(priced(1))
        }

        async fn cached_quotes(&self, stock_id: &StockId) -> Result<Vec<QuoteRecord>, SdkError> {
            if self.gated.contains(&stock_id.as_str()) {
                self.gate.notified().await;
            }
            self.cache_pulls.lock().unwrap().push(stock_id.clone());
            Ok(vec![priced(50), priced(49)])
        }
    }

    fn priced(price: i64) -> QuoteRecord {
        QuoteRecord {
            current_price: Some(Decimal::from(price)),
            ..QuoteRecord::default()
        }
    }

    fn push(id: &str, price: i64) -> WsEvent {
        WsEvent::Message(QuoteUpdate::new(StockId::from(id), priced(price)))
    }

    fn spawn_on_local_set(task: LocalBoxFuture<'static, ()>) {
        tokio::task::spawn_local(task);
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn test_pushes_merge_while_a_pull_is_in_flight() {
        LocalSet::new()
            .run_until(async {
                let backend = Rc::new(GatedBackend {
                    gated: vec!["D"],
                    ..GatedBackend::default()
                });
                let sync = LocalSync::new(Rc::clone(&backend), spawn_on_local_set);
                let seen = Rc::new(Cell::new(0));
                let seen_by_callback = Rc::clone(&seen);
                sync.on_change(move |revision| seen_by_callback.set(revision));

                let d = StockId::from("D");
                assert_eq!(sync.open_detail(d.clone()), 1);
                settle().await;

                for price in 101..=105 {
                    sync.handle_ws_event(push("D", price));
                }
                assert_eq!(sync.quote(&d).unwrap().current_price, Some(Decimal::from(105)));

                backend.gate.notify_one();
                settle().await;

                assert_eq!(backend.cache_pulls.lock().unwrap().len(), 1);
                assert_eq!(sync.quote(&d).unwrap().current_price, Some(Decimal::from(105)));
                let session = sync.session();
                let tape = session.tape().unwrap();
                assert_eq!(tape.len(), 7);
                assert_eq!(tape.latest().unwrap().current_price, Some(Decimal::from(105)));
                drop(session);

                assert_eq!(sync.reconcile(), 0);
                assert_eq!(seen.get(), sync.revision());
            })
            .await;
    }

    #[tokio::test]
    async fn test_superseded_search_is_discarded() {
        LocalSet::new()
            .run_until(async {
                let backend = Rc::new(GatedBackend {
                    gated: vec!["slow"],
                    ..GatedBackend::default()
                });
                let sync = LocalSync::new(Rc::clone(&backend), spawn_on_local_set);

                assert!(matches!(sync.open_search("  "), Err(SdkError::Validation(_))));
                sync.open_search("slow").unwrap();
                sync.open_search("fast").unwrap();
                settle().await;
                assert!(sync.quote(&StockId::from("FAST")).is_some());

                backend.gate.notify_one();
                settle().await;

                let session = sync.session();
                assert_eq!(session.tracker().view(), Some(&ViewKey::search("fast")));
                assert!(session.quote(&StockId::from("SLOW")).is_none());
            })
            .await;
    }
}
