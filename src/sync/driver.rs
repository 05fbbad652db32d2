//! Native session driver.
//!
//! A single background task owns the [`WsClient`] and is the only writer
//! of the shared [`QuoteSession`]. Backend calls run as in-flight futures
//! polled by the same loop, so merges land in delivery order and the loop
//! never blocks on I/O. Readers take the read lock or watch the revision
//! counter.

use std::sync::Arc;
use std::time::Duration;

use async_lock::RwLock;
use futures_util::future::{join_all, BoxFuture};
use futures_util::stream::FuturesUnordered;
use futures_util::{FutureExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::backend::SyncBackend;
use super::reconciler::{self, FallbackOutcome, FallbackRequest};
use super::{collect_baselines, QuoteSession};
use crate::domain::interest::ViewKey;
use crate::domain::quote::QuoteRecord;
use crate::domain::search::SearchQuery;
use crate::error::SdkError;
use crate::shared::StockId;
use crate::ws::native::WsClient;

enum Command {
    OpenSearch(SearchQuery),
    OpenDetail(StockId),
    Reconcile,
    Shutdown,
}

enum Completion {
    Resolved {
        generation: u64,
        query: SearchQuery,
        result: Result<Vec<StockId>, SdkError>,
    },
    Baselines {
        generation: u64,
        results: Vec<(StockId, Result<QuoteRecord, SdkError>)>,
    },
    Fallback(FallbackOutcome),
}

/// Handle to a running session driver.
pub struct QuoteSync {
    session: Arc<RwLock<QuoteSession>>,
    cmd_tx: mpsc::Sender<Command>,
    revision: watch::Receiver<u64>,
    task: Option<JoinHandle<()>>,
}

impl QuoteSync {
    /// Connect the feed and start the driver task.
    pub async fn start<B>(backend: Arc<B>, mut ws: WsClient) -> Result<Self, SdkError>
    where
        B: SyncBackend + Send + Sync + 'static,
    {
        ws.connect().await?;

        let session = Arc::new(RwLock::new(QuoteSession::new()));
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let (revision_tx, revision) = watch::channel(0u64);

        let actor = Actor {
            backend,
            session: Arc::clone(&session),
            revision_tx,
            generation: 0,
            inflight: FuturesUnordered::new(),
        };
        let task = tokio::spawn(actor.run(ws, cmd_rx));

        Ok(Self {
            session,
            cmd_tx,
            revision,
            task: Some(task),
        })
    }

    /// Navigate to a search view. Blank queries are rejected here.
    pub async fn open_search(&self, query: &str) -> Result<(), SdkError> {
        let query = SearchQuery::parse(query)?;
        self.send(Command::OpenSearch(query)).await
    }

    /// Navigate to the detail view of one instrument.
    pub async fn open_detail(&self, stock_id: impl Into<StockId>) -> Result<(), SdkError> {
        self.send(Command::OpenDetail(stock_id.into())).await
    }

    /// Run a fallback pass for the current interest set.
    pub async fn reconcile(&self) -> Result<(), SdkError> {
        self.send(Command::Reconcile).await
    }

    /// Snapshot of one quote.
    pub async fn quote(&self, stock_id: &StockId) -> Option<QuoteRecord> {
        self.session.read().await.quote(stock_id).cloned()
    }

    /// Shared session for read access.
    pub fn session(&self) -> Arc<RwLock<QuoteSession>> {
        Arc::clone(&self.session)
    }

    /// Revision counter bumped after every state change.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.revision.clone()
    }

    /// Stop the driver and close the feed.
    pub async fn shutdown(mut self) {
        let _ = self.cmd_tx.send(Command::Shutdown).await;
        if let Some(task) = self.task.take() {
            if tokio::time::timeout(Duration::from_secs(5), task).await.is_err() {
                tracing::warn!("Quote sync task did not stop within 5s");
            }
        }
    }

    async fn send(&self, command: Command) -> Result<(), SdkError> {
        self.cmd_tx
            .send(command)
            .await
            .map_err(|_| SdkError::Other("quote sync task has stopped".into()))
    }
}

impl Drop for QuoteSync {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ─── Actor ───────────────────────────────────────────────────────────────────

struct Actor<B> {
    backend: Arc<B>,
    session: Arc<RwLock<QuoteSession>>,
    revision_tx: watch::Sender<u64>,
    /// Bumped on every navigation; stale search/baseline results are dropped.
    generation: u64,
    inflight: FuturesUnordered<BoxFuture<'static, Completion>>,
}

impl<B> Actor<B>
where
    B: SyncBackend + Send + Sync + 'static,
{
    async fn run(mut self, mut ws: WsClient, mut cmd_rx: mpsc::Receiver<Command>) {
        tracing::info!("Quote sync started");
        loop {
            tokio::select! {
                event = ws.next_event() => {
                    let Some(event) = event else { break };
                    let changed = self.session.write().await.handle_ws_event(event);
                    if changed {
                        self.bump();
                    }
                }
                cmd = cmd_rx.recv() => match cmd {
                    Some(Command::OpenSearch(query)) => self.open_search(query),
                    Some(Command::OpenDetail(stock_id)) => self.open_detail(stock_id).await,
                    Some(Command::Reconcile) => self.plan_fallbacks().await,
                    Some(Command::Shutdown) | None => break,
                },
                Some(done) = self.inflight.next(), if !self.inflight.is_empty() => {
                    self.complete(done).await;
                }
            }
        }

        if let Err(e) = ws.disconnect().await {
            tracing::warn!("Feed disconnect failed: {}", e);
        }
        tracing::info!("Quote sync stopped");
    }

    fn bump(&self) {
        self.revision_tx.send_modify(|revision| *revision += 1);
    }

    fn open_search(&mut self, query: SearchQuery) {
        self.generation += 1;
        let generation = self.generation;
        let backend = Arc::clone(&self.backend);
        self.inflight.push(
            async move {
                let result = backend.resolve_search(&query).await;
                Completion::Resolved {
                    generation,
                    query,
                    result,
                }
            }
            .boxed(),
        );
    }

    async fn open_detail(&mut self, stock_id: StockId) {
        self.generation += 1;
        let ids = vec![stock_id.clone()];
        self.session
            .write()
            .await
            .declare_interest(ViewKey::detail(stock_id), ids.clone());
        self.bump();
        self.register(ids);
        self.plan_fallbacks().await;
    }

    async fn complete(&mut self, done: Completion) {
        match done {
            Completion::Resolved {
                generation,
                query,
                result,
            } => {
                if generation != self.generation {
                    tracing::debug!(%query, "Discarding superseded search result");
                    return;
                }
                let stock_ids = match result {
                    Ok(ids) => ids,
                    Err(e) => {
                        tracing::warn!(%query, "Search resolution failed: {}", e);
                        Vec::new()
                    }
                };
                self.session
                    .write()
                    .await
                    .declare_interest(ViewKey::search(query.as_str()), stock_ids.clone());
                self.bump();
                self.register(stock_ids.clone());
                self.pull_baselines(generation, stock_ids);
            }
            Completion::Baselines {
                generation,
                results,
            } => {
                if generation != self.generation {
                    tracing::debug!("Discarding superseded baseline pulls");
                    return;
                }
                self.session
                    .write()
                    .await
                    .seed_baseline(collect_baselines(results));
                self.bump();
                self.plan_fallbacks().await;
            }
            Completion::Fallback(outcome) => {
                if self.session.write().await.apply_fallback(outcome) {
                    self.bump();
                }
            }
        }
    }

    /// Fire-and-forget subscription update.
    fn register(&self, stock_ids: Vec<StockId>) {
        let backend = Arc::clone(&self.backend);
        tokio::spawn(async move {
            if let Err(e) = backend.register_interest(&stock_ids).await {
                tracing::warn!("Subscription registration failed: {}", e);
            }
        });
    }

    fn pull_baselines(&mut self, generation: u64, stock_ids: Vec<StockId>) {
        let backend = Arc::clone(&self.backend);
        self.inflight.push(
            async move {
                let results = join_all(stock_ids.into_iter().map(|stock_id| {
                    let backend = Arc::clone(&backend);
                    async move {
                        let result = backend.baseline_quote(&stock_id).await;
                        (stock_id, result)
                    }
                }))
                .await;
                Completion::Baselines {
                    generation,
                    results,
                }
            }
            .boxed(),
        );
    }

    async fn plan_fallbacks(&mut self) {
        let requests = self.session.write().await.plan_fallbacks();
        for request in requests {
            self.pull_fallback(request);
        }
    }

    fn pull_fallback(&mut self, request: FallbackRequest) {
        let backend = Arc::clone(&self.backend);
        self.inflight.push(
            async move { Completion::Fallback(reconciler::pull(backend.as_ref(), request).await) }
                .boxed(),
        );
    }
}
