//! The request-path orchestrator: normalize, check cache, retrieve, filter,
//! rank, group, and (best-effort) answer — each stage timed and bounded by
//! the configured budget, with a stale-cache fallback when the budget is
//! blown.
//!
//! Lifecycle and concurrency choices are grounded in this workspace's
//! consensus engine: a `Mutex<Option<Receiver>>` taken exactly once on
//! `start`, a background task driven off that receiver, an `AtomicBool`
//! guarding double-start, and a `CancellationToken` that both the
//! background worker and every watcher task select on.

use crate::pipeline::IndexerPipeline;
use dashmap::DashMap;
use spotlight_acl::{ACLEvaluator, PrincipalResolver};
use spotlight_agent::Agent;
use spotlight_cache::{build_cache_key, ResponseCache};
use spotlight_core::{
    ErrNoAgentAnswer, SearchHit, SearchRequest, SearchResponse, SearchTelemetry, SpotlightConfig,
    SpotlightError, SpotlightMetrics,
};
use spotlight_index::IndexEngine;
use spotlight_providers::{ProviderRegistry, SearchProvider, SyncScope};
use spotlight_rank::{Grouper, Ranker};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub struct SpotlightService {
    config: SpotlightConfig,
    engine: Arc<dyn IndexEngine>,
    providers: Arc<ProviderRegistry>,
    resolver: Arc<dyn PrincipalResolver>,
    acl: Arc<dyn ACLEvaluator>,
    agent: Arc<dyn Agent>,
    metrics: Arc<dyn SpotlightMetrics>,

    cache: Arc<ResponseCache>,
    ranker: Ranker,
    grouper: Grouper,
    pipeline: IndexerPipeline,

    refresh_tx: mpsc::Sender<(String, String)>,
    refresh_rx: Mutex<Option<mpsc::Receiver<(String, String)>>>,
    pending_refresh: DashMap<(String, String), ()>,

    watchers_started: DashMap<(String, String), ()>,

    started: AtomicBool,
    cancellation: CancellationToken,
}

impl SpotlightService {
    pub fn new(
        config: SpotlightConfig,
        engine: Arc<dyn IndexEngine>,
        providers: Arc<ProviderRegistry>,
        resolver: Arc<dyn PrincipalResolver>,
        acl: Arc<dyn ACLEvaluator>,
        agent: Arc<dyn Agent>,
        metrics: Arc<dyn SpotlightMetrics>,
    ) -> Arc<Self> {
        let (refresh_tx, refresh_rx) = mpsc::channel(config.refresh_queue.capacity);
        let cache = Arc::new(ResponseCache::new(config.cache.clone()));
        let ranker = Ranker::new(config.ranker);
        let pipeline = IndexerPipeline::new(providers.clone(), engine.clone(), config.indexer.clone());

        Arc::new(Self {
            config,
            engine,
            providers,
            resolver,
            acl,
            agent,
            metrics,
            cache,
            ranker,
            grouper: Grouper::new(),
            pipeline,
            refresh_tx,
            refresh_rx: Mutex::new(Some(refresh_rx)),
            pending_refresh: DashMap::new(),
            watchers_started: DashMap::new(),
            started: AtomicBool::new(false),
            cancellation: CancellationToken::new(),
        })
    }

    /// Takes the refresh-queue receiver and spawns the background worker
    /// that drains it. Returns an error if called more than once.
    pub async fn start(self: &Arc<Self>) -> Result<(), SpotlightError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(SpotlightError::Configuration("service already started".to_string()));
        }

        let receiver = self
            .refresh_rx
            .lock()
            .await
            .take()
            .ok_or_else(|| SpotlightError::Configuration("refresh queue receiver already taken".to_string()))?;

        let worker = Arc::clone(self);
        tokio::spawn(async move { worker.run_refresh_worker(receiver).await });

        info!("spotlight service started");
        Ok(())
    }

    pub async fn stop(&self) {
        self.cancellation.cancel();
        info!("spotlight service stopping");
    }

    /// Runs one search request end-to-end: cache lookup, bounded
    /// retrieval/filter/rank/group/answer pipeline, and a stale-cache
    /// fallback if the pipeline doesn't finish inside the configured
    /// budget.
    pub async fn search(&self, request: SearchRequest) -> Result<SearchResponse, SpotlightError> {
        let started_at = Instant::now();
        let request = request.normalize();
        let cache_key = build_cache_key(&request);

        self.ensure_watchers_started(&request.tenant_id).await;

        if let Some(cached) = self.cache.get(&cache_key) {
            let telemetry = SearchTelemetry {
                cache_hit: true,
                total: started_at.elapsed(),
                ..Default::default()
            };
            self.metrics.on_search(&request.tenant_id, &telemetry);
            return Ok(cached);
        }

        let budget = self.config.search.total_budget;
        match tokio::time::timeout(budget, self.execute_pipeline(&request)).await {
            Ok(Ok((response, mut telemetry))) => {
                telemetry.total = started_at.elapsed();
                if telemetry.total > budget {
                    warn!(tenant_id = %request.tenant_id, elapsed_ms = telemetry.total.as_millis() as u64, "search exceeded latency budget");
                }
                self.cache.put(cache_key, response.clone());
                self.metrics.on_search(&request.tenant_id, &telemetry);
                Ok(response)
            }
            Ok(Err(e)) => Err(e),
            Err(_elapsed) => {
                warn!(tenant_id = %request.tenant_id, "search timed out, attempting stale-cache fallback");
                match self.cache.get_stale(&cache_key) {
                    Some(stale) => {
                        let telemetry = SearchTelemetry {
                            stale: true,
                            total: started_at.elapsed(),
                            ..Default::default()
                        };
                        self.metrics.on_search(&request.tenant_id, &telemetry);
                        Ok(stale)
                    }
                    None => Err(SpotlightError::Timeout(format!(
                        "search exceeded budget of {:?} with no cached fallback available",
                        budget
                    ))),
                }
            }
        }
    }

    async fn execute_pipeline(&self, request: &SearchRequest) -> Result<(SearchResponse, SearchTelemetry), SpotlightError> {
        let mut telemetry = SearchTelemetry::default();

        let t = Instant::now();
        let hits = tokio::time::timeout(self.config.search.engine_timeout, self.engine.search(request))
            .await
            .map_err(|_| SpotlightError::Timeout("engine search".to_string()))??;
        let hits: Vec<SearchHit> = hits
            .into_iter()
            .filter(|hit| hit.document.tenant_id == request.tenant_id)
            .collect();
        telemetry.engine_search = t.elapsed();

        let t = Instant::now();
        let hits = self
            .acl
            .filter(
                self.resolver.as_ref(),
                &request.tenant_id,
                &request.user_id,
                &request.roles,
                &request.permissions,
                hits,
            )
            .await;
        telemetry.acl_filter = t.elapsed();

        let t = Instant::now();
        let ranked = self.ranker.rank(&request.query, hits);
        telemetry.rank = t.elapsed();

        let t = Instant::now();
        let mut response = self.grouper.group(ranked);
        telemetry.group = t.elapsed();

        let t = Instant::now();
        self.attach_agent_answer(request, &mut response).await;
        telemetry.agent = t.elapsed();

        Ok((response, telemetry))
    }

    async fn attach_agent_answer(&self, request: &SearchRequest, response: &mut SearchResponse) {
        let all_hits: Vec<SearchHit> = response
            .navigate
            .iter()
            .chain(response.data.iter())
            .chain(response.knowledge.iter())
            .chain(response.other.iter())
            .cloned()
            .collect();

        let outcome = tokio::time::timeout(self.config.search.agent_timeout, self.agent.answer(&request.query, &all_hits)).await;

        match outcome {
            Ok(Ok(answer)) => response.agent_answer = Some(answer),
            Ok(Err(e)) => {
                if e.downcast_ref::<ErrNoAgentAnswer>().is_none() {
                    warn!(tenant_id = %request.tenant_id, error = %e, "agent failed to produce an answer");
                }
            }
            Err(_) => warn!(tenant_id = %request.tenant_id, "agent timed out"),
        }
    }

    /// Enqueues a full resync for `(tenant_id, language)`, deduplicating
    /// against any refresh already pending for that pair. A full channel
    /// drops the request with a warning rather than blocking the caller.
    pub async fn enqueue_refresh(&self, tenant_id: String, language: String) {
        let key = (tenant_id.clone(), language.clone());
        let depth = self.pending_refresh.len();
        if self.pending_refresh.contains_key(&key) {
            self.metrics.on_queue(&tenant_id, &language, false, depth);
            return;
        }
        self.pending_refresh.insert(key.clone(), ());

        match self.refresh_tx.try_send(key.clone()) {
            Ok(()) => self.metrics.on_queue(&tenant_id, &language, true, depth + 1),
            Err(e) => {
                self.pending_refresh.remove(&key);
                warn!(tenant_id, language, error = %e, "refresh queue full, dropping request");
                self.metrics.on_queue(&tenant_id, &language, false, depth);
            }
        }
    }

    async fn run_refresh_worker(&self, mut receiver: mpsc::Receiver<(String, String)>) {
        loop {
            tokio::select! {
                _ = self.cancellation.cancelled() => {
                    debug!("refresh worker stopping");
                    return;
                }
                next = receiver.recv() => {
                    let Some((tenant_id, language)) = next else { return };
                    self.pending_refresh.remove(&(tenant_id.clone(), language.clone()));

                    let start = Instant::now();
                    match self
                        .pipeline
                        .sync_tenant(&tenant_id, &language, "", spotlight_core::MAX_TOP_K, &SyncScope::default())
                        .await
                    {
                        Ok(count) => {
                            self.cache.invalidate_tenant(&tenant_id);
                            self.metrics.on_reindex(&tenant_id, &language, count, start.elapsed(), false);
                            info!(tenant_id, language, document_count = count, elapsed_ms = start.elapsed().as_millis() as u64, "tenant reindexed");
                        }
                        Err(e) => {
                            self.metrics.on_reindex(&tenant_id, &language, 0, start.elapsed(), true);
                            error!(tenant_id, language, error = %e, "tenant reindex failed");
                        }
                    }
                }
            }
        }
    }

    /// Starts a provider's watch loop for `tenant_id` at most once per
    /// (provider, tenant) pair, the first time a search for that tenant
    /// touches a watch-capable provider.
    async fn ensure_watchers_started(&self, tenant_id: &str) {
        for provider in self.providers.all_sorted().await {
            if !provider.capabilities().supports_watch {
                continue;
            }
            let dedup_key = (provider.id().to_string(), tenant_id.to_string());
            if self.watchers_started.contains_key(&dedup_key) {
                continue;
            }
            self.watchers_started.insert(dedup_key, ());
            self.spawn_watcher(provider, tenant_id.to_string());
        }
    }

    fn spawn_watcher(&self, provider: Arc<dyn SearchProvider>, tenant_id: String) {
        let (tx, mut rx) = mpsc::channel(64);
        let cancellation = self.cancellation.clone();

        let provider_for_watch = provider.clone();
        let watch_tenant = tenant_id.clone();
        tokio::spawn(async move {
            if let Err(e) = provider_for_watch.watch(&watch_tenant, tx).await {
                warn!(provider_id = provider_for_watch.id(), tenant_id = %watch_tenant, error = %e, "provider watch loop ended with an error");
            }
        });

        let engine = self.engine.clone();
        let cache = self.cache.clone();
        let metrics = self.metrics.clone();
        let watch_provider_id = provider.id().to_string();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancellation.cancelled() => return,
                    event = rx.recv() => {
                        let Some(event) = event else { return };
                        let event_type = watch_event_type(&event);
                        let err = apply_watch_event(&engine, event).await.is_err();
                        metrics.on_watch(&watch_provider_id, &tenant_id, event_type, err);
                        cache.invalidate_tenant(&tenant_id);
                    }
                }
            }
        });
    }
}

fn watch_event_type(event: &spotlight_core::DocumentEvent) -> &'static str {
    use spotlight_core::DocumentEvent;
    match event {
        DocumentEvent::Create(_) => "create",
        DocumentEvent::Update(_) => "update",
        DocumentEvent::Delete(_) => "delete",
    }
}

async fn apply_watch_event(engine: &Arc<dyn IndexEngine>, event: spotlight_core::DocumentEvent) -> Result<(), SpotlightError> {
    use spotlight_core::DocumentEvent;
    let result = match event {
        DocumentEvent::Create(doc) | DocumentEvent::Update(doc) => engine.upsert(vec![doc]).await,
        DocumentEvent::Delete(doc_ref) => engine.delete(vec![doc_ref]).await,
    };
    if let Err(e) = &result {
        error!(error = %e, "applying watched document event failed");
    }
    result
}
