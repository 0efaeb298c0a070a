//! The `SearchProvider` contract, a concurrent registry of providers, and
//! the built-in `quick_links` provider.
//!
//! Grounded in this workspace's plugin provider/manager pattern (a trait
//! object registered by id into a map, looked up by id at call time), with
//! the map made concurrency-safe via `RwLock` and providers handed out as
//! `Arc<dyn SearchProvider>` so callers don't hold the registry lock while
//! using one.

pub mod quick_links;

use async_trait::async_trait;
use spotlight_core::{DocumentEvent, SearchDocument};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Capabilities {
    pub supports_watch: bool,
    pub entity_types: Vec<String>,
}

/// Scopes a sync to a subset of registered providers. A provider whose id
/// appears in `disabled_providers` is skipped by `IndexerPipeline::sync_tenant`
/// without being asked to list documents.
#[derive(Debug, Clone, Default)]
pub struct SyncScope {
    pub disabled_providers: Vec<String>,
}

impl SyncScope {
    pub fn is_disabled(&self, provider_id: &str) -> bool {
        self.disabled_providers.iter().any(|id| id == provider_id)
    }
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn id(&self) -> &str;
    fn capabilities(&self) -> Capabilities;

    /// Returns the documents this provider contributes for `tenant_id`,
    /// scoped to `language` and narrowed by `query`/`top_k` where the
    /// provider is able to. Static providers (e.g. `quick_links`) ignore
    /// `language`/`query`/`top_k` and always return their full set.
    async fn list_documents(
        &self,
        tenant_id: &str,
        language: &str,
        query: &str,
        top_k: usize,
    ) -> anyhow::Result<Vec<SearchDocument>>;

    /// Streams incremental mutations into `sink` until the provider is
    /// done or the receiver is dropped. Only called when `capabilities()`
    /// reports `supports_watch`.
    async fn watch(&self, tenant_id: &str, sink: mpsc::Sender<DocumentEvent>) -> anyhow::Result<()> {
        let _ = (tenant_id, sink);
        Ok(())
    }
}

#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<HashMap<String, Arc<dyn SearchProvider>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `provider` under its own id. Rejects a duplicate id
    /// rather than silently overwriting the existing registration.
    pub async fn register(&self, provider: Arc<dyn SearchProvider>) -> anyhow::Result<()> {
        let id = provider.id().to_string();
        let mut providers = self.providers.write().await;
        if providers.contains_key(&id) {
            warn!(provider_id = %id, "provider already registered, ignoring duplicate");
            anyhow::bail!("provider '{}' is already registered", id);
        }
        providers.insert(id, provider);
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Option<Arc<dyn SearchProvider>> {
        self.providers.read().await.get(id).cloned()
    }

    /// All registered providers, sorted by id, so callers that need a
    /// deterministic iteration order (the full-sync pipeline) don't have
    /// to sort themselves.
    pub async fn all_sorted(&self) -> Vec<Arc<dyn SearchProvider>> {
        let providers = self.providers.read().await;
        let mut ids: Vec<&String> = providers.keys().collect();
        ids.sort();
        ids.into_iter()
            .filter_map(|id| providers.get(id).cloned())
            .collect()
    }
}
