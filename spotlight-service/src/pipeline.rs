//! Full-sync indexing: pulls every document a tenant's providers have and
//! upserts them in batches. Providers are visited in sorted-id order so a
//! sync's log output and its retry behavior are deterministic.

use spotlight_core::{IndexerConfig, SpotlightError};
use spotlight_index::IndexEngine;
use spotlight_providers::{ProviderRegistry, SyncScope};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct IndexerPipeline {
    providers: Arc<ProviderRegistry>,
    engine: Arc<dyn IndexEngine>,
    config: IndexerConfig,
}

impl IndexerPipeline {
    pub fn new(providers: Arc<ProviderRegistry>, engine: Arc<dyn IndexEngine>, config: IndexerConfig) -> Self {
        Self { providers, engine, config }
    }

    /// Syncs every registered, not-disabled provider's documents for
    /// `tenant_id`/`language`, narrowed by `query`/`top_k`. A provider that
    /// fails to list its documents is skipped with a warning rather than
    /// aborting the whole sync — one broken provider shouldn't take every
    /// other provider's tenant data offline. Returns the total number of
    /// documents upserted.
    pub async fn sync_tenant(
        &self,
        tenant_id: &str,
        language: &str,
        query: &str,
        top_k: usize,
        scope: &SyncScope,
    ) -> Result<usize, SpotlightError> {
        let mut total = 0usize;

        for provider in self.providers.all_sorted().await {
            if scope.is_disabled(provider.id()) {
                debug!(provider_id = provider.id(), tenant_id, "provider disabled in sync scope, skipping");
                continue;
            }

            let documents = match provider.list_documents(tenant_id, language, query, top_k).await {
                Ok(docs) => docs,
                Err(e) => {
                    warn!(provider_id = provider.id(), tenant_id, error = %e, "provider sync failed, skipping");
                    continue;
                }
            };

            let normalized: Vec<_> = documents
                .into_iter()
                .map(|doc| doc.normalize(tenant_id, provider.id()))
                .collect();

            for batch in normalized.chunks(self.config.batch_size.max(1)) {
                self.engine
                    .upsert(batch.to_vec())
                    .await
                    .map_err(|e| SpotlightError::Indexing(format!("syncing provider '{}': {}", provider.id(), e)))?;
            }

            total += normalized.len();
        }

        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use spotlight_core::{DocumentRef, SearchDocument, SearchHit, SearchRequest};
    use spotlight_providers::{quick_links::{QuickLink, QuickLinksProvider}, Capabilities, SearchProvider};
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct RecordingEngine {
        upserted: Mutex<Vec<SearchDocument>>,
    }

    #[async_trait]
    impl IndexEngine for RecordingEngine {
        async fn upsert(&self, documents: Vec<SearchDocument>) -> Result<(), SpotlightError> {
            self.upserted.lock().unwrap().extend(documents);
            Ok(())
        }
        async fn delete(&self, _refs: Vec<DocumentRef>) -> Result<(), SpotlightError> {
            Ok(())
        }
        async fn search(&self, _request: &SearchRequest) -> Result<Vec<SearchHit>, SpotlightError> {
            Ok(Vec::new())
        }
        async fn health(&self) -> Result<(), SpotlightError> {
            Ok(())
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl SearchProvider for FailingProvider {
        fn id(&self) -> &str {
            "broken"
        }
        fn capabilities(&self) -> Capabilities {
            Capabilities { supports_watch: false, entity_types: vec![] }
        }
        async fn list_documents(
            &self,
            _tenant_id: &str,
            _language: &str,
            _query: &str,
            _top_k: usize,
        ) -> anyhow::Result<Vec<SearchDocument>> {
            anyhow::bail!("upstream unavailable")
        }
    }

    fn link(key: &str) -> QuickLink {
        let mut labels = HashMap::new();
        labels.insert("en".to_string(), key.to_string());
        QuickLink { translation_key: key.to_string(), url: format!("/{}", key), labels }
    }

    #[tokio::test]
    async fn sync_tenant_normalizes_tenant_and_provider_fields() {
        let providers = Arc::new(ProviderRegistry::new());
        providers
            .register(Arc::new(QuickLinksProvider::new(vec![link("billing")])))
            .await
            .unwrap();
        let engine = Arc::new(RecordingEngine { upserted: Mutex::new(Vec::new()) });
        let pipeline = IndexerPipeline::new(providers, engine.clone(), IndexerConfig { batch_size: 500 });

        let count = pipeline.sync_tenant("tenantA", "en", "", 20, &SyncScope::default()).await.unwrap();
        assert_eq!(count, 1);
        let upserted = engine.upserted.lock().unwrap();
        assert_eq!(upserted[0].tenant_id, "tenantA");
        assert_eq!(upserted[0].access.visibility, spotlight_core::Visibility::Public);
    }

    #[tokio::test]
    async fn failing_provider_is_skipped_not_fatal() {
        let providers = Arc::new(ProviderRegistry::new());
        providers.register(Arc::new(FailingProvider)).await.unwrap();
        providers
            .register(Arc::new(QuickLinksProvider::new(vec![link("help")])))
            .await
            .unwrap();
        let engine = Arc::new(RecordingEngine { upserted: Mutex::new(Vec::new()) });
        let pipeline = IndexerPipeline::new(providers, engine.clone(), IndexerConfig { batch_size: 500 });

        let count = pipeline.sync_tenant("tenantA", "en", "", 20, &SyncScope::default()).await.unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn disabled_provider_is_skipped_without_being_called() {
        let providers = Arc::new(ProviderRegistry::new());
        providers.register(Arc::new(FailingProvider)).await.unwrap();
        providers
            .register(Arc::new(QuickLinksProvider::new(vec![link("help")])))
            .await
            .unwrap();
        let engine = Arc::new(RecordingEngine { upserted: Mutex::new(Vec::new()) });
        let pipeline = IndexerPipeline::new(providers, engine.clone(), IndexerConfig { batch_size: 500 });

        let scope = SyncScope { disabled_providers: vec!["broken".to_string()] };
        let count = pipeline.sync_tenant("tenantA", "en", "", 20, &scope).await.unwrap();
        assert_eq!(count, 1);
    }
}
