//! End-to-end tests exercising the full search pipeline: tenant isolation,
//! ACL enforcement, ranking, grouping, and the stale-cache timeout
//! fallback. Uses an in-memory fake engine so no external service is
//! needed.

use crate::service::SpotlightService;
use async_trait::async_trait;
use spotlight_acl::{PrincipalResolver, StrictACLEvaluator};
use spotlight_agent::HeuristicAgent;
use spotlight_core::{
    AccessPolicy, CacheConfig, DocumentRef, NoopMetrics, Principal, SearchConfig, SearchDocument,
    SearchHit, SearchRequest, SpotlightConfig, SpotlightError, Visibility,
};
use spotlight_index::IndexEngine;
use spotlight_providers::ProviderRegistry;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

struct FakeEngine {
    documents: StdMutex<Vec<SearchDocument>>,
    delay: StdMutex<Duration>,
}

impl FakeEngine {
    fn new(documents: Vec<SearchDocument>) -> Self {
        Self {
            documents: StdMutex::new(documents),
            delay: StdMutex::new(Duration::ZERO),
        }
    }

    fn with_delay(documents: Vec<SearchDocument>, delay: Duration) -> Self {
        Self {
            documents: StdMutex::new(documents),
            delay: StdMutex::new(delay),
        }
    }
}

#[async_trait]
impl IndexEngine for FakeEngine {
    async fn upsert(&self, documents: Vec<SearchDocument>) -> Result<(), SpotlightError> {
        self.documents.lock().unwrap().extend(documents);
        Ok(())
    }

    async fn delete(&self, refs: Vec<DocumentRef>) -> Result<(), SpotlightError> {
        let mut docs = self.documents.lock().unwrap();
        docs.retain(|d| !refs.iter().any(|r| r.tenant_id == d.tenant_id && r.id == d.id));
        Ok(())
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, SpotlightError> {
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let query = request.query.to_lowercase();
        let docs = self.documents.lock().unwrap();
        Ok(docs
            .iter()
            .filter(|doc| doc.tenant_id == request.tenant_id)
            .filter(|doc| query.is_empty() || doc.title.to_lowercase().contains(&query) || doc.body.to_lowercase().contains(&query))
            .map(|doc| SearchHit {
                document: doc.clone(),
                lexical_score: 0.5,
                vector_score: 0.0,
                final_score: 0.5,
                why_matched: "lexical".to_string(),
            })
            .collect())
    }

    async fn health(&self) -> Result<(), SpotlightError> {
        Ok(())
    }
}

struct StaticResolver(Principal);

#[async_trait]
impl PrincipalResolver for StaticResolver {
    async fn resolve(&self, _tenant_id: &str, _user_id: &str) -> anyhow::Result<Principal> {
        Ok(self.0.clone())
    }
}

fn doc(tenant_id: &str, id: &str, title: &str, entity_type: &str, access: AccessPolicy) -> SearchDocument {
    SearchDocument {
        id: id.to_string(),
        tenant_id: tenant_id.to_string(),
        provider: "test".to_string(),
        entity_type: entity_type.to_string(),
        title: title.to_string(),
        body: String::new(),
        url: format!("/{}", id),
        language: "en".to_string(),
        metadata: HashMap::new(),
        updated_at: chrono::Utc::now(),
        embedding: None,
        access,
    }
}

fn make_service(engine: Arc<dyn IndexEngine>, principal: Principal, config: SpotlightConfig) -> Arc<SpotlightService> {
    SpotlightService::new(
        config,
        engine,
        Arc::new(ProviderRegistry::new()),
        Arc::new(StaticResolver(principal)),
        Arc::new(StrictACLEvaluator),
        Arc::new(HeuristicAgent),
        Arc::new(NoopMetrics),
    )
}

fn request(tenant_id: &str, user_id: &str, query: &str) -> SearchRequest {
    SearchRequest {
        query: query.to_string(),
        tenant_id: tenant_id.to_string(),
        user_id: user_id.to_string(),
        roles: vec![],
        permissions: vec![],
        top_k: 20,
        intent: Default::default(),
        language: "en".to_string(),
        filters: HashMap::new(),
        query_embedding: None,
    }
}

#[tokio::test]
async fn tenant_isolation_hides_other_tenants_documents() {
    let engine = Arc::new(FakeEngine::new(vec![
        doc("tenantA", "1", "Users", "route", AccessPolicy::public()),
        doc("tenantB", "2", "Users", "route", AccessPolicy::public()),
    ]));
    let service = make_service(engine, Principal::default(), SpotlightConfig::default());

    let response = service.search(request("tenantA", "alice", "users")).await.unwrap();
    let all_ids: Vec<String> = response
        .navigate
        .iter()
        .map(|h| h.document.id.clone())
        .collect();
    assert_eq!(all_ids, vec!["1".to_string()]);
}

#[tokio::test]
async fn restricted_visible_only_to_matching_role() {
    let access = AccessPolicy {
        visibility: Visibility::Restricted,
        owner_id: None,
        allowed_users: vec![],
        allowed_roles: vec!["billing-admin".to_string()],
        allowed_permissions: vec![],
    };
    let engine = Arc::new(FakeEngine::new(vec![doc("tenantA", "1", "Invoices", "route", access)]));

    let with_role = make_service(
        engine.clone(),
        Principal { user_id: "alice".into(), roles: vec!["billing-admin".into()], permissions: vec![] },
        SpotlightConfig::default(),
    );
    let response = with_role.search(request("tenantA", "alice", "invoices")).await.unwrap();
    assert_eq!(response.navigate.len(), 1);

    let without_role = make_service(
        engine,
        Principal { user_id: "bob".into(), roles: vec!["viewer".into()], permissions: vec![] },
        SpotlightConfig::default(),
    );
    let response = without_role.search(request("tenantA", "bob", "invoices")).await.unwrap();
    assert_eq!(response.navigate.len(), 0);
}

#[tokio::test]
async fn owner_only_visible_to_owning_user() {
    let engine = Arc::new(FakeEngine::new(vec![doc(
        "tenantA",
        "1",
        "My Draft",
        "entity",
        AccessPolicy::owned_by("alice"),
    )]));

    let owner = make_service(
        engine.clone(),
        Principal { user_id: "alice".into(), roles: vec![], permissions: vec![] },
        SpotlightConfig::default(),
    );
    let response = owner.search(request("tenantA", "alice", "draft")).await.unwrap();
    assert_eq!(response.data.len(), 1);

    let stranger = make_service(
        engine,
        Principal { user_id: "mallory".into(), roles: vec![], permissions: vec![] },
        SpotlightConfig::default(),
    );
    let response = stranger.search(request("tenantA", "mallory", "draft")).await.unwrap();
    assert_eq!(response.data.len(), 0);
}

#[tokio::test]
async fn results_are_grouped_into_expected_buckets() {
    let engine = Arc::new(FakeEngine::new(vec![
        doc("tenantA", "1", "Dashboard link", "route", AccessPolicy::public()),
        doc("tenantA", "2", "Dashboard record", "user", AccessPolicy::public()),
        doc("tenantA", "3", "Dashboard article", "kb", AccessPolicy::public()),
        doc("tenantA", "4", "Dashboard misc", "widget", AccessPolicy::public()),
    ]));
    let service = make_service(engine, Principal::default(), SpotlightConfig::default());

    let response = service.search(request("tenantA", "alice", "dashboard")).await.unwrap();
    assert_eq!(response.navigate.len(), 1);
    assert_eq!(response.data.len(), 1);
    assert_eq!(response.knowledge.len(), 1);
    assert_eq!(response.other.len(), 1);
}

#[tokio::test]
async fn timeout_falls_back_to_stale_cache() {
    let engine = Arc::new(FakeEngine::new(vec![doc(
        "tenantA",
        "1",
        "Users",
        "route",
        AccessPolicy::public(),
    )]));

    let mut config = SpotlightConfig::default();
    config.search = SearchConfig {
        total_budget: Duration::from_millis(200),
        engine_timeout: Duration::from_millis(150),
        agent_timeout: Duration::from_millis(150),
    };
    config.cache = CacheConfig { ttl: Duration::from_secs(5), capacity: 64 };

    let service = make_service(engine.clone(), Principal::default(), config);

    let first = service.search(request("tenantA", "alice", "users")).await.unwrap();
    assert_eq!(first.navigate.len(), 1);

    // Same cache key, but the engine now takes far longer than the
    // configured budget — the pipeline should time out and the service
    // should fall back to the response it just cached.
    *engine.delay.lock().unwrap() = Duration::from_millis(500);

    let second = service.search(request("tenantA", "alice", "users")).await.unwrap();
    assert_eq!(second.navigate.len(), 1);
}

#[tokio::test]
async fn timeout_without_a_cached_response_is_an_error() {
    let engine = Arc::new(FakeEngine::with_delay(
        vec![doc("tenantA", "1", "Users", "route", AccessPolicy::public())],
        Duration::from_millis(500),
    ));
    let mut config = SpotlightConfig::default();
    config.search = SearchConfig {
        total_budget: Duration::from_millis(20),
        engine_timeout: Duration::from_millis(500),
        agent_timeout: Duration::from_millis(500),
    };
    let service = make_service(engine, Principal::default(), config);

    let result = service.search(request("tenantA", "alice", "users")).await;
    assert!(matches!(result, Err(SpotlightError::Timeout(_))));
}
