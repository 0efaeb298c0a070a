//! An `IndexEngine` backed by an external HTTP search service (e.g. a
//! hosted Meilisearch/Typesense-style index). Grounded in this workspace's
//! JSON-RPC client pattern for external chain nodes: a `reqwest::Client`
//! built once with a fixed timeout, requests built with `serde_json::json!`
//! and parsed back into typed structs.

use crate::IndexEngine;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use spotlight_core::{DocumentRef, SearchDocument, SearchHit, SearchRequest, SpotlightError};
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};

/// Index schema applied once per tenant before its first write: which
/// fields can be filtered on, searched over, and sorted by.
const FILTERABLE_FIELDS: &[&str] = &["tenant_id", "provider", "entity_type"];
const SEARCHABLE_FIELDS: &[&str] = &["title", "body"];
const SORTABLE_FIELDS: &[&str] = &["updated_at"];

pub struct RemoteSearchEngine {
    base_url: String,
    client: reqwest::Client,
    /// Tenants whose index schema has already been provisioned this
    /// process lifetime, so repeated upserts don't re-issue the setup
    /// call every time.
    ensured_tenants: Mutex<HashSet<String>>,
}

impl RemoteSearchEngine {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SpotlightError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SpotlightError::Configuration(format!("building HTTP client: {}", e)))?;
        Ok(Self {
            base_url: base_url.into(),
            client,
            ensured_tenants: Mutex::new(HashSet::new()),
        })
    }

    async fn ensure_index(&self, tenant_id: &str) -> Result<(), SpotlightError> {
        {
            let ensured = self.ensured_tenants.lock().unwrap();
            if ensured.contains(tenant_id) {
                return Ok(());
            }
        }

        let schema = IndexSchemaRequest {
            filterable_attributes: FILTERABLE_FIELDS.iter().map(|s| s.to_string()).collect(),
            searchable_attributes: SEARCHABLE_FIELDS.iter().map(|s| s.to_string()).collect(),
            sortable_attributes: SORTABLE_FIELDS.iter().map(|s| s.to_string()).collect(),
        };

        let url = format!("{}/indexes/{}/settings", self.base_url, index_name(tenant_id));
        self.client
            .patch(&url)
            .json(&schema)
            .send()
            .await
            .map_err(|e| SpotlightError::Indexing(format!("provisioning index schema: {}", e)))?
            .error_for_status()
            .map_err(|e| SpotlightError::Indexing(format!("index schema rejected: {}", e)))?;

        self.ensured_tenants.lock().unwrap().insert(tenant_id.to_string());
        debug!(tenant_id, "provisioned remote index schema");
        Ok(())
    }
}

#[async_trait]
impl IndexEngine for RemoteSearchEngine {
    async fn upsert(&self, documents: Vec<SearchDocument>) -> Result<(), SpotlightError> {
        if documents.is_empty() {
            return Ok(());
        }
        let tenant_id = documents[0].tenant_id.clone();
        self.ensure_index(&tenant_id).await?;

        let payload: Vec<RemoteDocument> = documents.iter().map(RemoteDocument::from_document).collect();
        let url = format!("{}/indexes/{}/documents", self.base_url, index_name(&tenant_id));
        self.client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| SpotlightError::Indexing(format!("upserting documents: {}", e)))?
            .error_for_status()
            .map_err(|e| SpotlightError::Indexing(format!("remote engine rejected upsert: {}", e)))?;
        Ok(())
    }

    async fn delete(&self, refs: Vec<DocumentRef>) -> Result<(), SpotlightError> {
        if refs.is_empty() {
            return Ok(());
        }
        let tenant_id = refs[0].tenant_id.clone();
        let keys: Vec<String> = refs.iter().map(|r| sanitized_key(&r.tenant_id, &r.id)).collect();
        let url = format!("{}/indexes/{}/documents/delete-batch", self.base_url, index_name(&tenant_id));
        self.client
            .post(&url)
            .json(&keys)
            .send()
            .await
            .map_err(|e| SpotlightError::Indexing(format!("deleting documents: {}", e)))?
            .error_for_status()
            .map_err(|e| SpotlightError::Indexing(format!("remote engine rejected delete: {}", e)))?;
        Ok(())
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, SpotlightError> {
        let mut filter = format!("tenant_id = \"{}\"", request.tenant_id);
        for (key, value) in &request.filters {
            filter.push_str(&format!(" AND {} = \"{}\"", key, value));
        }

        let body = RemoteSearchRequest {
            q: request.query.clone(),
            filter,
            limit: request.top_k_usize(),
        };

        let url = format!("{}/indexes/{}/search", self.base_url, index_name(&request.tenant_id));
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| SpotlightError::Indexing(format!("remote search request: {}", e)))?
            .error_for_status()
            .map_err(|e| SpotlightError::Indexing(format!("remote engine rejected search: {}", e)))?
            .json::<RemoteSearchResponse>()
            .await
            .map_err(|e| SpotlightError::Indexing(format!("decoding remote search response: {}", e)))?;

        Ok(response.hits.into_iter().map(RemoteHit::into_search_hit).collect())
    }

    async fn health(&self) -> Result<(), SpotlightError> {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => Ok(()),
            Ok(resp) => Err(SpotlightError::Indexing(format!("remote engine unhealthy: {}", resp.status()))),
            Err(e) => {
                warn!(error = %e, "remote engine health check failed");
                Err(SpotlightError::Indexing(format!("health check: {}", e)))
            }
        }
    }
}

/// Index name derived from the tenant id, sanitized to the character set
/// most HTTP search services require for an index/collection name.
fn index_name(tenant_id: &str) -> String {
    sanitize(tenant_id)
}

/// A document key unique across tenants, sanitized to the safe character
/// set most HTTP search services require for a primary key.
fn sanitized_key(tenant_id: &str, id: &str) -> String {
    sanitize(&format!("{}__{}", tenant_id, id))
}

fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

#[derive(Debug, Serialize)]
struct IndexSchemaRequest {
    filterable_attributes: Vec<String>,
    searchable_attributes: Vec<String>,
    sortable_attributes: Vec<String>,
}

#[derive(Debug, Serialize)]
struct RemoteDocument {
    id: String,
    tenant_id: String,
    provider: String,
    entity_type: String,
    title: String,
    body: String,
    url: String,
    updated_at: i64,
}

impl RemoteDocument {
    fn from_document(doc: &SearchDocument) -> Self {
        Self {
            id: sanitized_key(&doc.tenant_id, &doc.id),
            tenant_id: doc.tenant_id.clone(),
            provider: doc.provider.clone(),
            entity_type: doc.entity_type.clone(),
            title: doc.title.clone(),
            body: doc.body.clone(),
            url: doc.url.clone(),
            updated_at: doc.updated_at.timestamp(),
        }
    }
}

#[derive(Debug, Serialize)]
struct RemoteSearchRequest {
    q: String,
    filter: String,
    limit: usize,
}

#[derive(Debug, Deserialize)]
struct RemoteSearchResponse {
    hits: Vec<RemoteHit>,
}

#[derive(Debug, Deserialize)]
struct RemoteHit {
    #[serde(flatten)]
    document: RemoteHitDocument,
    #[serde(rename = "_score", default)]
    score: f32,
}

#[derive(Debug, Deserialize)]
struct RemoteHitDocument {
    id: String,
    tenant_id: String,
    provider: String,
    entity_type: String,
    title: String,
    body: String,
    url: String,
    updated_at: i64,
}

impl RemoteHit {
    fn into_search_hit(self) -> SearchHit {
        use chrono::{TimeZone, Utc};
        SearchHit {
            document: SearchDocument {
                id: self.document.id,
                tenant_id: self.document.tenant_id,
                provider: self.document.provider,
                entity_type: self.document.entity_type,
                title: self.document.title,
                body: self.document.body,
                url: self.document.url,
                language: String::new(),
                metadata: Default::default(),
                updated_at: Utc.timestamp_opt(self.document.updated_at, 0).single().unwrap_or_else(Utc::now),
                embedding: None,
                access: spotlight_core::AccessPolicy::public(),
            },
            lexical_score: self.score,
            vector_score: 0.0,
            final_score: self.score,
            why_matched: "remote-engine".into(),
        }
    }
}
