//! # Spotlight Data Model
//!
//! Shared types for the spotlight search subsystem: the indexed document
//! shape, its access policy, the events that mutate it, and the request/
//! response pair the search service exchanges with callers.
//!
//! These types are intentionally dumb data — no behavior lives here beyond
//! small constructors and the normalization helpers every producer of a
//! `SearchDocument` is expected to call before handing one to an engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single unit of indexed content, scoped to exactly one tenant.
///
/// Identity for hashing and upsert purposes is always the pair
/// `(tenant_id, id)` — `id` alone is only unique within a tenant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchDocument {
    /// Unique within `tenant_id`.
    pub id: String,
    pub tenant_id: String,
    /// Producer id, e.g. `"quick_links"`.
    pub provider: String,
    /// Free-form tag the grouper buckets on (route, kb, user, ...).
    pub entity_type: String,
    pub title: String,
    pub body: String,
    pub url: String,
    pub language: String,
    pub metadata: HashMap<String, String>,
    pub updated_at: DateTime<Utc>,
    /// Fixed-dimension dense vector, absent when the provider has no
    /// embedding pipeline.
    pub embedding: Option<Vec<f32>>,
    pub access: AccessPolicy,
}

impl SearchDocument {
    /// Normalizes a document the way every code path that persists one
    /// must before calling `IndexEngine::upsert` (pipeline, outbox,
    /// provider watcher): overwrites `tenant_id`/`provider` from the
    /// current scope, fills `updated_at` if unset, and fills in a
    /// visibility if the caller left the access policy default.
    pub fn normalize(mut self, tenant_id: &str, provider: &str) -> Self {
        self.tenant_id = tenant_id.to_string();
        self.provider = provider.to_string();
        if self.updated_at.timestamp() == 0 {
            self.updated_at = Utc::now();
        }
        self
    }

    /// Identity used for upsert/delete addressing.
    pub fn document_ref(&self) -> DocumentRef {
        DocumentRef {
            tenant_id: self.tenant_id.clone(),
            id: self.id.clone(),
        }
    }
}

/// `(tenant_id, id)` — the addressing key for deletion. `id` is unique only
/// within a tenant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct DocumentRef {
    pub tenant_id: String,
    pub id: String,
}

/// Access control policy attached to every indexed document.
///
/// Cross-tenant access is never permitted regardless of this policy — that
/// check happens one level up, on `tenant_id` equality, before this policy
/// is even consulted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessPolicy {
    pub visibility: Visibility,
    pub owner_id: Option<String>,
    pub allowed_users: Vec<String>,
    pub allowed_roles: Vec<String>,
    pub allowed_permissions: Vec<String>,
}

impl Default for AccessPolicy {
    /// Defaults to `Restricted` with no grants — the least permissive
    /// policy, matching the normalization rule that an unset visibility
    /// becomes `restricted` rather than `public`.
    fn default() -> Self {
        Self {
            visibility: Visibility::Restricted,
            owner_id: None,
            allowed_users: Vec::new(),
            allowed_roles: Vec::new(),
            allowed_permissions: Vec::new(),
        }
    }
}

impl AccessPolicy {
    pub fn public() -> Self {
        Self {
            visibility: Visibility::Public,
            ..Default::default()
        }
    }

    pub fn owned_by(owner_id: impl Into<String>) -> Self {
        Self {
            visibility: Visibility::Owner,
            owner_id: Some(owner_id.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Owner,
    Restricted,
}

/// A mutation to apply to the index, as emitted by a provider watcher or
/// decoded from an outbox row payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DocumentEvent {
    Create(SearchDocument),
    Update(SearchDocument),
    Delete(DocumentRef),
}

/// Query intent, used to bias downstream grouping/agent behavior. Always
/// normalized to a concrete value — `mixed` is the default.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Navigate,
    Entity,
    Help,
    #[default]
    Mixed,
}

/// An incoming search request. `normalize()` must be called before this is
/// used for cache-key derivation or handed to the engine; the service does
/// this exactly once, at the top of the request path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub tenant_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub top_k: i64,
    #[serde(default)]
    pub intent: Intent,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub filters: HashMap<String, String>,
    #[serde(default)]
    pub query_embedding: Option<Vec<f32>>,
}

pub const DEFAULT_TOP_K: usize = 20;
pub const MAX_TOP_K: usize = 100;

impl SearchRequest {
    /// Trims the query, clamps `top_k` to `[1, 100]` (defaulting to 20 when
    /// `<= 0`), and deduplicates-and-sorts `roles`/`permissions`
    /// (case-sensitive, empty strings dropped).
    pub fn normalize(mut self) -> Self {
        self.query = self.query.trim().to_string();

        self.top_k = if self.top_k <= 0 {
            DEFAULT_TOP_K as i64
        } else {
            self.top_k.clamp(1, MAX_TOP_K as i64)
        };

        self.roles = dedup_sorted(self.roles);
        self.permissions = dedup_sorted(self.permissions);

        self
    }

    pub fn top_k_usize(&self) -> usize {
        self.top_k as usize
    }
}

fn dedup_sorted(mut values: Vec<String>) -> Vec<String> {
    values.retain(|v| !v.is_empty());
    values.sort();
    values.dedup();
    values
}

/// A single retrieved hit, carrying the component scores that produced its
/// final ranking position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub document: SearchDocument,
    pub lexical_score: f32,
    pub vector_score: f32,
    pub final_score: f32,
    /// Diagnostic string describing which retrieval path produced this hit
    /// (e.g. `"lexical+vector"`, `"lexical"`, `"lexical-fallback"`).
    pub why_matched: String,
}

/// The grouped, access-filtered, ranked result of a search, plus an
/// optional agent-generated answer.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SearchResponse {
    pub navigate: Vec<SearchHit>,
    pub data: Vec<SearchHit>,
    pub knowledge: Vec<SearchHit>,
    pub other: Vec<SearchHit>,
    pub agent_answer: Option<AgentAnswer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentAnswer {
    pub summary: String,
    pub citations: Vec<String>,
    pub actions: Vec<SuggestedAction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestedAction {
    pub label: String,
    pub url: String,
}

/// The authenticated requester, resolved either directly from the request
/// (when it already carries `user_id`/`roles`/`permissions`) or via a
/// `PrincipalResolver`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Principal {
    pub user_id: String,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

/// Per-request stage timings and cache/staleness flags, handed to the
/// `OnSearch` metrics hook and logged at `warn` level when `total` exceeds
/// the configured budget.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchTelemetry {
    pub engine_search: std::time::Duration,
    pub acl_filter: std::time::Duration,
    pub rank: std::time::Duration,
    pub group: std::time::Duration,
    pub agent: std::time::Duration,
    pub total: std::time::Duration,
    pub cache_hit: bool,
    pub stale: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_clamps_top_k_and_defaults_zero() {
        let req = SearchRequest {
            query: "  users  ".into(),
            tenant_id: "t1".into(),
            user_id: String::new(),
            roles: vec![],
            permissions: vec![],
            top_k: 0,
            intent: Intent::Mixed,
            language: String::new(),
            filters: HashMap::new(),
            query_embedding: None,
        }
        .normalize();
        assert_eq!(req.query, "users");
        assert_eq!(req.top_k, DEFAULT_TOP_K as i64);
    }

    #[test]
    fn normalize_clamps_top_k_upper_bound() {
        let req = SearchRequest {
            query: "x".into(),
            tenant_id: "t1".into(),
            user_id: String::new(),
            roles: vec![],
            permissions: vec![],
            top_k: 5000,
            intent: Intent::Mixed,
            language: String::new(),
            filters: HashMap::new(),
            query_embedding: None,
        }
        .normalize();
        assert_eq!(req.top_k, MAX_TOP_K as i64);
    }

    #[test]
    fn normalize_dedupes_and_sorts_roles() {
        let req = SearchRequest {
            query: "x".into(),
            tenant_id: "t1".into(),
            user_id: String::new(),
            roles: vec!["viewer".into(), "admin".into(), "viewer".into(), "".into()],
            permissions: vec![],
            top_k: 1,
            intent: Intent::Mixed,
            language: String::new(),
            filters: HashMap::new(),
            query_embedding: None,
        }
        .normalize();
        assert_eq!(req.roles, vec!["admin".to_string(), "viewer".to_string()]);
    }

    #[test]
    fn document_normalize_backfills_tenant_and_provider() {
        let doc = SearchDocument {
            id: "1".into(),
            tenant_id: "wrong".into(),
            provider: "wrong".into(),
            entity_type: "route".into(),
            title: "Users".into(),
            body: String::new(),
            url: String::new(),
            language: "en".into(),
            metadata: HashMap::new(),
            updated_at: DateTime::from_timestamp(0, 0).unwrap(),
            embedding: None,
            access: AccessPolicy::default(),
        }
        .normalize("tenantA", "quick_links");
        assert_eq!(doc.tenant_id, "tenantA");
        assert_eq!(doc.provider, "quick_links");
        assert!(doc.updated_at.timestamp() > 0);
    }
}
