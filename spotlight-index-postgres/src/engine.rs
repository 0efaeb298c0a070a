//! Hybrid lexical + vector search against `spotlight_documents`, with
//! access-control predicates pushed into the `WHERE` clause rather than
//! filtered after the fact — the same row-to-struct idiom as this
//! workspace's tenant manager (`row.try_get` plus `serde_json::from_value`
//! for JSONB columns), generalized to a query that also does ranking.

use crate::schema::{ensure_documents_schema, preflight};
use async_trait::async_trait;
use serde_json::Value;
use spotlight_core::{
    AccessPolicy, DocumentRef, RankerConfig, SearchDocument, SearchHit, SearchRequest, SpotlightError,
    Visibility,
};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use tracing::{debug, warn};

use spotlight_index::IndexEngine;

/// Which query path produced a hit, and whether it carries a vector score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueryPath {
    Primary,
    Fallback,
}

impl QueryPath {
    fn why_matched(self, has_embedding: bool) -> &'static str {
        match (self, has_embedding) {
            (QueryPath::Primary, true) => "lexical+vector",
            (QueryPath::Primary, false) => "lexical",
            (QueryPath::Fallback, _) => "lexical-fallback",
        }
    }
}

/// ACL predicate shared by both the BM25 and the fallback query. Binds
/// `$4` (user id), `$5` (roles), `$6` (permissions) in addition to the
/// query-specific `$1`-`$3`.
const ACL_PREDICATE: &str = r#"
(
    visibility = 'public'
    OR (visibility = 'owner' AND owner_id = $4)
    OR (
        visibility = 'restricted' AND (
            allowed_users @> to_jsonb($4::text)
            OR allowed_roles ?| $5::text[]
            OR allowed_permissions ?| $6::text[]
        )
    )
)
"#;

const SELECT_COLUMNS: &str = "id, tenant_id, provider, entity_type, title, body, url, language, \
     metadata, updated_at, visibility, owner_id, allowed_users, allowed_roles, allowed_permissions";

/// `has_embedding` picks the ordering: blended `lexical*W_l + vector*W_v`
/// when a query embedding is present, else lexical score with an
/// `updated_at DESC` tiebreak.
fn order_by(has_embedding: bool, ranker: &RankerConfig) -> String {
    if has_embedding {
        format!(
            "ORDER BY (lexical_score * {lw} + vector_score * {vw}) DESC",
            lw = ranker.lexical_weight,
            vw = ranker.vector_weight
        )
    } else {
        "ORDER BY lexical_score DESC, updated_at DESC".to_string()
    }
}

fn primary_query(has_embedding: bool, ranker: &RankerConfig) -> String {
    format!(
        r#"
        SELECT {cols},
               paradedb.score(id) AS lexical_score,
               CASE WHEN embedding IS NOT NULL AND $3::vector IS NOT NULL
                    THEN 1 - (embedding <=> $3::vector) ELSE 0 END AS vector_score
        FROM spotlight_documents
        WHERE tenant_id = $1
          AND (title || ' ' || body) @@@ $2
          AND {acl}
        {order}
        LIMIT $7
        "#,
        cols = SELECT_COLUMNS,
        acl = ACL_PREDICATE,
        order = order_by(has_embedding, ranker)
    )
}

fn fallback_query(has_embedding: bool, ranker: &RankerConfig) -> String {
    format!(
        r#"
        SELECT {cols},
               ts_rank(to_tsvector('english', title || ' ' || body), plainto_tsquery('english', $2)) AS lexical_score,
               CASE WHEN embedding IS NOT NULL AND $3::vector IS NOT NULL
                    THEN 1 - (embedding <=> $3::vector) ELSE 0 END AS vector_score
        FROM spotlight_documents
        WHERE tenant_id = $1
          AND (
                $2 = ''
                OR to_tsvector('english', title || ' ' || body) @@ plainto_tsquery('english', $2)
              )
          AND {acl}
        {order}
        LIMIT $7
        "#,
        cols = SELECT_COLUMNS,
        acl = ACL_PREDICATE,
        order = order_by(has_embedding, ranker)
    )
}

fn embedding_literal(embedding: &Option<Vec<f32>>) -> Option<String> {
    embedding.as_ref().map(|vector| {
        let joined = vector.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(",");
        format!("[{}]", joined)
    })
}

pub struct PostgresIndexEngine {
    pool: PgPool,
    ranker: RankerConfig,
}

impl PostgresIndexEngine {
    /// Runs the preflight check and brings the documents schema up before
    /// returning, so a constructed engine is always immediately usable.
    /// `ranker` supplies the lexical/vector weights used to order hybrid
    /// search results; pass `RankerConfig::default()` for the spec's 0.75/0.25 split.
    pub async fn new(pool: PgPool, ranker: RankerConfig) -> Result<Self, SpotlightError> {
        preflight(&pool).await?;
        ensure_documents_schema(&pool).await?;
        Ok(Self { pool, ranker })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_hit(row: PgRow, path: QueryPath, has_embedding: bool) -> Result<SearchHit, SpotlightError> {
        let document = Self::row_to_document(&row)?;
        let lexical_score: f32 = row
            .try_get("lexical_score")
            .map_err(|e| SpotlightError::Database(e.to_string()))?;
        let vector_score: f32 = row
            .try_get("vector_score")
            .map_err(|e| SpotlightError::Database(e.to_string()))?;

        Ok(SearchHit {
            document,
            lexical_score,
            vector_score,
            final_score: 0.0,
            why_matched: path.why_matched(has_embedding).to_string(),
        })
    }

    fn row_to_document(row: &PgRow) -> Result<SearchDocument, SpotlightError> {
        let metadata_json: Value = row.try_get("metadata").map_err(|e| SpotlightError::Database(e.to_string()))?;
        let metadata: HashMap<String, String> =
            serde_json::from_value(metadata_json).unwrap_or_default();

        let allowed_users: Vec<String> =
            serde_json::from_value(row.try_get("allowed_users").map_err(|e| SpotlightError::Database(e.to_string()))?)
                .unwrap_or_default();
        let allowed_roles: Vec<String> =
            serde_json::from_value(row.try_get("allowed_roles").map_err(|e| SpotlightError::Database(e.to_string()))?)
                .unwrap_or_default();
        let allowed_permissions: Vec<String> = serde_json::from_value(
            row.try_get("allowed_permissions").map_err(|e| SpotlightError::Database(e.to_string()))?,
        )
        .unwrap_or_default();

        let visibility_str: String = row.try_get("visibility").map_err(|e| SpotlightError::Database(e.to_string()))?;
        let visibility = match visibility_str.as_str() {
            "public" => Visibility::Public,
            "owner" => Visibility::Owner,
            _ => Visibility::Restricted,
        };

        Ok(SearchDocument {
            id: row.try_get("id").map_err(|e| SpotlightError::Database(e.to_string()))?,
            tenant_id: row.try_get("tenant_id").map_err(|e| SpotlightError::Database(e.to_string()))?,
            provider: row.try_get("provider").map_err(|e| SpotlightError::Database(e.to_string()))?,
            entity_type: row.try_get("entity_type").map_err(|e| SpotlightError::Database(e.to_string()))?,
            title: row.try_get("title").map_err(|e| SpotlightError::Database(e.to_string()))?,
            body: row.try_get("body").map_err(|e| SpotlightError::Database(e.to_string()))?,
            url: row.try_get("url").map_err(|e| SpotlightError::Database(e.to_string()))?,
            language: row.try_get("language").map_err(|e| SpotlightError::Database(e.to_string()))?,
            metadata,
            updated_at: row.try_get("updated_at").map_err(|e| SpotlightError::Database(e.to_string()))?,
            embedding: None,
            access: AccessPolicy {
                visibility,
                owner_id: row.try_get("owner_id").map_err(|e| SpotlightError::Database(e.to_string()))?,
                allowed_users,
                allowed_roles,
                allowed_permissions,
            },
        })
    }
}

#[async_trait]
impl IndexEngine for PostgresIndexEngine {
    async fn upsert(&self, documents: Vec<SearchDocument>) -> Result<(), SpotlightError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| SpotlightError::Database(e.to_string()))?;

        for doc in &documents {
            let visibility = match doc.access.visibility {
                Visibility::Public => "public",
                Visibility::Owner => "owner",
                Visibility::Restricted => "restricted",
            };
            let metadata = serde_json::to_value(&doc.metadata).unwrap_or(Value::Null);
            let allowed_users = serde_json::to_value(&doc.access.allowed_users).unwrap_or(Value::Null);
            let allowed_roles = serde_json::to_value(&doc.access.allowed_roles).unwrap_or(Value::Null);
            let allowed_permissions = serde_json::to_value(&doc.access.allowed_permissions).unwrap_or(Value::Null);
            let embedding_text = embedding_literal(&doc.embedding);

            sqlx::query(
                r#"
                INSERT INTO spotlight_documents
                    (tenant_id, id, provider, entity_type, title, body, url, language, metadata,
                     updated_at, embedding, visibility, owner_id, allowed_users, allowed_roles, allowed_permissions)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11::vector, $12, $13, $14, $15, $16)
                ON CONFLICT (tenant_id, id) DO UPDATE SET
                    provider = EXCLUDED.provider,
                    entity_type = EXCLUDED.entity_type,
                    title = EXCLUDED.title,
                    body = EXCLUDED.body,
                    url = EXCLUDED.url,
                    language = EXCLUDED.language,
                    metadata = EXCLUDED.metadata,
                    updated_at = EXCLUDED.updated_at,
                    embedding = EXCLUDED.embedding,
                    visibility = EXCLUDED.visibility,
                    owner_id = EXCLUDED.owner_id,
                    allowed_users = EXCLUDED.allowed_users,
                    allowed_roles = EXCLUDED.allowed_roles,
                    allowed_permissions = EXCLUDED.allowed_permissions
                "#,
            )
            .bind(&doc.tenant_id)
            .bind(&doc.id)
            .bind(&doc.provider)
            .bind(&doc.entity_type)
            .bind(&doc.title)
            .bind(&doc.body)
            .bind(&doc.url)
            .bind(&doc.language)
            .bind(&metadata)
            .bind(doc.updated_at)
            .bind(embedding_text)
            .bind(visibility)
            .bind(&doc.access.owner_id)
            .bind(&allowed_users)
            .bind(&allowed_roles)
            .bind(&allowed_permissions)
            .execute(&mut *tx)
            .await
            .map_err(|e| SpotlightError::Indexing(format!("upserting document {}: {}", doc.id, e)))?;
        }

        tx.commit().await.map_err(|e| SpotlightError::Database(e.to_string()))?;
        debug!(count = documents.len(), "upserted documents into postgres engine");
        Ok(())
    }

    async fn delete(&self, refs: Vec<DocumentRef>) -> Result<(), SpotlightError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| SpotlightError::Database(e.to_string()))?;

        for doc_ref in &refs {
            sqlx::query("DELETE FROM spotlight_documents WHERE tenant_id = $1 AND id = $2")
                .bind(&doc_ref.tenant_id)
                .bind(&doc_ref.id)
                .execute(&mut *tx)
                .await
                .map_err(|e| SpotlightError::Indexing(format!("deleting document {}: {}", doc_ref.id, e)))?;
        }

        tx.commit().await.map_err(|e| SpotlightError::Database(e.to_string()))?;
        Ok(())
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, SpotlightError> {
        let embedding_text = embedding_literal(&request.query_embedding);
        let has_embedding = embedding_text.is_some();
        let limit = request.top_k_usize() as i64;

        let primary = sqlx::query(&primary_query(has_embedding, &self.ranker))
            .bind(&request.tenant_id)
            .bind(&request.query)
            .bind(&embedding_text)
            .bind(&request.user_id)
            .bind(&request.roles)
            .bind(&request.permissions)
            .bind(limit)
            .fetch_all(&self.pool)
            .await;

        let (rows, path) = match primary {
            Ok(rows) => (rows, QueryPath::Primary),
            Err(e) => {
                warn!(error = %e, "primary BM25 search query failed, falling back to ts_rank");
                let rows = sqlx::query(&fallback_query(has_embedding, &self.ranker))
                    .bind(&request.tenant_id)
                    .bind(&request.query)
                    .bind(&embedding_text)
                    .bind(&request.user_id)
                    .bind(&request.roles)
                    .bind(&request.permissions)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(|e| SpotlightError::Indexing(format!("fallback search query: {}", e)))?;
                (rows, QueryPath::Fallback)
            }
        };

        rows.into_iter()
            .map(|row| Self::row_to_hit(row, path, has_embedding))
            .collect()
    }

    async fn health(&self) -> Result<(), SpotlightError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| SpotlightError::Database(e.to_string()))
    }
}
