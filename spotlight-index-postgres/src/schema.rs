//! Idempotent schema setup and a startup preflight check.
//!
//! Migrations are out of scope for this subsystem — the documents and
//! outbox tables are created lazily with `CREATE TABLE IF NOT EXISTS`, the
//! same way this workspace's tenant manager brings its own schema up
//! without a separate migration runner, so a fresh database is usable
//! without any out-of-band setup step.

use sqlx::PgPool;
use spotlight_core::SpotlightError;
use tracing::{info, warn};

/// Embedding dimension this engine stores and queries against. Chosen to
/// match a common small sentence-embedding model; callers that embed with
/// a different model must re-embed to this width before indexing.
pub const EMBEDDING_DIMENSIONS: usize = 384;

pub async fn ensure_documents_schema(pool: &PgPool) -> Result<(), SpotlightError> {
    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS spotlight_documents (
            tenant_id TEXT NOT NULL,
            id TEXT NOT NULL,
            provider TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            title TEXT NOT NULL,
            body TEXT NOT NULL,
            url TEXT NOT NULL,
            language TEXT NOT NULL DEFAULT '',
            metadata JSONB NOT NULL DEFAULT '{{}}'::jsonb,
            updated_at TIMESTAMPTZ NOT NULL,
            embedding VECTOR({dims}),
            visibility TEXT NOT NULL DEFAULT 'restricted',
            owner_id TEXT,
            allowed_users JSONB NOT NULL DEFAULT '[]'::jsonb,
            allowed_roles JSONB NOT NULL DEFAULT '[]'::jsonb,
            allowed_permissions JSONB NOT NULL DEFAULT '[]'::jsonb,
            PRIMARY KEY (tenant_id, id)
        )
        "#,
        dims = EMBEDDING_DIMENSIONS
    ))
    .execute(pool)
    .await
    .map_err(|e| SpotlightError::Database(format!("creating spotlight_documents: {}", e)))?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS spotlight_documents_tenant_idx ON spotlight_documents (tenant_id)",
    )
    .execute(pool)
    .await
    .map_err(|e| SpotlightError::Database(format!("creating tenant index: {}", e)))?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS spotlight_documents_tsv_idx ON spotlight_documents \
         USING GIN (to_tsvector('english', title || ' ' || body))",
    )
    .execute(pool)
    .await
    .map_err(|e| SpotlightError::Database(format!("creating lexical index: {}", e)))?;

    info!("spotlight_documents schema ready");
    Ok(())
}

pub async fn ensure_outbox_schema(pool: &PgPool) -> Result<(), SpotlightError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS spotlight_outbox (
            id BIGSERIAL PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            provider TEXT NOT NULL DEFAULT '',
            event_type TEXT NOT NULL DEFAULT '',
            document_id TEXT NOT NULL DEFAULT '',
            payload JSONB NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            processed_at TIMESTAMPTZ
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| SpotlightError::Database(format!("creating spotlight_outbox: {}", e)))?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS spotlight_outbox_pending_idx ON spotlight_outbox (processed_at, created_at)",
    )
    .execute(pool)
    .await
    .map_err(|e| SpotlightError::Database(format!("creating outbox pending index: {}", e)))?;

    info!("spotlight_outbox schema ready");
    Ok(())
}

/// Verifies the database is new enough and carries the extensions this
/// engine relies on. `pgvector` is required — without it the `VECTOR`
/// column type doesn't exist and schema creation itself would fail, so
/// this is checked before `ensure_documents_schema` runs. The BM25
/// extension (ParadeDB's `pg_search`) is only used for the primary
/// lexical-scoring query path; its absence degrades search quality but
/// not correctness, since the engine falls back to `ts_rank`, so its
/// absence is logged rather than treated as fatal.
pub async fn preflight(pool: &PgPool) -> Result<(), SpotlightError> {
    let version: i32 = sqlx::query_scalar("SHOW server_version_num")
        .fetch_one(pool)
        .await
        .map(|s: String| s.parse().unwrap_or(0))
        .map_err(|e| SpotlightError::Configuration(format!("reading server_version_num: {}", e)))?;

    if version < 170000 {
        return Err(SpotlightError::Configuration(format!(
            "postgres {} is older than the minimum supported version (17.0)",
            version
        )));
    }

    let has_vector: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM pg_extension WHERE extname = 'vector')",
    )
    .fetch_one(pool)
    .await
    .map_err(|e| SpotlightError::Configuration(format!("checking for pgvector extension: {}", e)))?;

    if !has_vector {
        return Err(SpotlightError::Configuration(
            "pgvector extension ('vector') is not installed".to_string(),
        ));
    }

    let has_bm25: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM pg_extension WHERE extname = 'pg_search')",
    )
    .fetch_one(pool)
    .await
    .map_err(|e| SpotlightError::Configuration(format!("checking for pg_search extension: {}", e)))?;

    if !has_bm25 {
        warn!("pg_search (BM25) extension not installed, lexical scoring will use ts_rank only");
    }

    Ok(())
}
