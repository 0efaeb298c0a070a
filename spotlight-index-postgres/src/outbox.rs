//! Drains `spotlight_outbox` into an `IndexEngine`, one bounded batch at a
//! time, using `SELECT ... FOR UPDATE SKIP LOCKED` so multiple processor
//! instances can run against the same table without contending for the
//! same rows.
//!
//! A batch is applied to the engine and marked `processed_at` inside the
//! same database transaction as the row lock: if the engine call fails the
//! whole transaction rolls back and every row in the batch is retried on
//! the next poll, never partially marked.

use crate::schema::ensure_outbox_schema;
use serde_json::Value;
use spotlight_core::{DocumentEvent, DocumentRef, OutboxConfig, SearchDocument, SpotlightError, SpotlightMetrics};
use sqlx::{PgPool, Row};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use spotlight_index::IndexEngine;

pub struct OutboxProcessor {
    pool: PgPool,
    engine: Arc<dyn IndexEngine>,
    config: OutboxConfig,
    metrics: Arc<dyn SpotlightMetrics>,
}

impl OutboxProcessor {
    pub async fn new(
        pool: PgPool,
        engine: Arc<dyn IndexEngine>,
        config: OutboxConfig,
        metrics: Arc<dyn SpotlightMetrics>,
    ) -> Result<Self, SpotlightError> {
        ensure_outbox_schema(&pool).await?;
        Ok(Self { pool, engine, config, metrics })
    }

    /// Runs poll cycles on `config.poll_interval` until `cancellation` is
    /// triggered. Errors from an individual poll are logged, not
    /// propagated — a transient database error shouldn't kill the worker.
    pub async fn run(&self, cancellation: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.poll_interval);
        loop {
            tokio::select! {
                _ = cancellation.cancelled() => {
                    debug!("outbox processor stopping");
                    return;
                }
                _ = interval.tick() => {
                    let started = Instant::now();
                    match self.poll_once().await {
                        Ok(0) => self.metrics.on_outbox_poll(started.elapsed(), false),
                        Ok(n) => {
                            debug!(processed = n, "outbox batch processed");
                            self.metrics.on_outbox_poll(started.elapsed(), false);
                        }
                        Err(e) => {
                            self.metrics.on_outbox_poll(started.elapsed(), true);
                            error!(error = %e, "outbox poll failed");
                        }
                    }
                }
            }
        }
    }

    /// Processes a single bounded batch. Returns the number of rows
    /// committed as processed.
    pub async fn poll_once(&self) -> Result<usize, SpotlightError> {
        let mut tx = self.pool.begin().await.map_err(|e| SpotlightError::Database(e.to_string()))?;

        let rows = sqlx::query(
            "SELECT id, tenant_id, payload FROM spotlight_outbox \
             WHERE processed_at IS NULL ORDER BY created_at FOR UPDATE SKIP LOCKED LIMIT $1",
        )
        .bind(self.config.batch_size)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| SpotlightError::Database(e.to_string()))?;

        if rows.is_empty() {
            tx.rollback().await.map_err(|e| SpotlightError::Database(e.to_string()))?;
            return Ok(0);
        }

        let mut ids: Vec<i64> = Vec::with_capacity(rows.len());
        let mut upserts: Vec<SearchDocument> = Vec::new();
        let mut deletes: Vec<DocumentRef> = Vec::new();

        for row in &rows {
            let id: i64 = row.try_get("id").map_err(|e| SpotlightError::Database(e.to_string()))?;
            let tenant_id: String = row.try_get("tenant_id").map_err(|e| SpotlightError::Database(e.to_string()))?;
            let payload: Value = row.try_get("payload").map_err(|e| SpotlightError::Database(e.to_string()))?;
            ids.push(id);

            match parse_payload(payload, &tenant_id) {
                Ok(DocumentEvent::Create(doc)) | Ok(DocumentEvent::Update(doc)) => upserts.push(doc),
                Ok(DocumentEvent::Delete(doc_ref)) => deletes.push(doc_ref),
                Err(e) => warn!(outbox_id = id, tenant_id, error = %e, "dropping malformed outbox payload"),
            }
        }

        if !upserts.is_empty() {
            self.engine
                .upsert(upserts)
                .await
                .map_err(|e| SpotlightError::Indexing(format!("outbox upsert batch: {}", e)))?;
        }
        if !deletes.is_empty() {
            self.engine
                .delete(deletes)
                .await
                .map_err(|e| SpotlightError::Indexing(format!("outbox delete batch: {}", e)))?;
        }

        sqlx::query("UPDATE spotlight_outbox SET processed_at = now() WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await
            .map_err(|e| SpotlightError::Database(e.to_string()))?;

        tx.commit().await.map_err(|e| SpotlightError::Database(e.to_string()))?;
        Ok(ids.len())
    }
}

/// Decodes a tagged `DocumentEvent` when the payload was written that way;
/// falls back to treating a bare `SearchDocument` payload as an update, the
/// shape an upstream writer produces when it only ever knows how to upsert.
fn parse_payload(payload: Value, tenant_id: &str) -> Result<DocumentEvent, SpotlightError> {
    if let Ok(event) = serde_json::from_value::<DocumentEvent>(payload.clone()) {
        return validate_tenant(event, tenant_id);
    }
    let doc: SearchDocument = serde_json::from_value(payload)
        .map_err(|e| SpotlightError::Indexing(format!("decoding outbox payload: {}", e)))?;
    validate_tenant(DocumentEvent::Update(doc), tenant_id)
}

fn validate_tenant(event: DocumentEvent, tenant_id: &str) -> Result<DocumentEvent, SpotlightError> {
    let event_tenant = match &event {
        DocumentEvent::Create(doc) | DocumentEvent::Update(doc) => &doc.tenant_id,
        DocumentEvent::Delete(doc_ref) => &doc_ref.tenant_id,
    };
    if event_tenant != tenant_id {
        return Err(SpotlightError::Indexing(format!(
            "outbox row tenant '{}' does not match payload tenant '{}'",
            tenant_id, event_tenant
        )));
    }
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spotlight_core::AccessPolicy;
    use std::collections::HashMap;

    fn doc(tenant_id: &str) -> SearchDocument {
        SearchDocument {
            id: "1".into(),
            tenant_id: tenant_id.into(),
            provider: "quick_links".into(),
            entity_type: "quick_link".into(),
            title: "Billing".into(),
            body: String::new(),
            url: "/billing".into(),
            language: "en".into(),
            metadata: HashMap::new(),
            updated_at: chrono::Utc::now(),
            embedding: None,
            access: AccessPolicy::public(),
        }
    }

    #[test]
    fn bare_document_payload_falls_back_to_update() {
        let payload = serde_json::to_value(doc("tenantA")).unwrap();
        let event = parse_payload(payload, "tenantA").unwrap();
        assert!(matches!(event, DocumentEvent::Update(_)));
    }

    #[test]
    fn tagged_event_payload_is_preferred() {
        let payload = serde_json::to_value(DocumentEvent::Delete(DocumentRef {
            tenant_id: "tenantA".into(),
            id: "1".into(),
        }))
        .unwrap();
        let event = parse_payload(payload, "tenantA").unwrap();
        assert!(matches!(event, DocumentEvent::Delete(_)));
    }

    #[test]
    fn mismatched_tenant_is_rejected() {
        let payload = serde_json::to_value(doc("tenantB")).unwrap();
        assert!(parse_payload(payload, "tenantA").is_err());
    }
}
