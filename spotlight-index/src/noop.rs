//! An engine that discards writes and returns no results. Used by the demo
//! binary and by tests that exercise the service pipeline without standing
//! up a real backend.

use crate::IndexEngine;
use async_trait::async_trait;
use spotlight_core::{DocumentRef, SearchDocument, SearchHit, SearchRequest, SpotlightError};
use tracing::debug;

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEngine;

#[async_trait]
impl IndexEngine for NoopEngine {
    async fn upsert(&self, documents: Vec<SearchDocument>) -> Result<(), SpotlightError> {
        debug!(count = documents.len(), "noop engine discarding upsert");
        Ok(())
    }

    async fn delete(&self, refs: Vec<DocumentRef>) -> Result<(), SpotlightError> {
        debug!(count = refs.len(), "noop engine discarding delete");
        Ok(())
    }

    async fn search(&self, _request: &SearchRequest) -> Result<Vec<SearchHit>, SpotlightError> {
        Ok(Vec::new())
    }

    async fn health(&self) -> Result<(), SpotlightError> {
        Ok(())
    }
}
