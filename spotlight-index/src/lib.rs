//! The engine-agnostic index contract plus two concrete engines: a no-op
//! engine (for demos and tests that don't need real retrieval) and a
//! remote-search-service engine that delegates to an external HTTP search
//! backend. The Postgres hybrid engine lives in `spotlight-index-postgres`
//! since it carries a much heavier dependency (`sqlx`).

pub mod noop;
pub mod remote;

pub use noop::NoopEngine;
pub use remote::RemoteSearchEngine;

use async_trait::async_trait;
use spotlight_core::{DocumentRef, SearchDocument, SearchHit, SearchRequest, SpotlightError};

#[async_trait]
pub trait IndexEngine: Send + Sync {
    async fn upsert(&self, documents: Vec<SearchDocument>) -> Result<(), SpotlightError>;
    async fn delete(&self, refs: Vec<DocumentRef>) -> Result<(), SpotlightError>;
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, SpotlightError>;
    async fn health(&self) -> Result<(), SpotlightError>;
}
