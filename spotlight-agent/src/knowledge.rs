//! An agent that augments the heuristic summary with a knowledge-base
//! lookup. The lookup is an external collaborator, expressed as a trait
//! object so this crate carries no HTTP dependency of its own; a caller
//! wires in whatever client actually talks to the knowledge base.

use crate::{Agent, HeuristicAgent};
use async_trait::async_trait;
use spotlight_core::{AgentAnswer, SearchHit};
use std::sync::Arc;
use tracing::warn;

#[async_trait]
pub trait KnowledgeSearcher: Send + Sync {
    /// Returns a knowledge-base-authored summary for `query`, if one
    /// exists. `Ok(None)` means the lookup succeeded but found nothing.
    async fn search(&self, query: &str) -> anyhow::Result<Option<String>>;
}

pub struct KnowledgeAgent {
    fallback: HeuristicAgent,
    searcher: Arc<dyn KnowledgeSearcher>,
}

impl KnowledgeAgent {
    pub fn new(searcher: Arc<dyn KnowledgeSearcher>) -> Self {
        Self {
            fallback: HeuristicAgent,
            searcher,
        }
    }
}

const MAX_CITATIONS: usize = 3;

#[async_trait]
impl Agent for KnowledgeAgent {
    async fn answer(&self, query: &str, hits: &[SearchHit]) -> anyhow::Result<AgentAnswer> {
        // Reuses the heuristic's preconditions (empty query / no hits ->
        // ErrNoAgentAnswer) and its top-hit action.
        let mut answer = self.fallback.answer(query, hits).await?;

        match self.searcher.search(query).await {
            Ok(Some(kb_summary)) => answer.summary = kb_summary,
            Ok(None) => {}
            Err(e) => warn!(error = %e, "knowledge-base lookup failed, using heuristic summary"),
        }

        let citations: Vec<String> = hits
            .iter()
            .take(MAX_CITATIONS)
            .map(|hit| hit.document.url.clone())
            .collect();
        answer.citations = citations;

        Ok(answer)
    }
}
