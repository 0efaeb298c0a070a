//! Agents turn a ranked, access-filtered hit list into a natural-language
//! answer. An agent with nothing useful to say returns `ErrNoAgentAnswer`
//! rather than an empty or apologetic answer — callers swallow that one
//! case without logging, per the error design in `spotlight_core`.

pub mod heuristic;
pub mod knowledge;

pub use heuristic::HeuristicAgent;
pub use knowledge::{KnowledgeAgent, KnowledgeSearcher};

use async_trait::async_trait;
use spotlight_core::{AgentAnswer, SearchHit};

#[async_trait]
pub trait Agent: Send + Sync {
    async fn answer(&self, query: &str, hits: &[SearchHit]) -> anyhow::Result<AgentAnswer>;
}
