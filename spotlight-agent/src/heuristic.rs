//! An agent with no model or external call behind it: it summarizes the
//! hit count and suggests navigating to the top hit. Useful as the default
//! agent and as the fallback inside `KnowledgeAgent`.

use crate::Agent;
use async_trait::async_trait;
use spotlight_core::{AgentAnswer, ErrNoAgentAnswer, SearchHit, SuggestedAction};

#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicAgent;

#[async_trait]
impl Agent for HeuristicAgent {
    async fn answer(&self, query: &str, hits: &[SearchHit]) -> anyhow::Result<AgentAnswer> {
        if query.trim().is_empty() || hits.is_empty() {
            return Err(ErrNoAgentAnswer.into());
        }

        let top = &hits[0];
        Ok(AgentAnswer {
            summary: format!("Found {} result(s) for \"{}\".", hits.len(), query.trim()),
            citations: Vec::new(),
            actions: vec![SuggestedAction {
                label: format!("Open {}", top.document.title),
                url: top.document.url.clone(),
            }],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spotlight_core::{AccessPolicy, SearchDocument};
    use std::collections::HashMap;

    fn hit(title: &str) -> SearchHit {
        SearchHit {
            document: SearchDocument {
                id: title.to_string(),
                tenant_id: "tenantA".into(),
                provider: "test".into(),
                entity_type: "route".into(),
                title: title.to_string(),
                body: String::new(),
                url: format!("/{}", title.to_lowercase()),
                language: "en".into(),
                metadata: HashMap::new(),
                updated_at: chrono::Utc::now(),
                embedding: None,
                access: AccessPolicy::public(),
            },
            lexical_score: 1.0,
            vector_score: 0.0,
            final_score: 1.0,
            why_matched: "lexical".into(),
        }
    }

    #[tokio::test]
    async fn empty_query_yields_no_agent_answer() {
        let agent = HeuristicAgent;
        let err = agent.answer("", &[hit("Users")]).await.unwrap_err();
        assert!(err.downcast_ref::<ErrNoAgentAnswer>().is_some());
    }

    #[tokio::test]
    async fn no_hits_yields_no_agent_answer() {
        let agent = HeuristicAgent;
        let err = agent.answer("users", &[]).await.unwrap_err();
        assert!(err.downcast_ref::<ErrNoAgentAnswer>().is_some());
    }

    #[tokio::test]
    async fn non_empty_query_suggests_opening_top_hit() {
        let agent = HeuristicAgent;
        let answer = agent.answer("users", &[hit("Users"), hit("Projects")]).await.unwrap();
        assert_eq!(answer.actions.len(), 1);
        assert_eq!(answer.actions[0].label, "Open Users");
        assert!(answer.summary.contains('2'));
    }
}
