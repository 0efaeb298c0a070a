//! Demonstration binary: wires a no-op engine, the `quick_links` provider,
//! and the heuristic agent into a running `SpotlightService`, runs one
//! sample search, then waits for Ctrl-C.

use spotlight_acl::{StrictACLEvaluator, TrustedRequestResolver};
use spotlight_agent::HeuristicAgent;
use spotlight_core::{Intent, SearchRequest, SpotlightConfig};
use spotlight_index::NoopEngine;
use spotlight_providers::quick_links::{QuickLink, QuickLinksProvider};
use spotlight_providers::ProviderRegistry;
use spotlight_service::{NoopMetrics, SpotlightService};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn sample_links() -> Vec<QuickLink> {
    let mut billing_labels = HashMap::new();
    billing_labels.insert("en".to_string(), "Billing Settings".to_string());
    billing_labels.insert("fr".to_string(), "Paramètres de facturation".to_string());

    let mut team_labels = HashMap::new();
    team_labels.insert("en".to_string(), "Team Members".to_string());

    vec![
        QuickLink {
            translation_key: "nav.billing".to_string(),
            url: "/settings/billing".to_string(),
            labels: billing_labels,
        },
        QuickLink {
            translation_key: "nav.team".to_string(),
            url: "/settings/team".to_string(),
            labels: team_labels,
        },
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("spotlight=info".parse()?))
        .json()
        .init();

    let config = SpotlightConfig::load("spotlight-config.json").await?;

    let providers = Arc::new(ProviderRegistry::new());
    providers
        .register(Arc::new(QuickLinksProvider::new(sample_links())))
        .await?;

    let service = SpotlightService::new(
        config,
        Arc::new(NoopEngine),
        providers,
        Arc::new(TrustedRequestResolver),
        Arc::new(StrictACLEvaluator),
        Arc::new(HeuristicAgent),
        Arc::new(NoopMetrics),
    );

    service.start().await?;
    info!("spotlight service running");

    service.enqueue_refresh("demo-tenant".to_string(), "en".to_string()).await;
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let response = service
        .search(SearchRequest {
            query: "billing".to_string(),
            tenant_id: "demo-tenant".to_string(),
            user_id: "demo-user".to_string(),
            roles: vec![],
            permissions: vec![],
            top_k: 10,
            intent: Intent::Mixed,
            language: "en".to_string(),
            filters: HashMap::new(),
            query_embedding: None,
        })
        .await?;
    info!(
        navigate = response.navigate.len(),
        data = response.data.len(),
        knowledge = response.knowledge.len(),
        other = response.other.len(),
        "sample search complete"
    );

    tokio::signal::ctrl_c().await?;
    service.stop().await;
    info!("spotlight service stopped");

    Ok(())
}
