//! A static provider that indexes a configured table of navigation
//! shortcuts ("quick links"), one search document per link, combining
//! every language's label into the document body so a query in any
//! configured language can match.

use crate::{Capabilities, SearchProvider};
use async_trait::async_trait;
use spotlight_core::{AccessPolicy, SearchDocument};
use std::collections::HashMap;

pub const PROVIDER_ID: &str = "quick_links";
pub const ENTITY_TYPE: &str = "quick_link";

/// One navigation shortcut: a stable translation key, a destination URL,
/// and a label per language.
#[derive(Debug, Clone)]
pub struct QuickLink {
    pub translation_key: String,
    pub url: String,
    /// Language code -> localized label, e.g. `"en" -> "Billing Settings"`.
    pub labels: HashMap<String, String>,
}

pub struct QuickLinksProvider {
    links: Vec<QuickLink>,
}

impl QuickLinksProvider {
    pub fn new(links: Vec<QuickLink>) -> Self {
        Self { links }
    }

    fn document_for(&self, tenant_id: &str, link: &QuickLink) -> SearchDocument {
        let mut sorted_languages: Vec<&String> = link.labels.keys().collect();
        sorted_languages.sort();

        let body = sorted_languages
            .iter()
            .map(|lang| link.labels[*lang].as_str())
            .collect::<Vec<_>>()
            .join(" | ");

        let title = link
            .labels
            .get("en")
            .cloned()
            .or_else(|| sorted_languages.first().map(|lang| link.labels[*lang].clone()))
            .unwrap_or_else(|| link.translation_key.clone());

        SearchDocument {
            // `provider:translation_key:url` uniquely addresses a link even
            // if two links share a translation key or a URL, without
            // hashing or index-position concatenation.
            id: format!("{}:{}:{}", PROVIDER_ID, link.translation_key, link.url),
            tenant_id: tenant_id.to_string(),
            provider: PROVIDER_ID.to_string(),
            entity_type: ENTITY_TYPE.to_string(),
            title,
            body,
            url: link.url.clone(),
            language: String::new(),
            metadata: HashMap::new(),
            updated_at: chrono::Utc::now(),
            embedding: None,
            access: AccessPolicy::public(),
        }
    }
}

#[async_trait]
impl SearchProvider for QuickLinksProvider {
    fn id(&self) -> &str {
        PROVIDER_ID
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            supports_watch: false,
            entity_types: vec![ENTITY_TYPE.to_string()],
        }
    }

    async fn list_documents(
        &self,
        tenant_id: &str,
        _language: &str,
        _query: &str,
        _top_k: usize,
    ) -> anyhow::Result<Vec<SearchDocument>> {
        Ok(self
            .links
            .iter()
            .map(|link| self.document_for(tenant_id, link))
            .collect())
    }
}
