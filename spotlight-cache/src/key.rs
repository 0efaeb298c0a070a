//! Cache key derivation.
//!
//! The key must be invariant to role/permission ordering (the request
//! normalizer already sorts them, but this is re-sorted here defensively)
//! and must change whenever anything the response depends on changes.

use spotlight_core::SearchRequest;

const SEP: char = '\0';

/// Builds a cache key from every field of a normalized request that can
/// affect the response: tenant, user, query, language, intent, top_k,
/// roles, permissions, and filters (sorted by key for determinism). `query`
/// and `language` are lowercased so two requests differing only by case
/// share a cache entry.
pub fn build_cache_key(req: &SearchRequest) -> String {
    let mut roles = req.roles.clone();
    roles.sort();
    let mut permissions = req.permissions.clone();
    permissions.sort();

    let mut filter_pairs: Vec<(&String, &String)> = req.filters.iter().collect();
    filter_pairs.sort_by(|a, b| a.0.cmp(b.0));
    let filters_part = filter_pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",");

    format!(
        "{tenant}{sep}{user}{sep}{query}{sep}{lang}{sep}{intent:?}{sep}{top_k}{sep}{roles}{sep}{perms}{sep}{filters}",
        tenant = req.tenant_id,
        sep = SEP,
        user = req.user_id,
        query = req.query.to_lowercase(),
        lang = req.language.to_lowercase(),
        intent = req.intent,
        top_k = req.top_k,
        roles = roles.join(","),
        perms = permissions.join(","),
        filters = filters_part,
    )
}

/// Prefix shared by every key belonging to a tenant, used for bulk
/// invalidation after a reindex.
pub fn tenant_prefix(tenant_id: &str) -> String {
    format!("{}{}", tenant_id, SEP)
}
