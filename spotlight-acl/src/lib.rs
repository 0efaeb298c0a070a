//! Access-control evaluation for search hits.
//!
//! `SearchRequest` already carries the caller's roles and permissions, but
//! those are request-supplied and not necessarily the authoritative set —
//! `PrincipalResolver` is the hook for a caller to back them with a trusted
//! directory lookup. The evaluator resolves a principal once per batch and
//! reuses it for every hit, rather than resolving it per hit.

use async_trait::async_trait;
use spotlight_core::{AccessPolicy, Principal, SearchHit, Visibility};
use tracing::warn;

#[async_trait]
pub trait PrincipalResolver: Send + Sync {
    async fn resolve(&self, tenant_id: &str, user_id: &str) -> anyhow::Result<Principal>;
}

/// Resolves a principal directly from request-supplied fields, with no
/// external lookup. Useful when the caller already trusts its own
/// roles/permissions (e.g. an authenticated gateway upstream).
pub struct TrustedRequestResolver;

#[async_trait]
impl PrincipalResolver for TrustedRequestResolver {
    async fn resolve(&self, _tenant_id: &str, user_id: &str) -> anyhow::Result<Principal> {
        Ok(Principal {
            user_id: user_id.to_string(),
            roles: Vec::new(),
            permissions: Vec::new(),
        })
    }
}

#[async_trait]
pub trait ACLEvaluator: Send + Sync {
    /// Resolves a principal once, then filters `hits` down to the ones it
    /// may see. On resolver failure, public hits survive and every
    /// owner/restricted hit is dropped, since visibility can't be proven.
    ///
    /// When the request already carries `roles`/`permissions`, a principal
    /// is built from them directly and the resolver is never called — the
    /// resolver is only consulted when the request is silent on both.
    async fn filter(
        &self,
        resolver: &dyn PrincipalResolver,
        tenant_id: &str,
        user_id: &str,
        roles: &[String],
        permissions: &[String],
        hits: Vec<SearchHit>,
    ) -> Vec<SearchHit>;

    fn is_visible(&self, principal: &Principal, access: &AccessPolicy) -> bool;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StrictACLEvaluator;

#[async_trait]
impl ACLEvaluator for StrictACLEvaluator {
    async fn filter(
        &self,
        resolver: &dyn PrincipalResolver,
        tenant_id: &str,
        user_id: &str,
        roles: &[String],
        permissions: &[String],
        hits: Vec<SearchHit>,
    ) -> Vec<SearchHit> {
        let principal = if !roles.is_empty() || !permissions.is_empty() {
            Ok(Principal {
                user_id: user_id.to_string(),
                roles: roles.to_vec(),
                permissions: permissions.to_vec(),
            })
        } else {
            resolver.resolve(tenant_id, user_id).await
        };

        match principal {
            Ok(principal) => hits
                .into_iter()
                .filter(|hit| self.is_visible(&principal, &hit.document.access))
                .collect(),
            Err(e) => {
                warn!(tenant_id, user_id, error = %e, "principal resolution failed, dropping non-public hits");
                hits.into_iter()
                    .filter(|hit| hit.document.access.visibility == Visibility::Public)
                    .collect()
            }
        }
    }

    fn is_visible(&self, principal: &Principal, access: &AccessPolicy) -> bool {
        match access.visibility {
            Visibility::Public => true,
            Visibility::Owner => access
                .owner_id
                .as_deref()
                .is_some_and(|owner| owner == principal.user_id),
            Visibility::Restricted => {
                access.allowed_users.iter().any(|u| u == &principal.user_id)
                    || principal.roles.iter().any(|r| access.allowed_roles.contains(r))
                    || principal
                        .permissions
                        .iter()
                        .any(|p| access.allowed_permissions.contains(p))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spotlight_core::{SearchDocument, SearchHit};
    use std::collections::HashMap;

    struct FailingResolver;

    #[async_trait]
    impl PrincipalResolver for FailingResolver {
        async fn resolve(&self, _tenant_id: &str, _user_id: &str) -> anyhow::Result<Principal> {
            Err(anyhow::anyhow!("directory unreachable"))
        }
    }

    struct StaticResolver(Principal);

    #[async_trait]
    impl PrincipalResolver for StaticResolver {
        async fn resolve(&self, _tenant_id: &str, _user_id: &str) -> anyhow::Result<Principal> {
            Ok(self.0.clone())
        }
    }

    fn hit_with_access(id: &str, access: AccessPolicy) -> SearchHit {
        SearchHit {
            document: SearchDocument {
                id: id.to_string(),
                tenant_id: "tenantA".into(),
                provider: "test".into(),
                entity_type: "route".into(),
                title: id.to_string(),
                body: String::new(),
                url: String::new(),
                language: "en".into(),
                metadata: HashMap::new(),
                updated_at: chrono::Utc::now(),
                embedding: None,
                access,
            },
            lexical_score: 1.0,
            vector_score: 0.0,
            final_score: 1.0,
            why_matched: "lexical".into(),
        }
    }

    #[tokio::test]
    async fn public_hits_survive_resolver_failure() {
        let evaluator = StrictACLEvaluator;
        let hits = vec![
            hit_with_access("public-doc", AccessPolicy::public()),
            hit_with_access("owner-doc", AccessPolicy::owned_by("bob")),
        ];
        let visible = evaluator
            .filter(&FailingResolver, "tenantA", "alice", &[], &[], hits)
            .await;
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].document.id, "public-doc");
    }

    #[tokio::test]
    async fn owner_only_visible_to_matching_user() {
        let evaluator = StrictACLEvaluator;
        let hits = vec![hit_with_access("owner-doc", AccessPolicy::owned_by("alice"))];
        let resolver = StaticResolver(Principal {
            user_id: "alice".into(),
            roles: vec![],
            permissions: vec![],
        });
        let visible = evaluator.filter(&resolver, "tenantA", "alice", &[], &[], hits.clone()).await;
        assert_eq!(visible.len(), 1);

        let resolver = StaticResolver(Principal {
            user_id: "mallory".into(),
            roles: vec![],
            permissions: vec![],
        });
        let visible = evaluator.filter(&resolver, "tenantA", "mallory", &[], &[], hits).await;
        assert!(visible.is_empty());
    }

    #[tokio::test]
    async fn restricted_visible_by_role_or_permission() {
        let evaluator = StrictACLEvaluator;
        let access = AccessPolicy {
            visibility: Visibility::Restricted,
            owner_id: None,
            allowed_users: vec![],
            allowed_roles: vec!["billing-admin".into()],
            allowed_permissions: vec!["billing:read".into()],
        };
        let hits = vec![hit_with_access("restricted-doc", access)];

        let role_resolver = StaticResolver(Principal {
            user_id: "alice".into(),
            roles: vec!["billing-admin".into()],
            permissions: vec![],
        });
        let visible = evaluator.filter(&role_resolver, "tenantA", "alice", &[], &[], hits.clone()).await;
        assert_eq!(visible.len(), 1);

        let no_access_resolver = StaticResolver(Principal {
            user_id: "bob".into(),
            roles: vec!["viewer".into()],
            permissions: vec![],
        });
        let visible = evaluator.filter(&no_access_resolver, "tenantA", "bob", &[], &[], hits).await;
        assert!(visible.is_empty());
    }

    #[tokio::test]
    async fn request_supplied_roles_bypass_the_resolver() {
        let evaluator = StrictACLEvaluator;
        let access = AccessPolicy {
            visibility: Visibility::Restricted,
            owner_id: None,
            allowed_users: vec![],
            allowed_roles: vec!["billing-admin".into()],
            allowed_permissions: vec![],
        };
        let hits = vec![hit_with_access("restricted-doc", access)];

        let roles = vec!["billing-admin".to_string()];
        let visible = evaluator
            .filter(&FailingResolver, "tenantA", "alice", &roles, &[], hits)
            .await;
        assert_eq!(visible.len(), 1);
    }
}
