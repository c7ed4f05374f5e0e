//! Links realm client scopes to the client.
//!
//! Linking is add-only under both strategies: Keycloak attaches its built-in
//! scopes to every new client and those must survive.

use crate::controller::reconciler::chain::diff_sync::SyncReport;
use crate::controller::reconciler::chain::error::SyncError;
use crate::controller::reconciler::chain::resolver::ReferenceKind;
use crate::controller::reconciler::chain::{ChainContext, SyncStep};
use crate::controller::reconciler::status::{StepKey, SyncOutcome};
use crate::crd::KeycloakClient;
use crate::keycloak::ScopeBinding;
use crate::observability::metrics;
use async_trait::async_trait;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, Default)]
pub struct ClientScopesStep;

#[async_trait]
impl SyncStep for ClientScopesStep {
    fn key(&self) -> StepKey {
        StepKey::ClientScopes
    }

    async fn sync(
        &self,
        ctx: &mut ChainContext<'_>,
        document: &KeycloakClient,
    ) -> Result<SyncOutcome, SyncError> {
        let spec = &document.spec;
        if spec.default_client_scopes.is_empty() && spec.optional_client_scopes.is_empty() {
            return Ok(SyncOutcome::not_configured("no client scopes declared"));
        }

        let mut report = SyncReport::default();
        for (binding, names) in [
            (ScopeBinding::Default, &spec.default_client_scopes),
            (ScopeBinding::Optional, &spec.optional_client_scopes),
        ] {
            link_scopes(ctx, binding, names, &mut report).await?;
        }
        Ok(SyncOutcome::Applied(report))
    }
}

async fn link_scopes(
    ctx: &ChainContext<'_>,
    binding: ScopeBinding,
    names: &[String],
    report: &mut SyncReport,
) -> Result<(), SyncError> {
    if names.is_empty() {
        return Ok(());
    }
    let api = ctx.api();
    let realm = ctx.realm();
    let client_uuid = ctx.client_uuid()?;

    let scope_ids = ctx
        .realm_resolver()
        .resolve_all(ReferenceKind::ClientScope, names)
        .await?;
    let linked: HashSet<String> = api
        .list_linked_client_scopes(realm, client_uuid, binding)
        .await
        .map_err(SyncError::remote(format!(
            "list {}",
            binding.path_segment()
        )))?
        .into_iter()
        .map(|scope| scope.id)
        .collect();

    for (name, scope_id) in names.iter().zip(scope_ids) {
        if linked.contains(&scope_id) {
            report.updated.push(name.clone());
            continue;
        }
        api.link_client_scope(realm, client_uuid, &scope_id, binding)
            .await
            .map_err(SyncError::remote(format!(
                "link client scope {name:?} as {}",
                binding.path_segment()
            )))?;
        metrics::increment_sync_operations("client scope", "create");
        report.created.push(name.clone());
    }
    Ok(())
}
