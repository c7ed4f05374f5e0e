//! Realm roles created on behalf of the client.
//!
//! Realm roles are shared across the realm, so this step only creates them and
//! never deletes. A role with `composite` set is attached as a child of that
//! existing realm role.

use crate::controller::reconciler::chain::diff_sync::SyncReport;
use crate::controller::reconciler::chain::error::SyncError;
use crate::controller::reconciler::chain::resolver::ReferenceKind;
use crate::controller::reconciler::chain::{ChainContext, SyncStep};
use crate::controller::reconciler::status::{StepKey, SyncOutcome};
use crate::crd::KeycloakClient;
use crate::keycloak::RoleRepresentation;
use crate::observability::metrics;
use async_trait::async_trait;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default)]
pub struct RealmRolesStep;

#[async_trait]
impl SyncStep for RealmRolesStep {
    fn key(&self) -> StepKey {
        StepKey::RealmRoles
    }

    async fn sync(
        &self,
        ctx: &mut ChainContext<'_>,
        document: &KeycloakClient,
    ) -> Result<SyncOutcome, SyncError> {
        let desired = &document.spec.realm_roles;
        if desired.is_empty() {
            return Ok(SyncOutcome::not_configured("no realm roles declared"));
        }
        let api = ctx.api();
        let realm = ctx.realm();
        let mut report = SyncReport::default();

        let mut existing = role_ids(
            api.list_realm_roles(realm)
                .await
                .map_err(SyncError::remote("list realm roles"))?,
        );

        let mut created_any = false;
        for role in desired {
            if existing.contains_key(&role.name) {
                continue;
            }
            let payload = RoleRepresentation {
                name: role.name.clone(),
                ..Default::default()
            };
            api.create_realm_role(realm, &payload)
                .await
                .map_err(SyncError::remote(format!("create realm role {:?}", role.name)))?;
            metrics::increment_sync_operations("realm role", "create");
            report.created.push(role.name.clone());
            created_any = true;
        }
        if created_any {
            existing = role_ids(
                api.list_realm_roles(realm)
                    .await
                    .map_err(SyncError::remote("list realm roles"))?,
            );
        }

        for role in desired {
            let Some(parent) = role.composite.as_deref() else {
                continue;
            };
            let parent_id = existing.get(parent).ok_or_else(|| SyncError::ReferenceNotFound {
                kind: ReferenceKind::Role,
                name: parent.to_string(),
            })?;
            let role_id = existing.get(&role.name).ok_or_else(|| SyncError::ReferenceNotFound {
                kind: ReferenceKind::Role,
                name: role.name.clone(),
            })?;
            let child = RoleRepresentation {
                id: Some(role_id.clone()),
                name: role.name.clone(),
                ..Default::default()
            };
            api.add_composite_roles(realm, parent_id, &[child])
                .await
                .map_err(SyncError::remote(format!(
                    "attach realm role {:?} to composite {parent:?}",
                    role.name
                )))?;
            if !report.created.contains(&role.name) {
                report.updated.push(role.name.clone());
            }
        }

        Ok(SyncOutcome::Applied(report))
    }
}

fn role_ids(roles: Vec<RoleRepresentation>) -> HashMap<String, String> {
    roles
        .into_iter()
        .filter_map(|role| role.id.map(|id| (role.name, id)))
        .collect()
}
