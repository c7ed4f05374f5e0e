//! Fine-grained admin permissions on the client.
//!
//! Enabling them makes Keycloak create one permission per management scope
//! (`view`, `manage`, `token-exchange`, ...) inside the `realm-management`
//! client, named `<scope>.permission.client.<client UUID>`. Policies listed
//! under `permission.scopePermissions` are attached to those permissions.

use crate::constants::REALM_MANAGEMENT_CLIENT;
use crate::controller::reconciler::chain::diff_sync::SyncReport;
use crate::controller::reconciler::chain::error::SyncError;
use crate::controller::reconciler::chain::resolver::{ReferenceKind, Resolver};
use crate::controller::reconciler::chain::{ChainContext, SyncStep};
use crate::controller::reconciler::status::{StepKey, SyncOutcome};
use crate::crd::{FineGrainedPermission, KeycloakClient};
use crate::keycloak::{KeycloakApi, PermissionRepresentation};
use crate::observability::metrics;
use async_trait::async_trait;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default)]
pub struct FineGrainedPermissionsStep;

#[async_trait]
impl SyncStep for FineGrainedPermissionsStep {
    fn key(&self) -> StepKey {
        StepKey::FineGrained
    }

    async fn sync(
        &self,
        ctx: &mut ChainContext<'_>,
        document: &KeycloakClient,
    ) -> Result<SyncOutcome, SyncError> {
        let api = ctx.api();
        let realm = ctx.realm();

        let feature_enabled = api
            .admin_fine_grained_authz_enabled()
            .await
            .map_err(SyncError::remote("read server features"))?;
        if !feature_enabled {
            return Ok(SyncOutcome::not_configured(
                "ADMIN_FINE_GRAINED_AUTHZ is not enabled on the server",
            ));
        }

        let client_uuid = ctx.client_uuid()?;
        let spec = &document.spec;

        if !spec.admin_fine_grained_permissions_enabled {
            let current = api
                .get_management_permissions(realm, client_uuid)
                .await
                .map_err(SyncError::remote("get management permissions"))?;
            if !current.enabled {
                return Ok(SyncOutcome::not_configured(
                    "fine-grained admin permissions are disabled",
                ));
            }
            if !ctx.strategy().allows_delete() {
                return Ok(SyncOutcome::skipped_add_only(
                    "fine-grained admin permissions stay enabled",
                ));
            }
            api.update_management_permissions(realm, client_uuid, false)
                .await
                .map_err(SyncError::remote("disable management permissions"))?;
            info!(realm, client_uuid, "Disabled fine-grained admin permissions");
            metrics::increment_sync_operations("management permissions", "delete");
            return Ok(SyncOutcome::Applied(SyncReport {
                deleted: vec!["management permissions".to_string()],
                ..Default::default()
            }));
        }

        api.update_management_permissions(realm, client_uuid, true)
            .await
            .map_err(SyncError::remote("enable management permissions"))?;
        let mut report = SyncReport::default();
        report.updated.push("management permissions".to_string());

        let Some(permission) = spec.permission.as_ref() else {
            return Ok(SyncOutcome::Applied(report));
        };
        attach_scope_policies(api, realm, client_uuid, permission, &mut report).await?;
        Ok(SyncOutcome::Applied(report))
    }
}

/// Set the policies of each listed management scope permission
async fn attach_scope_policies(
    api: &dyn KeycloakApi,
    realm: &str,
    client_uuid: &str,
    permission: &FineGrainedPermission,
    report: &mut SyncReport,
) -> Result<(), SyncError> {
    if permission.scope_permissions.is_empty() {
        return Ok(());
    }

    let realm_management = api
        .get_client(realm, REALM_MANAGEMENT_CLIENT)
        .await
        .map_err(SyncError::remote("get realm-management client"))?
        .and_then(|client| client.id)
        .ok_or_else(|| SyncError::ReferenceNotFound {
            kind: ReferenceKind::Client,
            name: REALM_MANAGEMENT_CLIENT.to_string(),
        })?;

    let existing = api
        .list_permissions(realm, &realm_management)
        .await
        .map_err(SyncError::remote("list realm-management permissions"))?;
    let scopes = api
        .get_management_permissions(realm, client_uuid)
        .await
        .map_err(SyncError::remote("get management permissions"))?
        .scope_permissions;
    let resolver = Resolver::for_client(api, realm, &realm_management);

    for scope in &permission.scope_permissions {
        if !scopes.contains_key(&scope.name) {
            return Err(SyncError::Configuration(format!(
                "scope {:?} not found in permissions",
                scope.name
            )));
        }
        let permission_name = scope_permission_name(&scope.name, client_uuid);
        let current = existing
            .iter()
            .find(|p| p.name == permission_name)
            .ok_or_else(|| {
                SyncError::Configuration(format!(
                    "permission {permission_name:?} not found in {REALM_MANAGEMENT_CLIENT}"
                ))
            })?;
        let Some(id) = current.id.as_deref() else {
            return Err(SyncError::Configuration(format!(
                "permission {permission_name:?} has no ID"
            )));
        };

        let policies = resolver
            .resolve_all(ReferenceKind::Policy, &scope.policies)
            .await?;
        let updated = PermissionRepresentation {
            id: Some(id.to_string()),
            policies,
            ..current.clone()
        };
        api.update_permission(realm, &realm_management, id, &updated)
            .await
            .map_err(SyncError::remote(format!(
                "update management permission {permission_name:?}"
            )))?;
        debug!(scope = scope.name.as_str(), "Attached policies to management scope");
        metrics::increment_sync_operations("management permission", "update");
        report.updated.push(scope.name.clone());
    }
    Ok(())
}

/// Name Keycloak gives the permission of one management scope of a client
fn scope_permission_name(scope: &str, client_uuid: &str) -> String {
    format!("{scope}.permission.client.{client_uuid}")
}
