//! # Authorization Services
//!
//! Scopes, resources, policies and permissions of the client's resource server,
//! each synced by its own step in that order so later kinds can refer to
//! earlier ones by name.
//!
//! Keycloak creates `Default Resource`, `Default Policy` and `Default Permission`
//! with every resource server; those are never deleted.

use crate::constants::{DEFAULT_PERMISSION_NAME, DEFAULT_POLICY_NAME, DEFAULT_RESOURCE_NAME};
use crate::controller::reconciler::chain::context::client_resolver;
use crate::controller::reconciler::chain::convert::{
    convert_permission, convert_policy, convert_resource,
};
use crate::controller::reconciler::chain::diff_sync::{RemoteEntry, SyncTarget};
use crate::controller::reconciler::chain::error::SyncError;
use crate::controller::reconciler::chain::resolver::Resolver;
use crate::controller::reconciler::chain::steps::sync_collection;
use crate::controller::reconciler::chain::{ChainContext, SyncStep};
use crate::controller::reconciler::status::{StepKey, SyncOutcome};
use crate::crd::{Authorization, KeycloakClient, Permission, Policy, Resource};
use crate::keycloak::{
    KeycloakApi, KeycloakError, PermissionRepresentation, PolicyRepresentation,
    ResourceRepresentation, ScopeRepresentation,
};
use async_trait::async_trait;

const NOT_CONFIGURED: &str = "authorization services are not configured";

/// Client-scoped handles every authorization target needs
struct ResourceServer<'a> {
    api: &'a dyn KeycloakApi,
    realm: &'a str,
    client_uuid: &'a str,
    resolver: Resolver<'a>,
}

impl<'a> ResourceServer<'a> {
    fn of(ctx: &'a ChainContext<'_>) -> Result<Self, SyncError> {
        Ok(Self {
            api: ctx.api(),
            realm: ctx.realm(),
            client_uuid: ctx.client_uuid()?,
            resolver: client_resolver(ctx)?,
        })
    }
}

fn authorization(document: &KeycloakClient) -> Option<&Authorization> {
    document.spec.authorization.as_ref()
}

// Scopes

#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationScopesStep;

#[async_trait]
impl SyncStep for AuthorizationScopesStep {
    fn key(&self) -> StepKey {
        StepKey::AuthorizationScopes
    }

    async fn sync(
        &self,
        ctx: &mut ChainContext<'_>,
        document: &KeycloakClient,
    ) -> Result<SyncOutcome, SyncError> {
        let Some(authorization) = authorization(document) else {
            return Ok(SyncOutcome::not_configured(NOT_CONFIGURED));
        };
        let target = ScopeTarget(ResourceServer::of(ctx)?);
        sync_collection(
            &target,
            &authorization.scopes,
            ctx.strategy(),
            "authorization scopes",
        )
        .await
    }
}

struct ScopeTarget<'a>(ResourceServer<'a>);

#[async_trait]
impl SyncTarget for ScopeTarget<'_> {
    type Desired = String;
    type Payload = ScopeRepresentation;

    fn kind(&self) -> &'static str {
        "authorization scope"
    }

    fn desired_name<'d>(&self, desired: &'d String) -> &'d str {
        desired
    }

    async fn list(&self) -> Result<Vec<RemoteEntry>, KeycloakError> {
        let server = &self.0;
        let scopes = server
            .api
            .list_authz_scopes(server.realm, server.client_uuid)
            .await?;
        Ok(scopes
            .into_iter()
            .filter_map(|scope| scope.id.map(|id| RemoteEntry::new(id, scope.name)))
            .collect())
    }

    async fn convert(&self, desired: &String) -> Result<ScopeRepresentation, SyncError> {
        Ok(ScopeRepresentation {
            id: None,
            name: desired.clone(),
            display_name: None,
        })
    }

    async fn create(&self, payload: &ScopeRepresentation) -> Result<(), KeycloakError> {
        let server = &self.0;
        server
            .api
            .create_authz_scope(server.realm, server.client_uuid, payload)
            .await
    }

    async fn update(&self, id: &str, payload: &ScopeRepresentation) -> Result<(), KeycloakError> {
        let server = &self.0;
        let scope = ScopeRepresentation {
            id: Some(id.to_string()),
            ..payload.clone()
        };
        server
            .api
            .update_authz_scope(server.realm, server.client_uuid, id, &scope)
            .await
    }

    async fn delete(&self, entry: &RemoteEntry) -> Result<(), KeycloakError> {
        let server = &self.0;
        server
            .api
            .delete_authz_scope(server.realm, server.client_uuid, &entry.id)
            .await
    }
}

// Resources

#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationResourcesStep;

#[async_trait]
impl SyncStep for AuthorizationResourcesStep {
    fn key(&self) -> StepKey {
        StepKey::Resources
    }

    async fn sync(
        &self,
        ctx: &mut ChainContext<'_>,
        document: &KeycloakClient,
    ) -> Result<SyncOutcome, SyncError> {
        let Some(authorization) = authorization(document) else {
            return Ok(SyncOutcome::not_configured(NOT_CONFIGURED));
        };
        let target = ResourceTarget(ResourceServer::of(ctx)?);
        sync_collection(
            &target,
            &authorization.resources,
            ctx.strategy(),
            "authorization resources",
        )
        .await
    }
}

struct ResourceTarget<'a>(ResourceServer<'a>);

#[async_trait]
impl SyncTarget for ResourceTarget<'_> {
    type Desired = Resource;
    type Payload = ResourceRepresentation;

    fn kind(&self) -> &'static str {
        "authorization resource"
    }

    fn protected_names(&self) -> &'static [&'static str] {
        &[DEFAULT_RESOURCE_NAME]
    }

    fn desired_name<'d>(&self, desired: &'d Resource) -> &'d str {
        &desired.name
    }

    async fn list(&self) -> Result<Vec<RemoteEntry>, KeycloakError> {
        let server = &self.0;
        let resources = server
            .api
            .list_resources(server.realm, server.client_uuid)
            .await?;
        Ok(resources
            .into_iter()
            .filter_map(|resource| resource.id.map(|id| RemoteEntry::new(id, resource.name)))
            .collect())
    }

    async fn convert(&self, desired: &Resource) -> Result<ResourceRepresentation, SyncError> {
        convert_resource(&self.0.resolver, desired).await
    }

    async fn create(&self, payload: &ResourceRepresentation) -> Result<(), KeycloakError> {
        let server = &self.0;
        server
            .api
            .create_resource(server.realm, server.client_uuid, payload)
            .await
    }

    async fn update(&self, id: &str, payload: &ResourceRepresentation) -> Result<(), KeycloakError> {
        let server = &self.0;
        let resource = ResourceRepresentation {
            id: Some(id.to_string()),
            ..payload.clone()
        };
        server
            .api
            .update_resource(server.realm, server.client_uuid, id, &resource)
            .await
    }

    async fn delete(&self, entry: &RemoteEntry) -> Result<(), KeycloakError> {
        let server = &self.0;
        server
            .api
            .delete_resource(server.realm, server.client_uuid, &entry.id)
            .await
    }
}

// Policies

#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationPoliciesStep;

#[async_trait]
impl SyncStep for AuthorizationPoliciesStep {
    fn key(&self) -> StepKey {
        StepKey::Policies
    }

    async fn sync(
        &self,
        ctx: &mut ChainContext<'_>,
        document: &KeycloakClient,
    ) -> Result<SyncOutcome, SyncError> {
        let Some(authorization) = authorization(document) else {
            return Ok(SyncOutcome::not_configured(NOT_CONFIGURED));
        };
        let target = PolicyTarget(ResourceServer::of(ctx)?);
        sync_collection(
            &target,
            &authorization.policies,
            ctx.strategy(),
            "authorization policies",
        )
        .await
    }
}

struct PolicyTarget<'a>(ResourceServer<'a>);

#[async_trait]
impl SyncTarget for PolicyTarget<'_> {
    type Desired = Policy;
    type Payload = PolicyRepresentation;

    fn kind(&self) -> &'static str {
        "policy"
    }

    fn protected_names(&self) -> &'static [&'static str] {
        &[DEFAULT_POLICY_NAME]
    }

    fn desired_name<'d>(&self, desired: &'d Policy) -> &'d str {
        &desired.name
    }

    async fn list(&self) -> Result<Vec<RemoteEntry>, KeycloakError> {
        let server = &self.0;
        let policies = server
            .api
            .list_policies(server.realm, server.client_uuid)
            .await?;
        Ok(policies
            .into_iter()
            .filter_map(|policy| policy.id.map(|id| RemoteEntry::new(id, policy.name)))
            .collect())
    }

    async fn convert(&self, desired: &Policy) -> Result<PolicyRepresentation, SyncError> {
        convert_policy(&self.0.resolver, desired).await
    }

    async fn create(&self, payload: &PolicyRepresentation) -> Result<(), KeycloakError> {
        let server = &self.0;
        server
            .api
            .create_policy(server.realm, server.client_uuid, payload)
            .await
    }

    async fn update(&self, id: &str, payload: &PolicyRepresentation) -> Result<(), KeycloakError> {
        let server = &self.0;
        let policy = PolicyRepresentation {
            id: Some(id.to_string()),
            ..payload.clone()
        };
        server
            .api
            .update_policy(server.realm, server.client_uuid, id, &policy)
            .await
    }

    async fn delete(&self, entry: &RemoteEntry) -> Result<(), KeycloakError> {
        let server = &self.0;
        server
            .api
            .delete_policy(server.realm, server.client_uuid, &entry.id)
            .await
    }
}

// Permissions

#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationPermissionsStep;

#[async_trait]
impl SyncStep for AuthorizationPermissionsStep {
    fn key(&self) -> StepKey {
        StepKey::Permissions
    }

    async fn sync(
        &self,
        ctx: &mut ChainContext<'_>,
        document: &KeycloakClient,
    ) -> Result<SyncOutcome, SyncError> {
        let Some(authorization) = authorization(document) else {
            return Ok(SyncOutcome::not_configured(NOT_CONFIGURED));
        };
        let target = PermissionTarget(ResourceServer::of(ctx)?);
        sync_collection(
            &target,
            &authorization.permissions,
            ctx.strategy(),
            "authorization permissions",
        )
        .await
    }
}

struct PermissionTarget<'a>(ResourceServer<'a>);

#[async_trait]
impl SyncTarget for PermissionTarget<'_> {
    type Desired = Permission;
    type Payload = PermissionRepresentation;

    fn kind(&self) -> &'static str {
        "permission"
    }

    fn protected_names(&self) -> &'static [&'static str] {
        &[DEFAULT_PERMISSION_NAME]
    }

    fn desired_name<'d>(&self, desired: &'d Permission) -> &'d str {
        &desired.name
    }

    async fn list(&self) -> Result<Vec<RemoteEntry>, KeycloakError> {
        let server = &self.0;
        let permissions = server
            .api
            .list_permissions(server.realm, server.client_uuid)
            .await?;
        Ok(permissions
            .into_iter()
            .filter_map(|permission| {
                permission
                    .id
                    .map(|id| RemoteEntry::new(id, permission.name))
            })
            .collect())
    }

    async fn convert(&self, desired: &Permission) -> Result<PermissionRepresentation, SyncError> {
        convert_permission(&self.0.resolver, desired).await
    }

    async fn create(&self, payload: &PermissionRepresentation) -> Result<(), KeycloakError> {
        let server = &self.0;
        server
            .api
            .create_permission(server.realm, server.client_uuid, payload)
            .await
    }

    async fn update(
        &self,
        id: &str,
        payload: &PermissionRepresentation,
    ) -> Result<(), KeycloakError> {
        let server = &self.0;
        let permission = PermissionRepresentation {
            id: Some(id.to_string()),
            ..payload.clone()
        };
        server
            .api
            .update_permission(server.realm, server.client_uuid, id, &permission)
            .await
    }

    async fn delete(&self, entry: &RemoteEntry) -> Result<(), KeycloakError> {
        let server = &self.0;
        server
            .api
            .delete_permission(server.realm, server.client_uuid, &entry.id)
            .await
    }
}
