//! Client roles of the client.

use crate::controller::reconciler::chain::diff_sync::{RemoteEntry, SyncTarget};
use crate::controller::reconciler::chain::error::SyncError;
use crate::controller::reconciler::chain::steps::sync_collection;
use crate::controller::reconciler::chain::{ChainContext, SyncStep};
use crate::controller::reconciler::status::{StepKey, SyncOutcome};
use crate::crd::{ClientRole, KeycloakClient};
use crate::keycloak::{KeycloakApi, KeycloakError, RoleRepresentation};
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, Default)]
pub struct ClientRolesStep;

#[async_trait]
impl SyncStep for ClientRolesStep {
    fn key(&self) -> StepKey {
        StepKey::ClientRoles
    }

    async fn sync(
        &self,
        ctx: &mut ChainContext<'_>,
        document: &KeycloakClient,
    ) -> Result<SyncOutcome, SyncError> {
        let target = ClientRoleTarget {
            api: ctx.api(),
            realm: ctx.realm(),
            client_uuid: ctx.client_uuid()?,
        };
        sync_collection(
            &target,
            &document.spec.client_roles,
            ctx.strategy(),
            "client roles",
        )
        .await
    }
}

struct ClientRoleTarget<'a> {
    api: &'a dyn KeycloakApi,
    realm: &'a str,
    client_uuid: &'a str,
}

#[async_trait]
impl SyncTarget for ClientRoleTarget<'_> {
    type Desired = ClientRole;
    type Payload = RoleRepresentation;

    fn kind(&self) -> &'static str {
        "client role"
    }

    fn desired_name<'d>(&self, desired: &'d ClientRole) -> &'d str {
        &desired.name
    }

    async fn list(&self) -> Result<Vec<RemoteEntry>, KeycloakError> {
        let roles = self.api.list_client_roles(self.realm, self.client_uuid).await?;
        Ok(roles
            .into_iter()
            .filter_map(|role| role.id.map(|id| RemoteEntry::new(id, role.name)))
            .collect())
    }

    async fn convert(&self, desired: &ClientRole) -> Result<RoleRepresentation, SyncError> {
        Ok(RoleRepresentation {
            name: desired.name.clone(),
            description: desired.description.clone(),
            client_role: true,
            container_id: Some(self.client_uuid.to_string()),
            ..Default::default()
        })
    }

    async fn create(&self, payload: &RoleRepresentation) -> Result<(), KeycloakError> {
        self.api
            .create_client_role(self.realm, self.client_uuid, payload)
            .await
    }

    async fn update(&self, id: &str, payload: &RoleRepresentation) -> Result<(), KeycloakError> {
        let role = RoleRepresentation {
            id: Some(id.to_string()),
            ..payload.clone()
        };
        self.api.update_role(self.realm, id, &role).await
    }

    async fn delete(&self, entry: &RemoteEntry) -> Result<(), KeycloakError> {
        self.api.delete_role(self.realm, &entry.id).await
    }
}
