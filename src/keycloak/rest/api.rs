//! [`KeycloakApi`] over the admin REST endpoints.

use super::{KeycloakRestClient, id_from_location};
use crate::constants::ADMIN_FINE_GRAINED_AUTHZ_FEATURE;
use crate::keycloak::types::*;
use crate::keycloak::{KeycloakApi, KeycloakError, KeycloakResult};
use async_trait::async_trait;
use futures::future::BoxFuture;
use reqwest::Method;
use serde_json::{Value, json};
use tracing::{Instrument, info_span};

/// List endpoints of the authorization services page by default; ask for everything
const ALL: (&str, &str) = ("max", "-1");

impl KeycloakRestClient {
    /// Populate `sub_groups` for servers that only report `subGroupCount`
    fn fill_sub_groups<'a>(
        &'a self,
        realm: &'a str,
        groups: &'a mut [GroupRepresentation],
    ) -> BoxFuture<'a, KeycloakResult<()>> {
        Box::pin(async move {
            for group in groups.iter_mut() {
                if group.sub_groups.is_empty() && group.sub_group_count.unwrap_or(0) > 0 {
                    let path = format!("{}/groups/{}/children", Self::realm_path(realm), group.id);
                    group.sub_groups = self
                        .get_json("list child groups", &path, &[("briefRepresentation", "true")])
                        .await?;
                }
                self.fill_sub_groups(realm, &mut group.sub_groups).await?;
            }
            Ok(())
        })
    }
}

/// Read the feature state from `/admin/serverinfo`
///
/// Newer servers list `features` with an `enabled` flag; older ones only report
/// `profileInfo.disabledFeatures`.
pub(crate) fn feature_enabled(server_info: &Value, feature: &str) -> bool {
    if let Some(features) = server_info.get("features").and_then(Value::as_array) {
        return features.iter().any(|f| {
            f.get("name").and_then(Value::as_str) == Some(feature)
                && f.get("enabled").and_then(Value::as_bool).unwrap_or(false)
        });
    }
    let disabled = server_info
        .pointer("/profileInfo/disabledFeatures")
        .and_then(Value::as_array);
    match disabled {
        Some(disabled) => !disabled.iter().any(|f| f.as_str() == Some(feature)),
        None => false,
    }
}

#[async_trait]
impl KeycloakApi for KeycloakRestClient {
    async fn get_client(
        &self,
        realm: &str,
        client_id: &str,
    ) -> KeycloakResult<Option<ClientRepresentation>> {
        let path = format!("{}/clients", Self::realm_path(realm));
        let clients: Vec<ClientRepresentation> = self
            .get_json("get client", &path, &[("clientId", client_id)])
            .instrument(info_span!("keycloak.get_client", realm, client_id))
            .await?;
        Ok(clients.into_iter().find(|c| c.client_id == client_id))
    }

    async fn list_clients(&self, realm: &str) -> KeycloakResult<Vec<ClientRepresentation>> {
        let path = format!("{}/clients", Self::realm_path(realm));
        self.get_json("list clients", &path, &[])
            .instrument(info_span!("keycloak.list_clients", realm))
            .await
    }

    async fn create_client(
        &self,
        realm: &str,
        client: &ClientRepresentation,
    ) -> KeycloakResult<String> {
        let path = format!("{}/clients", Self::realm_path(realm));
        let operation = format!("create client {}", client.client_id);
        let span = info_span!("keycloak.create_client", realm, client_id = client.client_id.as_str());
        async {
            let response = self.send_json(&operation, Method::POST, &path, client).await?;
            id_from_location(&operation, &response)
        }
        .instrument(span)
        .await
    }

    async fn update_client(
        &self,
        realm: &str,
        id: &str,
        client: &ClientRepresentation,
    ) -> KeycloakResult<()> {
        let path = format!("{}/clients/{id}", Self::realm_path(realm));
        self.send_json(&format!("update client {id}"), Method::PUT, &path, client)
            .instrument(info_span!("keycloak.update_client", realm, id))
            .await
            .map(|_| ())
    }

    async fn delete_client(&self, realm: &str, id: &str) -> KeycloakResult<()> {
        let path = format!("{}/clients/{id}", Self::realm_path(realm));
        self.delete(&format!("delete client {id}"), &path)
            .instrument(info_span!("keycloak.delete_client", realm, id))
            .await
    }

    async fn list_client_roles(
        &self,
        realm: &str,
        client_uuid: &str,
    ) -> KeycloakResult<Vec<RoleRepresentation>> {
        let path = format!("{}/clients/{client_uuid}/roles", Self::realm_path(realm));
        self.get_json("list client roles", &path, &[])
            .instrument(info_span!("keycloak.list_client_roles", realm, client_uuid))
            .await
    }

    async fn create_client_role(
        &self,
        realm: &str,
        client_uuid: &str,
        role: &RoleRepresentation,
    ) -> KeycloakResult<()> {
        let path = format!("{}/clients/{client_uuid}/roles", Self::realm_path(realm));
        self.send_json(&format!("create client role {}", role.name), Method::POST, &path, role)
            .instrument(info_span!("keycloak.create_client_role", realm, client_uuid))
            .await
            .map(|_| ())
    }

    async fn list_realm_roles(&self, realm: &str) -> KeycloakResult<Vec<RoleRepresentation>> {
        let path = format!("{}/roles", Self::realm_path(realm));
        self.get_json("list realm roles", &path, &[])
            .instrument(info_span!("keycloak.list_realm_roles", realm))
            .await
    }

    async fn create_realm_role(&self, realm: &str, role: &RoleRepresentation) -> KeycloakResult<()> {
        let path = format!("{}/roles", Self::realm_path(realm));
        self.send_json(&format!("create realm role {}", role.name), Method::POST, &path, role)
            .instrument(info_span!("keycloak.create_realm_role", realm))
            .await
            .map(|_| ())
    }

    async fn update_role(
        &self,
        realm: &str,
        role_id: &str,
        role: &RoleRepresentation,
    ) -> KeycloakResult<()> {
        let path = format!("{}/roles-by-id/{role_id}", Self::realm_path(realm));
        self.send_json(&format!("update role {}", role.name), Method::PUT, &path, role)
            .instrument(info_span!("keycloak.update_role", realm, role_id))
            .await
            .map(|_| ())
    }

    async fn delete_role(&self, realm: &str, role_id: &str) -> KeycloakResult<()> {
        let path = format!("{}/roles-by-id/{role_id}", Self::realm_path(realm));
        self.delete(&format!("delete role {role_id}"), &path)
            .instrument(info_span!("keycloak.delete_role", realm, role_id))
            .await
    }

    async fn add_composite_roles(
        &self,
        realm: &str,
        role_id: &str,
        roles: &[RoleRepresentation],
    ) -> KeycloakResult<()> {
        let path = format!("{}/roles-by-id/{role_id}/composites", Self::realm_path(realm));
        self.send_json("add composite roles", Method::POST, &path, roles)
            .instrument(info_span!("keycloak.add_composite_roles", realm, role_id))
            .await
            .map(|_| ())
    }

    async fn list_groups(&self, realm: &str) -> KeycloakResult<Vec<GroupRepresentation>> {
        let path = format!("{}/groups", Self::realm_path(realm));
        async {
            let mut groups: Vec<GroupRepresentation> = self
                .get_json("list groups", &path, &[("briefRepresentation", "true"), ALL])
                .await?;
            self.fill_sub_groups(realm, &mut groups).await?;
            Ok(groups)
        }
        .instrument(info_span!("keycloak.list_groups", realm))
        .await
    }

    async fn find_user(
        &self,
        realm: &str,
        username: &str,
    ) -> KeycloakResult<Option<UserRepresentation>> {
        let path = format!("{}/users", Self::realm_path(realm));
        let users: Vec<UserRepresentation> = self
            .get_json("find user", &path, &[("username", username), ("exact", "true")])
            .instrument(info_span!("keycloak.find_user", realm, username))
            .await?;
        Ok(users
            .into_iter()
            .find(|u| u.username.eq_ignore_ascii_case(username)))
    }

    async fn update_user(
        &self,
        realm: &str,
        user_id: &str,
        user: &UserRepresentation,
    ) -> KeycloakResult<()> {
        let path = format!("{}/users/{user_id}", Self::realm_path(realm));
        self.send_json(&format!("update user {}", user.username), Method::PUT, &path, user)
            .instrument(info_span!("keycloak.update_user", realm, user_id))
            .await
            .map(|_| ())
    }

    async fn list_client_scopes(&self, realm: &str) -> KeycloakResult<Vec<ClientScopeRepresentation>> {
        let path = format!("{}/client-scopes", Self::realm_path(realm));
        self.get_json("list client scopes", &path, &[])
            .instrument(info_span!("keycloak.list_client_scopes", realm))
            .await
    }

    async fn list_linked_client_scopes(
        &self,
        realm: &str,
        client_uuid: &str,
        binding: ScopeBinding,
    ) -> KeycloakResult<Vec<ClientScopeRepresentation>> {
        let path = format!(
            "{}/clients/{client_uuid}/{}",
            Self::realm_path(realm),
            binding.path_segment()
        );
        self.get_json("list linked client scopes", &path, &[])
            .instrument(info_span!("keycloak.list_linked_client_scopes", realm, client_uuid))
            .await
    }

    async fn link_client_scope(
        &self,
        realm: &str,
        client_uuid: &str,
        scope_id: &str,
        binding: ScopeBinding,
    ) -> KeycloakResult<()> {
        let path = format!(
            "{}/clients/{client_uuid}/{}/{scope_id}",
            Self::realm_path(realm),
            binding.path_segment()
        );
        self.put_empty(&format!("link client scope {scope_id}"), &path)
            .instrument(info_span!("keycloak.link_client_scope", realm, client_uuid, scope_id))
            .await
    }

    async fn list_protocol_mappers(
        &self,
        realm: &str,
        client_uuid: &str,
    ) -> KeycloakResult<Vec<ProtocolMapperRepresentation>> {
        let path = format!(
            "{}/clients/{client_uuid}/protocol-mappers/models",
            Self::realm_path(realm)
        );
        self.get_json("list protocol mappers", &path, &[])
            .instrument(info_span!("keycloak.list_protocol_mappers", realm, client_uuid))
            .await
    }

    async fn create_protocol_mapper(
        &self,
        realm: &str,
        client_uuid: &str,
        mapper: &ProtocolMapperRepresentation,
    ) -> KeycloakResult<()> {
        let path = format!(
            "{}/clients/{client_uuid}/protocol-mappers/models",
            Self::realm_path(realm)
        );
        self.send_json(
            &format!("create protocol mapper {}", mapper.name),
            Method::POST,
            &path,
            mapper,
        )
        .instrument(info_span!("keycloak.create_protocol_mapper", realm, client_uuid))
        .await
        .map(|_| ())
    }

    async fn update_protocol_mapper(
        &self,
        realm: &str,
        client_uuid: &str,
        id: &str,
        mapper: &ProtocolMapperRepresentation,
    ) -> KeycloakResult<()> {
        let path = format!(
            "{}/clients/{client_uuid}/protocol-mappers/models/{id}",
            Self::realm_path(realm)
        );
        self.send_json(
            &format!("update protocol mapper {}", mapper.name),
            Method::PUT,
            &path,
            mapper,
        )
        .instrument(info_span!("keycloak.update_protocol_mapper", realm, client_uuid, id))
        .await
        .map(|_| ())
    }

    async fn delete_protocol_mapper(
        &self,
        realm: &str,
        client_uuid: &str,
        id: &str,
    ) -> KeycloakResult<()> {
        let path = format!(
            "{}/clients/{client_uuid}/protocol-mappers/models/{id}",
            Self::realm_path(realm)
        );
        self.delete(&format!("delete protocol mapper {id}"), &path)
            .instrument(info_span!("keycloak.delete_protocol_mapper", realm, client_uuid, id))
            .await
    }

    async fn get_service_account_user(
        &self,
        realm: &str,
        client_uuid: &str,
    ) -> KeycloakResult<UserRepresentation> {
        let path = format!(
            "{}/clients/{client_uuid}/service-account-user",
            Self::realm_path(realm)
        );
        self.get_json("get service account user", &path, &[])
            .instrument(info_span!("keycloak.get_service_account_user", realm, client_uuid))
            .await
    }

    async fn list_user_realm_roles(
        &self,
        realm: &str,
        user_id: &str,
    ) -> KeycloakResult<Vec<RoleRepresentation>> {
        let path = format!("{}/users/{user_id}/role-mappings/realm", Self::realm_path(realm));
        self.get_json("list user realm roles", &path, &[])
            .instrument(info_span!("keycloak.list_user_realm_roles", realm, user_id))
            .await
    }

    async fn add_user_realm_roles(
        &self,
        realm: &str,
        user_id: &str,
        roles: &[RoleRepresentation],
    ) -> KeycloakResult<()> {
        let path = format!("{}/users/{user_id}/role-mappings/realm", Self::realm_path(realm));
        self.send_json("add user realm roles", Method::POST, &path, roles)
            .instrument(info_span!("keycloak.add_user_realm_roles", realm, user_id))
            .await
            .map(|_| ())
    }

    async fn remove_user_realm_roles(
        &self,
        realm: &str,
        user_id: &str,
        roles: &[RoleRepresentation],
    ) -> KeycloakResult<()> {
        let path = format!("{}/users/{user_id}/role-mappings/realm", Self::realm_path(realm));
        self.send_json("remove user realm roles", Method::DELETE, &path, roles)
            .instrument(info_span!("keycloak.remove_user_realm_roles", realm, user_id))
            .await
            .map(|_| ())
    }

    async fn list_user_client_roles(
        &self,
        realm: &str,
        user_id: &str,
        client_uuid: &str,
    ) -> KeycloakResult<Vec<RoleRepresentation>> {
        let path = format!(
            "{}/users/{user_id}/role-mappings/clients/{client_uuid}",
            Self::realm_path(realm)
        );
        self.get_json("list user client roles", &path, &[])
            .instrument(info_span!("keycloak.list_user_client_roles", realm, user_id, client_uuid))
            .await
    }

    async fn add_user_client_roles(
        &self,
        realm: &str,
        user_id: &str,
        client_uuid: &str,
        roles: &[RoleRepresentation],
    ) -> KeycloakResult<()> {
        let path = format!(
            "{}/users/{user_id}/role-mappings/clients/{client_uuid}",
            Self::realm_path(realm)
        );
        self.send_json("add user client roles", Method::POST, &path, roles)
            .instrument(info_span!("keycloak.add_user_client_roles", realm, user_id, client_uuid))
            .await
            .map(|_| ())
    }

    async fn remove_user_client_roles(
        &self,
        realm: &str,
        user_id: &str,
        client_uuid: &str,
        roles: &[RoleRepresentation],
    ) -> KeycloakResult<()> {
        let path = format!(
            "{}/users/{user_id}/role-mappings/clients/{client_uuid}",
            Self::realm_path(realm)
        );
        self.send_json("remove user client roles", Method::DELETE, &path, roles)
            .instrument(info_span!(
                "keycloak.remove_user_client_roles",
                realm,
                user_id,
                client_uuid
            ))
            .await
            .map(|_| ())
    }

    async fn list_user_groups(
        &self,
        realm: &str,
        user_id: &str,
    ) -> KeycloakResult<Vec<GroupRepresentation>> {
        let path = format!("{}/users/{user_id}/groups", Self::realm_path(realm));
        self.get_json("list user groups", &path, &[])
            .instrument(info_span!("keycloak.list_user_groups", realm, user_id))
            .await
    }

    async fn add_user_to_group(
        &self,
        realm: &str,
        user_id: &str,
        group_id: &str,
    ) -> KeycloakResult<()> {
        let path = format!("{}/users/{user_id}/groups/{group_id}", Self::realm_path(realm));
        self.put_empty(&format!("add user to group {group_id}"), &path)
            .instrument(info_span!("keycloak.add_user_to_group", realm, user_id, group_id))
            .await
    }

    async fn remove_user_from_group(
        &self,
        realm: &str,
        user_id: &str,
        group_id: &str,
    ) -> KeycloakResult<()> {
        let path = format!("{}/users/{user_id}/groups/{group_id}", Self::realm_path(realm));
        self.delete(&format!("remove user from group {group_id}"), &path)
            .instrument(info_span!("keycloak.remove_user_from_group", realm, user_id, group_id))
            .await
    }

    async fn list_authz_scopes(
        &self,
        realm: &str,
        client_uuid: &str,
    ) -> KeycloakResult<Vec<ScopeRepresentation>> {
        let path = format!("{}/scope", Self::authz_path(realm, client_uuid));
        self.get_json("list authorization scopes", &path, &[ALL])
            .instrument(info_span!("keycloak.list_authz_scopes", realm, client_uuid))
            .await
    }

    async fn create_authz_scope(
        &self,
        realm: &str,
        client_uuid: &str,
        scope: &ScopeRepresentation,
    ) -> KeycloakResult<()> {
        let path = format!("{}/scope", Self::authz_path(realm, client_uuid));
        self.send_json(
            &format!("create authorization scope {}", scope.name),
            Method::POST,
            &path,
            scope,
        )
        .instrument(info_span!("keycloak.create_authz_scope", realm, client_uuid))
        .await
        .map(|_| ())
    }

    async fn update_authz_scope(
        &self,
        realm: &str,
        client_uuid: &str,
        id: &str,
        scope: &ScopeRepresentation,
    ) -> KeycloakResult<()> {
        let path = format!("{}/scope/{id}", Self::authz_path(realm, client_uuid));
        self.send_json(
            &format!("update authorization scope {}", scope.name),
            Method::PUT,
            &path,
            scope,
        )
        .instrument(info_span!("keycloak.update_authz_scope", realm, client_uuid, id))
        .await
        .map(|_| ())
    }

    async fn delete_authz_scope(
        &self,
        realm: &str,
        client_uuid: &str,
        id: &str,
    ) -> KeycloakResult<()> {
        let path = format!("{}/scope/{id}", Self::authz_path(realm, client_uuid));
        self.delete(&format!("delete authorization scope {id}"), &path)
            .instrument(info_span!("keycloak.delete_authz_scope", realm, client_uuid, id))
            .await
    }

    async fn list_resources(
        &self,
        realm: &str,
        client_uuid: &str,
    ) -> KeycloakResult<Vec<ResourceRepresentation>> {
        let path = format!("{}/resource", Self::authz_path(realm, client_uuid));
        self.get_json("list resources", &path, &[ALL])
            .instrument(info_span!("keycloak.list_resources", realm, client_uuid))
            .await
    }

    async fn create_resource(
        &self,
        realm: &str,
        client_uuid: &str,
        resource: &ResourceRepresentation,
    ) -> KeycloakResult<()> {
        let path = format!("{}/resource", Self::authz_path(realm, client_uuid));
        self.send_json(
            &format!("create resource {}", resource.name),
            Method::POST,
            &path,
            resource,
        )
        .instrument(info_span!("keycloak.create_resource", realm, client_uuid))
        .await
        .map(|_| ())
    }

    async fn update_resource(
        &self,
        realm: &str,
        client_uuid: &str,
        id: &str,
        resource: &ResourceRepresentation,
    ) -> KeycloakResult<()> {
        let path = format!("{}/resource/{id}", Self::authz_path(realm, client_uuid));
        self.send_json(
            &format!("update resource {}", resource.name),
            Method::PUT,
            &path,
            resource,
        )
        .instrument(info_span!("keycloak.update_resource", realm, client_uuid, id))
        .await
        .map(|_| ())
    }

    async fn delete_resource(&self, realm: &str, client_uuid: &str, id: &str) -> KeycloakResult<()> {
        let path = format!("{}/resource/{id}", Self::authz_path(realm, client_uuid));
        self.delete(&format!("delete resource {id}"), &path)
            .instrument(info_span!("keycloak.delete_resource", realm, client_uuid, id))
            .await
    }

    async fn list_policies(
        &self,
        realm: &str,
        client_uuid: &str,
    ) -> KeycloakResult<Vec<PolicyRepresentation>> {
        let path = format!("{}/policy", Self::authz_path(realm, client_uuid));
        self.get_json("list policies", &path, &[("permission", "false"), ALL])
            .instrument(info_span!("keycloak.list_policies", realm, client_uuid))
            .await
    }

    async fn create_policy(
        &self,
        realm: &str,
        client_uuid: &str,
        policy: &PolicyRepresentation,
    ) -> KeycloakResult<()> {
        let path = format!(
            "{}/policy/{}",
            Self::authz_path(realm, client_uuid),
            policy.policy_type
        );
        self.send_json(&format!("create policy {}", policy.name), Method::POST, &path, policy)
            .instrument(info_span!("keycloak.create_policy", realm, client_uuid))
            .await
            .map(|_| ())
    }

    async fn update_policy(
        &self,
        realm: &str,
        client_uuid: &str,
        id: &str,
        policy: &PolicyRepresentation,
    ) -> KeycloakResult<()> {
        let path = format!(
            "{}/policy/{}/{id}",
            Self::authz_path(realm, client_uuid),
            policy.policy_type
        );
        self.send_json(&format!("update policy {}", policy.name), Method::PUT, &path, policy)
            .instrument(info_span!("keycloak.update_policy", realm, client_uuid, id))
            .await
            .map(|_| ())
    }

    async fn delete_policy(&self, realm: &str, client_uuid: &str, id: &str) -> KeycloakResult<()> {
        let path = format!("{}/policy/{id}", Self::authz_path(realm, client_uuid));
        self.delete(&format!("delete policy {id}"), &path)
            .instrument(info_span!("keycloak.delete_policy", realm, client_uuid, id))
            .await
    }

    async fn list_permissions(
        &self,
        realm: &str,
        client_uuid: &str,
    ) -> KeycloakResult<Vec<PermissionRepresentation>> {
        let path = format!("{}/permission", Self::authz_path(realm, client_uuid));
        self.get_json("list permissions", &path, &[ALL])
            .instrument(info_span!("keycloak.list_permissions", realm, client_uuid))
            .await
    }

    async fn create_permission(
        &self,
        realm: &str,
        client_uuid: &str,
        permission: &PermissionRepresentation,
    ) -> KeycloakResult<()> {
        let path = format!(
            "{}/permission/{}",
            Self::authz_path(realm, client_uuid),
            permission.permission_type
        );
        self.send_json(
            &format!("create permission {}", permission.name),
            Method::POST,
            &path,
            permission,
        )
        .instrument(info_span!("keycloak.create_permission", realm, client_uuid))
        .await
        .map(|_| ())
    }

    async fn update_permission(
        &self,
        realm: &str,
        client_uuid: &str,
        id: &str,
        permission: &PermissionRepresentation,
    ) -> KeycloakResult<()> {
        let path = format!(
            "{}/permission/{}/{id}",
            Self::authz_path(realm, client_uuid),
            permission.permission_type
        );
        self.send_json(
            &format!("update permission {}", permission.name),
            Method::PUT,
            &path,
            permission,
        )
        .instrument(info_span!("keycloak.update_permission", realm, client_uuid, id))
        .await
        .map(|_| ())
    }

    async fn delete_permission(
        &self,
        realm: &str,
        client_uuid: &str,
        id: &str,
    ) -> KeycloakResult<()> {
        let path = format!("{}/permission/{id}", Self::authz_path(realm, client_uuid));
        self.delete(&format!("delete permission {id}"), &path)
            .instrument(info_span!("keycloak.delete_permission", realm, client_uuid, id))
            .await
    }

    async fn admin_fine_grained_authz_enabled(&self) -> KeycloakResult<bool> {
        let server_info: Value = self
            .get_json("get server info", "/admin/serverinfo", &[])
            .instrument(info_span!("keycloak.server_info"))
            .await?;
        Ok(feature_enabled(&server_info, ADMIN_FINE_GRAINED_AUTHZ_FEATURE))
    }

    async fn get_management_permissions(
        &self,
        realm: &str,
        client_uuid: &str,
    ) -> KeycloakResult<ManagementPermissionReference> {
        let path = format!(
            "{}/clients/{client_uuid}/management/permissions",
            Self::realm_path(realm)
        );
        self.get_json("get management permissions", &path, &[])
            .instrument(info_span!("keycloak.get_management_permissions", realm, client_uuid))
            .await
    }

    async fn update_management_permissions(
        &self,
        realm: &str,
        client_uuid: &str,
        enabled: bool,
    ) -> KeycloakResult<ManagementPermissionReference> {
        let path = format!(
            "{}/clients/{client_uuid}/management/permissions",
            Self::realm_path(realm)
        );
        let operation = "update management permissions";
        async {
            let response = self
                .send_json(operation, Method::PUT, &path, &json!({ "enabled": enabled }))
                .await?;
            response
                .json::<ManagementPermissionReference>()
                .await
                .map_err(|e| KeycloakError::Decode {
                    operation: operation.to_string(),
                    message: e.to_string(),
                })
        }
        .instrument(info_span!(
            "keycloak.update_management_permissions",
            realm,
            client_uuid,
            enabled
        ))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_enabled_from_features_list() {
        let info = json!({
            "features": [
                {"name": "ADMIN_FINE_GRAINED_AUTHZ", "enabled": true},
                {"name": "TOKEN_EXCHANGE", "enabled": false}
            ]
        });
        assert!(feature_enabled(&info, "ADMIN_FINE_GRAINED_AUTHZ"));
        assert!(!feature_enabled(&info, "TOKEN_EXCHANGE"));
        assert!(!feature_enabled(&info, "SCRIPTS"));
    }

    #[test]
    fn test_feature_enabled_from_disabled_features() {
        let info = json!({"profileInfo": {"disabledFeatures": ["ADMIN_FINE_GRAINED_AUTHZ"]}});
        assert!(!feature_enabled(&info, "ADMIN_FINE_GRAINED_AUTHZ"));

        let info = json!({"profileInfo": {"disabledFeatures": ["SCRIPTS"]}});
        assert!(feature_enabled(&info, "ADMIN_FINE_GRAINED_AUTHZ"));
    }

    #[test]
    fn test_feature_enabled_without_profile_info() {
        assert!(!feature_enabled(&json!({}), "ADMIN_FINE_GRAINED_AUTHZ"));
    }
}
