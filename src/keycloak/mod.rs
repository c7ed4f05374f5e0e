//! # Keycloak
//!
//! The remote side of reconciliation: the admin API surface the chain talks to,
//! its representations and errors, and the REST implementation.
//!
//! ## Module Structure
//!
//! - `error.rs` - `KeycloakError`
//! - `types.rs` - JSON representations
//! - `rest/` - `reqwest` implementation and token handling
//!
//! Everything above this module depends only on the [`KeycloakApi`] and
//! [`KeycloakConnector`] traits so tests can substitute an in-memory server.

pub mod error;
pub mod rest;
pub mod types;

use async_trait::async_trait;
use std::sync::Arc;

pub use error::KeycloakError;
pub use rest::{KeycloakRestClient, RestConnector};
pub use types::*;

pub type KeycloakResult<T> = Result<T, KeycloakError>;

/// Keycloak admin API, scoped per realm
///
/// Objects are addressed by opaque IDs; finders and `list_*` calls are the only
/// way to go from names to IDs. Deleting an ID that does not exist returns
/// [`KeycloakError::NotFound`].
#[async_trait]
pub trait KeycloakApi: Send + Sync {
    // Clients

    /// Look up a client by its `clientId`
    async fn get_client(&self, realm: &str, client_id: &str)
    -> KeycloakResult<Option<ClientRepresentation>>;
    async fn list_clients(&self, realm: &str) -> KeycloakResult<Vec<ClientRepresentation>>;
    /// Create a client and return the new UUID
    async fn create_client(&self, realm: &str, client: &ClientRepresentation)
    -> KeycloakResult<String>;
    async fn update_client(
        &self,
        realm: &str,
        id: &str,
        client: &ClientRepresentation,
    ) -> KeycloakResult<()>;
    async fn delete_client(&self, realm: &str, id: &str) -> KeycloakResult<()>;

    // Roles

    async fn list_client_roles(
        &self,
        realm: &str,
        client_uuid: &str,
    ) -> KeycloakResult<Vec<RoleRepresentation>>;
    async fn create_client_role(
        &self,
        realm: &str,
        client_uuid: &str,
        role: &RoleRepresentation,
    ) -> KeycloakResult<()>;
    async fn list_realm_roles(&self, realm: &str) -> KeycloakResult<Vec<RoleRepresentation>>;
    async fn create_realm_role(&self, realm: &str, role: &RoleRepresentation)
    -> KeycloakResult<()>;
    /// Update any role by ID
    async fn update_role(
        &self,
        realm: &str,
        role_id: &str,
        role: &RoleRepresentation,
    ) -> KeycloakResult<()>;
    /// Delete any role by ID
    async fn delete_role(&self, realm: &str, role_id: &str) -> KeycloakResult<()>;
    async fn add_composite_roles(
        &self,
        realm: &str,
        role_id: &str,
        roles: &[RoleRepresentation],
    ) -> KeycloakResult<()>;

    // Groups and users

    /// Full group tree of the realm
    async fn list_groups(&self, realm: &str) -> KeycloakResult<Vec<GroupRepresentation>>;
    /// Exact username match
    async fn find_user(&self, realm: &str, username: &str)
    -> KeycloakResult<Option<UserRepresentation>>;
    async fn update_user(
        &self,
        realm: &str,
        user_id: &str,
        user: &UserRepresentation,
    ) -> KeycloakResult<()>;

    // Client scopes

    async fn list_client_scopes(&self, realm: &str)
    -> KeycloakResult<Vec<ClientScopeRepresentation>>;
    async fn list_linked_client_scopes(
        &self,
        realm: &str,
        client_uuid: &str,
        binding: ScopeBinding,
    ) -> KeycloakResult<Vec<ClientScopeRepresentation>>;
    async fn link_client_scope(
        &self,
        realm: &str,
        client_uuid: &str,
        scope_id: &str,
        binding: ScopeBinding,
    ) -> KeycloakResult<()>;

    // Protocol mappers

    async fn list_protocol_mappers(
        &self,
        realm: &str,
        client_uuid: &str,
    ) -> KeycloakResult<Vec<ProtocolMapperRepresentation>>;
    async fn create_protocol_mapper(
        &self,
        realm: &str,
        client_uuid: &str,
        mapper: &ProtocolMapperRepresentation,
    ) -> KeycloakResult<()>;
    async fn update_protocol_mapper(
        &self,
        realm: &str,
        client_uuid: &str,
        id: &str,
        mapper: &ProtocolMapperRepresentation,
    ) -> KeycloakResult<()>;
    async fn delete_protocol_mapper(
        &self,
        realm: &str,
        client_uuid: &str,
        id: &str,
    ) -> KeycloakResult<()>;

    // Service account

    async fn get_service_account_user(
        &self,
        realm: &str,
        client_uuid: &str,
    ) -> KeycloakResult<UserRepresentation>;
    async fn list_user_realm_roles(
        &self,
        realm: &str,
        user_id: &str,
    ) -> KeycloakResult<Vec<RoleRepresentation>>;
    async fn add_user_realm_roles(
        &self,
        realm: &str,
        user_id: &str,
        roles: &[RoleRepresentation],
    ) -> KeycloakResult<()>;
    async fn remove_user_realm_roles(
        &self,
        realm: &str,
        user_id: &str,
        roles: &[RoleRepresentation],
    ) -> KeycloakResult<()>;
    async fn list_user_client_roles(
        &self,
        realm: &str,
        user_id: &str,
        client_uuid: &str,
    ) -> KeycloakResult<Vec<RoleRepresentation>>;
    async fn add_user_client_roles(
        &self,
        realm: &str,
        user_id: &str,
        client_uuid: &str,
        roles: &[RoleRepresentation],
    ) -> KeycloakResult<()>;
    async fn remove_user_client_roles(
        &self,
        realm: &str,
        user_id: &str,
        client_uuid: &str,
        roles: &[RoleRepresentation],
    ) -> KeycloakResult<()>;
    async fn list_user_groups(
        &self,
        realm: &str,
        user_id: &str,
    ) -> KeycloakResult<Vec<GroupRepresentation>>;
    async fn add_user_to_group(&self, realm: &str, user_id: &str, group_id: &str)
    -> KeycloakResult<()>;
    async fn remove_user_from_group(
        &self,
        realm: &str,
        user_id: &str,
        group_id: &str,
    ) -> KeycloakResult<()>;

    // Authorization services

    async fn list_authz_scopes(
        &self,
        realm: &str,
        client_uuid: &str,
    ) -> KeycloakResult<Vec<ScopeRepresentation>>;
    async fn create_authz_scope(
        &self,
        realm: &str,
        client_uuid: &str,
        scope: &ScopeRepresentation,
    ) -> KeycloakResult<()>;
    async fn update_authz_scope(
        &self,
        realm: &str,
        client_uuid: &str,
        id: &str,
        scope: &ScopeRepresentation,
    ) -> KeycloakResult<()>;
    async fn delete_authz_scope(&self, realm: &str, client_uuid: &str, id: &str)
    -> KeycloakResult<()>;

    async fn list_resources(
        &self,
        realm: &str,
        client_uuid: &str,
    ) -> KeycloakResult<Vec<ResourceRepresentation>>;
    async fn create_resource(
        &self,
        realm: &str,
        client_uuid: &str,
        resource: &ResourceRepresentation,
    ) -> KeycloakResult<()>;
    async fn update_resource(
        &self,
        realm: &str,
        client_uuid: &str,
        id: &str,
        resource: &ResourceRepresentation,
    ) -> KeycloakResult<()>;
    async fn delete_resource(&self, realm: &str, client_uuid: &str, id: &str)
    -> KeycloakResult<()>;

    /// Policies only, permissions are listed separately
    async fn list_policies(
        &self,
        realm: &str,
        client_uuid: &str,
    ) -> KeycloakResult<Vec<PolicyRepresentation>>;
    async fn create_policy(
        &self,
        realm: &str,
        client_uuid: &str,
        policy: &PolicyRepresentation,
    ) -> KeycloakResult<()>;
    async fn update_policy(
        &self,
        realm: &str,
        client_uuid: &str,
        id: &str,
        policy: &PolicyRepresentation,
    ) -> KeycloakResult<()>;
    async fn delete_policy(&self, realm: &str, client_uuid: &str, id: &str) -> KeycloakResult<()>;

    async fn list_permissions(
        &self,
        realm: &str,
        client_uuid: &str,
    ) -> KeycloakResult<Vec<PermissionRepresentation>>;
    async fn create_permission(
        &self,
        realm: &str,
        client_uuid: &str,
        permission: &PermissionRepresentation,
    ) -> KeycloakResult<()>;
    async fn update_permission(
        &self,
        realm: &str,
        client_uuid: &str,
        id: &str,
        permission: &PermissionRepresentation,
    ) -> KeycloakResult<()>;
    async fn delete_permission(&self, realm: &str, client_uuid: &str, id: &str)
    -> KeycloakResult<()>;

    // Fine-grained admin permissions

    /// Whether the server has `ADMIN_FINE_GRAINED_AUTHZ` enabled
    async fn admin_fine_grained_authz_enabled(&self) -> KeycloakResult<bool>;
    async fn get_management_permissions(
        &self,
        realm: &str,
        client_uuid: &str,
    ) -> KeycloakResult<ManagementPermissionReference>;
    async fn update_management_permissions(
        &self,
        realm: &str,
        client_uuid: &str,
        enabled: bool,
    ) -> KeycloakResult<ManagementPermissionReference>;
}

/// Produces an authenticated [`KeycloakApi`] session
///
/// Any failure here is reported as [`KeycloakError::Unavailable`]; the control
/// loop retries those on a fixed interval without counting them as failures.
#[async_trait]
pub trait KeycloakConnector: Send + Sync {
    async fn connect(&self) -> KeycloakResult<Arc<dyn KeycloakApi>>;
}
