//! In-memory Keycloak admin API
//!
//! Holds one realm worth of state, records every call by method name and can
//! be told to fail a method with an HTTP status.

use async_trait::async_trait;
use keycloak_client_controller::keycloak::{
    ClientRepresentation, ClientScopeRepresentation, GroupRepresentation, KeycloakApi,
    KeycloakConnector, KeycloakError, KeycloakResult, ManagementPermissionReference,
    PermissionRepresentation, PolicyRepresentation, ProtocolMapperRepresentation,
    ResourceRepresentation, RoleRepresentation, ScopeBinding, ScopeRepresentation,
    UserRepresentation,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Management scopes Keycloak creates when fine-grained permissions are enabled
pub const MANAGEMENT_SCOPES: [&str; 5] = [
    "view",
    "manage",
    "configure",
    "map-roles",
    "token-exchange",
];

#[derive(Debug, Default)]
pub struct FakeState {
    next_id: u64,
    pub clients: Vec<ClientRepresentation>,
    /// Client UUID to its roles
    pub client_roles: HashMap<String, Vec<RoleRepresentation>>,
    pub realm_roles: Vec<RoleRepresentation>,
    /// Composite role ID to child role names
    pub composites: HashMap<String, Vec<String>>,
    pub groups: Vec<GroupRepresentation>,
    pub users: Vec<UserRepresentation>,
    pub client_scopes: Vec<ClientScopeRepresentation>,
    pub linked_scopes: HashMap<(String, ScopeBinding), Vec<String>>,
    pub mappers: HashMap<String, Vec<ProtocolMapperRepresentation>>,
    /// Client UUID to service account user ID
    pub service_accounts: HashMap<String, String>,
    pub user_realm_roles: HashMap<String, Vec<RoleRepresentation>>,
    pub user_client_roles: HashMap<(String, String), Vec<RoleRepresentation>>,
    /// User ID to group IDs
    pub user_groups: HashMap<String, Vec<String>>,
    pub authz_scopes: HashMap<String, Vec<ScopeRepresentation>>,
    pub resources: HashMap<String, Vec<ResourceRepresentation>>,
    pub policies: HashMap<String, Vec<PolicyRepresentation>>,
    pub permissions: HashMap<String, Vec<PermissionRepresentation>>,
    pub fine_grained_feature: bool,
    pub management: HashMap<String, ManagementPermissionReference>,
}

impl FakeState {
    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    pub fn client(&self, client_id: &str) -> Option<&ClientRepresentation> {
        self.clients.iter().find(|c| c.client_id == client_id)
    }

    pub fn client_uuid(&self, client_id: &str) -> Option<String> {
        self.client(client_id).and_then(|c| c.id.clone())
    }

    /// Names of the client roles of `client_id`, sorted
    pub fn client_role_names(&self, client_id: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .client_uuid(client_id)
            .and_then(|uuid| self.client_roles.get(&uuid))
            .map(|roles| roles.iter().map(|r| r.name.clone()).collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    fn role_by_id_mut(&mut self, role_id: &str) -> Option<&mut RoleRepresentation> {
        self.realm_roles
            .iter_mut()
            .chain(self.client_roles.values_mut().flatten())
            .find(|r| r.id.as_deref() == Some(role_id))
    }

    fn enable_service_account(&mut self, client_uuid: &str, client_id: &str) {
        if self.service_accounts.contains_key(client_uuid) {
            return;
        }
        let user_id = self.id("user");
        self.users.push(UserRepresentation {
            id: Some(user_id.clone()),
            username: format!("service-account-{client_id}"),
            enabled: true,
            ..Default::default()
        });
        self.service_accounts.insert(client_uuid.to_string(), user_id);
    }
}

/// Shared in-memory server; hand out sessions with [`FakeConnector`]
#[derive(Debug, Default)]
pub struct FakeKeycloak {
    state: Mutex<FakeState>,
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<String, u16>>,
}

impl FakeKeycloak {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake state lock")
    }

    /// Every call made so far, by method name
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn calls_to(&self, method: &str) -> usize {
        self.calls().iter().filter(|c| *c == method).count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().expect("calls lock").clear();
    }

    /// Make `method` answer with `status` until [`FakeKeycloak::heal`]
    pub fn fail(&self, method: &str, status: u16) {
        self.failures
            .lock()
            .expect("failures lock")
            .insert(method.to_string(), status);
    }

    pub fn heal(&self) {
        self.failures.lock().expect("failures lock").clear();
    }

    /// Seed a client as if created out of band; returns its UUID
    pub fn seed_client(&self, client_id: &str) -> String {
        let mut state = self.state();
        let id = state.id("client");
        state.clients.push(ClientRepresentation {
            id: Some(id.clone()),
            client_id: client_id.to_string(),
            enabled: true,
            ..Default::default()
        });
        id
    }

    pub fn seed_client_role(&self, client_uuid: &str, name: &str) {
        let mut state = self.state();
        let id = state.id("role");
        state
            .client_roles
            .entry(client_uuid.to_string())
            .or_default()
            .push(RoleRepresentation {
                id: Some(id),
                name: name.to_string(),
                client_role: true,
                container_id: Some(client_uuid.to_string()),
                ..Default::default()
            });
    }

    pub fn seed_realm_role(&self, name: &str) {
        let mut state = self.state();
        let id = state.id("role");
        state.realm_roles.push(RoleRepresentation {
            id: Some(id),
            name: name.to_string(),
            ..Default::default()
        });
    }

    pub fn seed_group(&self, name: &str) -> String {
        let mut state = self.state();
        let id = state.id("group");
        state.groups.push(GroupRepresentation {
            id: id.clone(),
            name: name.to_string(),
            path: format!("/{name}"),
            ..Default::default()
        });
        id
    }

    pub fn seed_client_scope(&self, name: &str) -> String {
        let mut state = self.state();
        let id = state.id("scope");
        state.client_scopes.push(ClientScopeRepresentation {
            id: id.clone(),
            name: name.to_string(),
            protocol: Some("openid-connect".to_string()),
        });
        id
    }

    pub fn seed_policy(&self, client_uuid: &str, name: &str) -> String {
        let mut state = self.state();
        let id = state.id("policy");
        state
            .policies
            .entry(client_uuid.to_string())
            .or_default()
            .push(PolicyRepresentation {
                id: Some(id.clone()),
                name: name.to_string(),
                policy_type: "client".to_string(),
                ..Default::default()
            });
        id
    }

    pub fn set_fine_grained_feature(&self, enabled: bool) {
        self.state().fine_grained_feature = enabled;
    }

    fn call(&self, method: &str) -> KeycloakResult<()> {
        self.calls
            .lock()
            .expect("calls lock")
            .push(method.to_string());
        match self.failures.lock().expect("failures lock").get(method) {
            Some(404) => Err(KeycloakError::NotFound(method.to_string())),
            Some(&status) => Err(KeycloakError::Api {
                operation: method.to_string(),
                status,
                body: "injected failure".to_string(),
            }),
            None => Ok(()),
        }
    }
}

fn not_found(what: &str, id: &str) -> KeycloakError {
    KeycloakError::NotFound(format!("{what} {id}"))
}

fn conflict(operation: &str, name: &str) -> KeycloakError {
    KeycloakError::Api {
        operation: operation.to_string(),
        status: 409,
        body: format!("{name} already exists"),
    }
}

#[async_trait]
impl KeycloakApi for FakeKeycloak {
    async fn get_client(
        &self,
        _realm: &str,
        client_id: &str,
    ) -> KeycloakResult<Option<ClientRepresentation>> {
        self.call("get_client")?;
        Ok(self.state().client(client_id).cloned())
    }

    async fn list_clients(&self, _realm: &str) -> KeycloakResult<Vec<ClientRepresentation>> {
        self.call("list_clients")?;
        Ok(self.state().clients.clone())
    }

    async fn create_client(
        &self,
        _realm: &str,
        client: &ClientRepresentation,
    ) -> KeycloakResult<String> {
        self.call("create_client")?;
        let mut state = self.state();
        if state.client(&client.client_id).is_some() {
            return Err(conflict("create_client", &client.client_id));
        }
        let id = state.id("client");
        let mut stored = client.clone();
        stored.id = Some(id.clone());
        if stored.service_accounts_enabled {
            state.enable_service_account(&id, &client.client_id);
        }
        state.clients.push(stored);
        Ok(id)
    }

    async fn update_client(
        &self,
        _realm: &str,
        id: &str,
        client: &ClientRepresentation,
    ) -> KeycloakResult<()> {
        self.call("update_client")?;
        let mut state = self.state();
        let position = state
            .clients
            .iter()
            .position(|c| c.id.as_deref() == Some(id))
            .ok_or_else(|| not_found("client", id))?;
        let mut stored = client.clone();
        stored.id = Some(id.to_string());
        if stored.service_accounts_enabled {
            state.enable_service_account(id, &client.client_id);
        }
        state.clients[position] = stored;
        Ok(())
    }

    async fn delete_client(&self, _realm: &str, id: &str) -> KeycloakResult<()> {
        self.call("delete_client")?;
        let mut state = self.state();
        let before = state.clients.len();
        state.clients.retain(|c| c.id.as_deref() != Some(id));
        if state.clients.len() == before {
            return Err(not_found("client", id));
        }
        state.client_roles.remove(id);
        state.mappers.remove(id);
        Ok(())
    }

    async fn list_client_roles(
        &self,
        _realm: &str,
        client_uuid: &str,
    ) -> KeycloakResult<Vec<RoleRepresentation>> {
        self.call("list_client_roles")?;
        Ok(self
            .state()
            .client_roles
            .get(client_uuid)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_client_role(
        &self,
        _realm: &str,
        client_uuid: &str,
        role: &RoleRepresentation,
    ) -> KeycloakResult<()> {
        self.call("create_client_role")?;
        let mut state = self.state();
        let id = state.id("role");
        let roles = state.client_roles.entry(client_uuid.to_string()).or_default();
        if roles.iter().any(|r| r.name == role.name) {
            return Err(conflict("create_client_role", &role.name));
        }
        roles.push(RoleRepresentation {
            id: Some(id),
            ..role.clone()
        });
        Ok(())
    }

    async fn list_realm_roles(&self, _realm: &str) -> KeycloakResult<Vec<RoleRepresentation>> {
        self.call("list_realm_roles")?;
        Ok(self.state().realm_roles.clone())
    }

    async fn create_realm_role(
        &self,
        _realm: &str,
        role: &RoleRepresentation,
    ) -> KeycloakResult<()> {
        self.call("create_realm_role")?;
        let mut state = self.state();
        if state.realm_roles.iter().any(|r| r.name == role.name) {
            return Err(conflict("create_realm_role", &role.name));
        }
        let id = state.id("role");
        state.realm_roles.push(RoleRepresentation {
            id: Some(id),
            ..role.clone()
        });
        Ok(())
    }

    async fn update_role(
        &self,
        _realm: &str,
        role_id: &str,
        role: &RoleRepresentation,
    ) -> KeycloakResult<()> {
        self.call("update_role")?;
        let mut state = self.state();
        let stored = state
            .role_by_id_mut(role_id)
            .ok_or_else(|| not_found("role", role_id))?;
        stored.description.clone_from(&role.description);
        Ok(())
    }

    async fn delete_role(&self, _realm: &str, role_id: &str) -> KeycloakResult<()> {
        self.call("delete_role")?;
        let mut state = self.state();
        let mut found = false;
        for roles in state.client_roles.values_mut() {
            let before = roles.len();
            roles.retain(|r| r.id.as_deref() != Some(role_id));
            found |= roles.len() != before;
        }
        let before = state.realm_roles.len();
        state.realm_roles.retain(|r| r.id.as_deref() != Some(role_id));
        found |= state.realm_roles.len() != before;
        if found {
            Ok(())
        } else {
            Err(not_found("role", role_id))
        }
    }

    async fn add_composite_roles(
        &self,
        _realm: &str,
        role_id: &str,
        roles: &[RoleRepresentation],
    ) -> KeycloakResult<()> {
        self.call("add_composite_roles")?;
        let mut state = self.state();
        let parent = state
            .role_by_id_mut(role_id)
            .ok_or_else(|| not_found("role", role_id))?;
        parent.composite = true;
        let children = state.composites.entry(role_id.to_string()).or_default();
        for role in roles {
            if !children.contains(&role.name) {
                children.push(role.name.clone());
            }
        }
        Ok(())
    }

    async fn list_groups(&self, _realm: &str) -> KeycloakResult<Vec<GroupRepresentation>> {
        self.call("list_groups")?;
        Ok(self.state().groups.clone())
    }

    async fn find_user(
        &self,
        _realm: &str,
        username: &str,
    ) -> KeycloakResult<Option<UserRepresentation>> {
        self.call("find_user")?;
        Ok(self
            .state()
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn update_user(
        &self,
        _realm: &str,
        user_id: &str,
        user: &UserRepresentation,
    ) -> KeycloakResult<()> {
        self.call("update_user")?;
        let mut state = self.state();
        let stored = state
            .users
            .iter_mut()
            .find(|u| u.id.as_deref() == Some(user_id))
            .ok_or_else(|| not_found("user", user_id))?;
        stored.attributes.clone_from(&user.attributes);
        Ok(())
    }

    async fn list_client_scopes(
        &self,
        _realm: &str,
    ) -> KeycloakResult<Vec<ClientScopeRepresentation>> {
        self.call("list_client_scopes")?;
        Ok(self.state().client_scopes.clone())
    }

    async fn list_linked_client_scopes(
        &self,
        _realm: &str,
        client_uuid: &str,
        binding: ScopeBinding,
    ) -> KeycloakResult<Vec<ClientScopeRepresentation>> {
        self.call("list_linked_client_scopes")?;
        let state = self.state();
        let linked = state
            .linked_scopes
            .get(&(client_uuid.to_string(), binding))
            .cloned()
            .unwrap_or_default();
        Ok(state
            .client_scopes
            .iter()
            .filter(|s| linked.contains(&s.id))
            .cloned()
            .collect())
    }

    async fn link_client_scope(
        &self,
        _realm: &str,
        client_uuid: &str,
        scope_id: &str,
        binding: ScopeBinding,
    ) -> KeycloakResult<()> {
        self.call("link_client_scope")?;
        let mut state = self.state();
        let linked = state
            .linked_scopes
            .entry((client_uuid.to_string(), binding))
            .or_default();
        if !linked.iter().any(|id| id == scope_id) {
            linked.push(scope_id.to_string());
        }
        Ok(())
    }

    async fn list_protocol_mappers(
        &self,
        _realm: &str,
        client_uuid: &str,
    ) -> KeycloakResult<Vec<ProtocolMapperRepresentation>> {
        self.call("list_protocol_mappers")?;
        Ok(self
            .state()
            .mappers
            .get(client_uuid)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_protocol_mapper(
        &self,
        _realm: &str,
        client_uuid: &str,
        mapper: &ProtocolMapperRepresentation,
    ) -> KeycloakResult<()> {
        self.call("create_protocol_mapper")?;
        let mut state = self.state();
        let id = state.id("mapper");
        state
            .mappers
            .entry(client_uuid.to_string())
            .or_default()
            .push(ProtocolMapperRepresentation {
                id: Some(id),
                ..mapper.clone()
            });
        Ok(())
    }

    async fn update_protocol_mapper(
        &self,
        _realm: &str,
        client_uuid: &str,
        id: &str,
        mapper: &ProtocolMapperRepresentation,
    ) -> KeycloakResult<()> {
        self.call("update_protocol_mapper")?;
        let mut state = self.state();
        let stored = state
            .mappers
            .get_mut(client_uuid)
            .and_then(|mappers| mappers.iter_mut().find(|m| m.id.as_deref() == Some(id)))
            .ok_or_else(|| not_found("protocol mapper", id))?;
        *stored = ProtocolMapperRepresentation {
            id: Some(id.to_string()),
            ..mapper.clone()
        };
        Ok(())
    }

    async fn delete_protocol_mapper(
        &self,
        _realm: &str,
        client_uuid: &str,
        id: &str,
    ) -> KeycloakResult<()> {
        self.call("delete_protocol_mapper")?;
        let mut state = self.state();
        let mappers = state
            .mappers
            .get_mut(client_uuid)
            .ok_or_else(|| not_found("protocol mapper", id))?;
        let before = mappers.len();
        mappers.retain(|m| m.id.as_deref() != Some(id));
        if mappers.len() == before {
            return Err(not_found("protocol mapper", id));
        }
        Ok(())
    }

    async fn get_service_account_user(
        &self,
        _realm: &str,
        client_uuid: &str,
    ) -> KeycloakResult<UserRepresentation> {
        self.call("get_service_account_user")?;
        let state = self.state();
        let user_id = state
            .service_accounts
            .get(client_uuid)
            .ok_or_else(|| not_found("service account of client", client_uuid))?;
        state
            .users
            .iter()
            .find(|u| u.id.as_ref() == Some(user_id))
            .cloned()
            .ok_or_else(|| not_found("user", user_id))
    }

    async fn list_user_realm_roles(
        &self,
        _realm: &str,
        user_id: &str,
    ) -> KeycloakResult<Vec<RoleRepresentation>> {
        self.call("list_user_realm_roles")?;
        Ok(self
            .state()
            .user_realm_roles
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn add_user_realm_roles(
        &self,
        _realm: &str,
        user_id: &str,
        roles: &[RoleRepresentation],
    ) -> KeycloakResult<()> {
        self.call("add_user_realm_roles")?;
        let mut state = self.state();
        let mapped = state.user_realm_roles.entry(user_id.to_string()).or_default();
        for role in roles {
            if !mapped.iter().any(|r| r.name == role.name) {
                mapped.push(role.clone());
            }
        }
        Ok(())
    }

    async fn remove_user_realm_roles(
        &self,
        _realm: &str,
        user_id: &str,
        roles: &[RoleRepresentation],
    ) -> KeycloakResult<()> {
        self.call("remove_user_realm_roles")?;
        if let Some(mapped) = self.state().user_realm_roles.get_mut(user_id) {
            mapped.retain(|r| !roles.iter().any(|gone| gone.name == r.name));
        }
        Ok(())
    }

    async fn list_user_client_roles(
        &self,
        _realm: &str,
        user_id: &str,
        client_uuid: &str,
    ) -> KeycloakResult<Vec<RoleRepresentation>> {
        self.call("list_user_client_roles")?;
        Ok(self
            .state()
            .user_client_roles
            .get(&(user_id.to_string(), client_uuid.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn add_user_client_roles(
        &self,
        _realm: &str,
        user_id: &str,
        client_uuid: &str,
        roles: &[RoleRepresentation],
    ) -> KeycloakResult<()> {
        self.call("add_user_client_roles")?;
        let mut state = self.state();
        let mapped = state
            .user_client_roles
            .entry((user_id.to_string(), client_uuid.to_string()))
            .or_default();
        for role in roles {
            if !mapped.iter().any(|r| r.name == role.name) {
                mapped.push(role.clone());
            }
        }
        Ok(())
    }

    async fn remove_user_client_roles(
        &self,
        _realm: &str,
        user_id: &str,
        client_uuid: &str,
        roles: &[RoleRepresentation],
    ) -> KeycloakResult<()> {
        self.call("remove_user_client_roles")?;
        if let Some(mapped) = self
            .state()
            .user_client_roles
            .get_mut(&(user_id.to_string(), client_uuid.to_string()))
        {
            mapped.retain(|r| !roles.iter().any(|gone| gone.name == r.name));
        }
        Ok(())
    }

    async fn list_user_groups(
        &self,
        _realm: &str,
        user_id: &str,
    ) -> KeycloakResult<Vec<GroupRepresentation>> {
        self.call("list_user_groups")?;
        let state = self.state();
        let ids = state.user_groups.get(user_id).cloned().unwrap_or_default();
        Ok(state
            .groups
            .iter()
            .filter(|g| ids.contains(&g.id))
            .cloned()
            .collect())
    }

    async fn add_user_to_group(
        &self,
        _realm: &str,
        user_id: &str,
        group_id: &str,
    ) -> KeycloakResult<()> {
        self.call("add_user_to_group")?;
        let mut state = self.state();
        let groups = state.user_groups.entry(user_id.to_string()).or_default();
        if !groups.iter().any(|id| id == group_id) {
            groups.push(group_id.to_string());
        }
        Ok(())
    }

    async fn remove_user_from_group(
        &self,
        _realm: &str,
        user_id: &str,
        group_id: &str,
    ) -> KeycloakResult<()> {
        self.call("remove_user_from_group")?;
        let mut state = self.state();
        let groups = state
            .user_groups
            .get_mut(user_id)
            .ok_or_else(|| not_found("group membership", group_id))?;
        groups.retain(|id| id != group_id);
        Ok(())
    }

    async fn list_authz_scopes(
        &self,
        _realm: &str,
        client_uuid: &str,
    ) -> KeycloakResult<Vec<ScopeRepresentation>> {
        self.call("list_authz_scopes")?;
        Ok(self
            .state()
            .authz_scopes
            .get(client_uuid)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_authz_scope(
        &self,
        _realm: &str,
        client_uuid: &str,
        scope: &ScopeRepresentation,
    ) -> KeycloakResult<()> {
        self.call("create_authz_scope")?;
        let mut state = self.state();
        let id = state.id("authz-scope");
        state
            .authz_scopes
            .entry(client_uuid.to_string())
            .or_default()
            .push(ScopeRepresentation {
                id: Some(id),
                ..scope.clone()
            });
        Ok(())
    }

    async fn update_authz_scope(
        &self,
        _realm: &str,
        client_uuid: &str,
        id: &str,
        scope: &ScopeRepresentation,
    ) -> KeycloakResult<()> {
        self.call("update_authz_scope")?;
        let mut state = self.state();
        let stored = state
            .authz_scopes
            .get_mut(client_uuid)
            .and_then(|items| items.iter_mut().find(|s| s.id.as_deref() == Some(id)))
            .ok_or_else(|| not_found("authorization scope", id))?;
        *stored = ScopeRepresentation {
            id: Some(id.to_string()),
            ..scope.clone()
        };
        Ok(())
    }

    async fn delete_authz_scope(
        &self,
        _realm: &str,
        client_uuid: &str,
        id: &str,
    ) -> KeycloakResult<()> {
        self.call("delete_authz_scope")?;
        if let Some(items) = self.state().authz_scopes.get_mut(client_uuid) {
            items.retain(|s| s.id.as_deref() != Some(id));
        }
        Ok(())
    }

    async fn list_resources(
        &self,
        _realm: &str,
        client_uuid: &str,
    ) -> KeycloakResult<Vec<ResourceRepresentation>> {
        self.call("list_resources")?;
        Ok(self
            .state()
            .resources
            .get(client_uuid)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_resource(
        &self,
        _realm: &str,
        client_uuid: &str,
        resource: &ResourceRepresentation,
    ) -> KeycloakResult<()> {
        self.call("create_resource")?;
        let mut state = self.state();
        let id = state.id("resource");
        state
            .resources
            .entry(client_uuid.to_string())
            .or_default()
            .push(ResourceRepresentation {
                id: Some(id),
                ..resource.clone()
            });
        Ok(())
    }

    async fn update_resource(
        &self,
        _realm: &str,
        client_uuid: &str,
        id: &str,
        resource: &ResourceRepresentation,
    ) -> KeycloakResult<()> {
        self.call("update_resource")?;
        let mut state = self.state();
        let stored = state
            .resources
            .get_mut(client_uuid)
            .and_then(|items| items.iter_mut().find(|r| r.id.as_deref() == Some(id)))
            .ok_or_else(|| not_found("resource", id))?;
        *stored = ResourceRepresentation {
            id: Some(id.to_string()),
            ..resource.clone()
        };
        Ok(())
    }

    async fn delete_resource(
        &self,
        _realm: &str,
        client_uuid: &str,
        id: &str,
    ) -> KeycloakResult<()> {
        self.call("delete_resource")?;
        if let Some(items) = self.state().resources.get_mut(client_uuid) {
            items.retain(|r| r.id.as_deref() != Some(id));
        }
        Ok(())
    }

    async fn list_policies(
        &self,
        _realm: &str,
        client_uuid: &str,
    ) -> KeycloakResult<Vec<PolicyRepresentation>> {
        self.call("list_policies")?;
        Ok(self
            .state()
            .policies
            .get(client_uuid)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_policy(
        &self,
        _realm: &str,
        client_uuid: &str,
        policy: &PolicyRepresentation,
    ) -> KeycloakResult<()> {
        self.call("create_policy")?;
        let mut state = self.state();
        let id = state.id("policy");
        state
            .policies
            .entry(client_uuid.to_string())
            .or_default()
            .push(PolicyRepresentation {
                id: Some(id),
                ..policy.clone()
            });
        Ok(())
    }

    async fn update_policy(
        &self,
        _realm: &str,
        client_uuid: &str,
        id: &str,
        policy: &PolicyRepresentation,
    ) -> KeycloakResult<()> {
        self.call("update_policy")?;
        let mut state = self.state();
        let stored = state
            .policies
            .get_mut(client_uuid)
            .and_then(|items| items.iter_mut().find(|p| p.id.as_deref() == Some(id)))
            .ok_or_else(|| not_found("policy", id))?;
        *stored = PolicyRepresentation {
            id: Some(id.to_string()),
            ..policy.clone()
        };
        Ok(())
    }

    async fn delete_policy(&self, _realm: &str, client_uuid: &str, id: &str) -> KeycloakResult<()> {
        self.call("delete_policy")?;
        if let Some(items) = self.state().policies.get_mut(client_uuid) {
            items.retain(|p| p.id.as_deref() != Some(id));
        }
        Ok(())
    }

    async fn list_permissions(
        &self,
        _realm: &str,
        client_uuid: &str,
    ) -> KeycloakResult<Vec<PermissionRepresentation>> {
        self.call("list_permissions")?;
        Ok(self
            .state()
            .permissions
            .get(client_uuid)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_permission(
        &self,
        _realm: &str,
        client_uuid: &str,
        permission: &PermissionRepresentation,
    ) -> KeycloakResult<()> {
        self.call("create_permission")?;
        let mut state = self.state();
        let id = state.id("permission");
        state
            .permissions
            .entry(client_uuid.to_string())
            .or_default()
            .push(PermissionRepresentation {
                id: Some(id),
                ..permission.clone()
            });
        Ok(())
    }

    async fn update_permission(
        &self,
        _realm: &str,
        client_uuid: &str,
        id: &str,
        permission: &PermissionRepresentation,
    ) -> KeycloakResult<()> {
        self.call("update_permission")?;
        let mut state = self.state();
        let stored = state
            .permissions
            .get_mut(client_uuid)
            .and_then(|items| items.iter_mut().find(|p| p.id.as_deref() == Some(id)))
            .ok_or_else(|| not_found("permission", id))?;
        *stored = PermissionRepresentation {
            id: Some(id.to_string()),
            ..permission.clone()
        };
        Ok(())
    }

    async fn delete_permission(
        &self,
        _realm: &str,
        client_uuid: &str,
        id: &str,
    ) -> KeycloakResult<()> {
        self.call("delete_permission")?;
        if let Some(items) = self.state().permissions.get_mut(client_uuid) {
            items.retain(|p| p.id.as_deref() != Some(id));
        }
        Ok(())
    }

    async fn admin_fine_grained_authz_enabled(&self) -> KeycloakResult<bool> {
        self.call("admin_fine_grained_authz_enabled")?;
        Ok(self.state().fine_grained_feature)
    }

    async fn get_management_permissions(
        &self,
        _realm: &str,
        client_uuid: &str,
    ) -> KeycloakResult<ManagementPermissionReference> {
        self.call("get_management_permissions")?;
        Ok(self
            .state()
            .management
            .get(client_uuid)
            .cloned()
            .unwrap_or_default())
    }

    /// Enabling creates one permission per management scope in `realm-management`
    async fn update_management_permissions(
        &self,
        _realm: &str,
        client_uuid: &str,
        enabled: bool,
    ) -> KeycloakResult<ManagementPermissionReference> {
        self.call("update_management_permissions")?;
        let mut state = self.state();
        if !enabled {
            let reference = ManagementPermissionReference::default();
            state
                .management
                .insert(client_uuid.to_string(), reference.clone());
            return Ok(reference);
        }
        if let Some(current) = state.management.get(client_uuid) {
            if current.enabled {
                return Ok(current.clone());
            }
        }

        let realm_management = state
            .client_uuid("realm-management")
            .ok_or_else(|| not_found("client", "realm-management"))?;
        let mut scope_permissions = HashMap::new();
        for scope in MANAGEMENT_SCOPES {
            let id = state.id("permission");
            state
                .permissions
                .entry(realm_management.clone())
                .or_default()
                .push(PermissionRepresentation {
                    id: Some(id.clone()),
                    name: format!("{scope}.permission.client.{client_uuid}"),
                    permission_type: "scope".to_string(),
                    ..Default::default()
                });
            scope_permissions.insert(scope.to_string(), id);
        }
        let reference = ManagementPermissionReference {
            enabled: true,
            resource: Some(client_uuid.to_string()),
            scope_permissions,
        };
        state
            .management
            .insert(client_uuid.to_string(), reference.clone());
        Ok(reference)
    }
}

/// Connector handing out sessions on a shared [`FakeKeycloak`]
#[derive(Debug, Clone)]
pub struct FakeConnector {
    server: Arc<FakeKeycloak>,
    unavailable: Arc<AtomicBool>,
}

impl FakeConnector {
    pub fn new(server: &Arc<FakeKeycloak>) -> Self {
        Self {
            server: Arc::clone(server),
            unavailable: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Refuse new sessions as an unreachable server would
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Relaxed);
    }
}

#[async_trait]
impl KeycloakConnector for FakeConnector {
    async fn connect(&self) -> KeycloakResult<Arc<dyn KeycloakApi>> {
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(KeycloakError::Unavailable(
                "connection refused".to_string(),
            ));
        }
        let server: Arc<dyn KeycloakApi> = Arc::clone(&self.server) as Arc<dyn KeycloakApi>;
        Ok(server)
    }
}
