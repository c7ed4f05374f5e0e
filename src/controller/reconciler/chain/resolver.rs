//! # Reference Resolver
//!
//! Turns the human-readable names used in a `KeycloakClient` into the opaque IDs
//! the admin API expects.
//!
//! Keycloak gives no referential integrity between kinds, so every lookup lists
//! the current remote state. Nothing is cached between calls: a name resolved in
//! one step may have been created by an earlier step of the same cycle.

use crate::controller::reconciler::chain::error::SyncError;
use crate::keycloak::{GroupRepresentation, KeycloakApi, RoleRepresentation};
use std::collections::HashMap;
use std::fmt;

/// Kinds of remote objects a document can refer to by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// Realm-scoped, by `clientId`
    Client,
    /// Realm-scoped, anywhere in the group tree
    Group,
    /// Realm role, or `clientId/role` for a client role
    Role,
    /// Realm-scoped, exact username
    User,
    /// Realm-scoped client scope
    ClientScope,
    /// Authorization resource of the bound client
    Resource,
    /// Authorization scope of the bound client
    Scope,
    /// Authorization policy of the bound client
    Policy,
}

impl ReferenceKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Group => "group",
            Self::Role => "role",
            Self::User => "user",
            Self::ClientScope => "client scope",
            Self::Resource => "resource",
            Self::Scope => "scope",
            Self::Policy => "policy",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolver bound to a realm and, for authorization kinds, to one client
#[derive(Clone, Copy)]
pub struct Resolver<'a> {
    api: &'a dyn KeycloakApi,
    realm: &'a str,
    client_uuid: Option<&'a str>,
}

impl fmt::Debug for Resolver<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("realm", &self.realm)
            .field("client_uuid", &self.client_uuid)
            .finish_non_exhaustive()
    }
}

impl<'a> Resolver<'a> {
    /// Resolver for realm-scoped kinds only
    #[must_use]
    pub fn new(api: &'a dyn KeycloakApi, realm: &'a str) -> Self {
        Self {
            api,
            realm,
            client_uuid: None,
        }
    }

    /// Resolver that can also look up authorization objects of `client_uuid`
    #[must_use]
    pub fn for_client(api: &'a dyn KeycloakApi, realm: &'a str, client_uuid: &'a str) -> Self {
        Self {
            api,
            realm,
            client_uuid: Some(client_uuid),
        }
    }

    /// Resolve one name to its remote ID
    ///
    /// # Errors
    /// `ReferenceNotFound` when the name does not exist, `Configuration` when a
    /// group name is ambiguous, `Remote` when listing fails.
    pub async fn resolve(&self, kind: ReferenceKind, name: &str) -> Result<String, SyncError> {
        let mut ids = self.resolve_all(kind, &[name]).await?;
        ids.pop().ok_or_else(|| not_found(kind, name))
    }

    /// Resolve several names of one kind with a single listing
    ///
    /// The result is in the order of `names`. The first missing name fails the call.
    ///
    /// # Errors
    /// Same as [`Resolver::resolve`].
    pub async fn resolve_all<S: AsRef<str> + Sync>(
        &self,
        kind: ReferenceKind,
        names: &[S],
    ) -> Result<Vec<String>, SyncError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        match kind {
            ReferenceKind::Client => self.resolve_clients(names).await,
            ReferenceKind::Group => self.resolve_groups(names).await,
            ReferenceKind::Role => self.resolve_roles(names).await,
            ReferenceKind::User => self.resolve_users(names).await,
            ReferenceKind::ClientScope => {
                let scopes = self
                    .api
                    .list_client_scopes(self.realm)
                    .await
                    .map_err(SyncError::remote("list client scopes"))?;
                lookup(kind, names, scopes.into_iter().map(|s| (s.name, s.id)))
            }
            ReferenceKind::Resource => {
                let client_uuid = self.bound_client(kind)?;
                let resources = self
                    .api
                    .list_resources(self.realm, client_uuid)
                    .await
                    .map_err(SyncError::remote("list resources"))?;
                lookup(
                    kind,
                    names,
                    resources
                        .into_iter()
                        .filter_map(|r| r.id.map(|id| (r.name, id))),
                )
            }
            ReferenceKind::Scope => {
                let client_uuid = self.bound_client(kind)?;
                let scopes = self
                    .api
                    .list_authz_scopes(self.realm, client_uuid)
                    .await
                    .map_err(SyncError::remote("list authorization scopes"))?;
                lookup(
                    kind,
                    names,
                    scopes.into_iter().filter_map(|s| s.id.map(|id| (s.name, id))),
                )
            }
            ReferenceKind::Policy => {
                let client_uuid = self.bound_client(kind)?;
                let policies = self
                    .api
                    .list_policies(self.realm, client_uuid)
                    .await
                    .map_err(SyncError::remote("list policies"))?;
                lookup(
                    kind,
                    names,
                    policies.into_iter().filter_map(|p| p.id.map(|id| (p.name, id))),
                )
            }
        }
    }

    /// Realm roles by name, as full representations for role mappings
    ///
    /// # Errors
    /// `ReferenceNotFound` for the first missing role.
    pub async fn realm_roles<S: AsRef<str> + Sync>(
        &self,
        names: &[S],
    ) -> Result<Vec<RoleRepresentation>, SyncError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let roles = self
            .api
            .list_realm_roles(self.realm)
            .await
            .map_err(SyncError::remote("list realm roles"))?;
        pick_roles(roles, names)
    }

    /// Client roles of the client with `client_id`, by name
    ///
    /// Returns the client's UUID alongside the roles.
    ///
    /// # Errors
    /// `ReferenceNotFound` for a missing client or the first missing role.
    pub async fn client_roles<S: AsRef<str> + Sync>(
        &self,
        client_id: &str,
        names: &[S],
    ) -> Result<(String, Vec<RoleRepresentation>), SyncError> {
        let client_uuid = self.client_uuid_of(client_id).await?;
        let roles = self
            .api
            .list_client_roles(self.realm, &client_uuid)
            .await
            .map_err(SyncError::remote(format!("list roles of client {client_id:?}")))?;
        Ok((client_uuid.clone(), pick_roles(roles, names)?))
    }

    /// UUID of the client with `client_id`
    ///
    /// # Errors
    /// `ReferenceNotFound` when no such client exists.
    pub async fn client_uuid_of(&self, client_id: &str) -> Result<String, SyncError> {
        self.api
            .get_client(self.realm, client_id)
            .await
            .map_err(SyncError::remote(format!("get client {client_id:?}")))?
            .and_then(|c| c.id)
            .ok_or_else(|| not_found(ReferenceKind::Client, client_id))
    }

    fn bound_client(&self, kind: ReferenceKind) -> Result<&'a str, SyncError> {
        self.client_uuid.ok_or_else(|| {
            SyncError::Configuration(format!("{kind} references need a client to resolve against"))
        })
    }

    async fn resolve_clients<S: AsRef<str> + Sync>(
        &self,
        names: &[S],
    ) -> Result<Vec<String>, SyncError> {
        let clients = self
            .api
            .list_clients(self.realm)
            .await
            .map_err(SyncError::remote("list clients"))?;
        lookup(
            ReferenceKind::Client,
            names,
            clients
                .into_iter()
                .filter_map(|c| c.id.map(|id| (c.client_id, id))),
        )
    }

    async fn resolve_users<S: AsRef<str> + Sync>(
        &self,
        names: &[S],
    ) -> Result<Vec<String>, SyncError> {
        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let user = self
                .api
                .find_user(self.realm, name)
                .await
                .map_err(SyncError::remote(format!("find user {name:?}")))?;
            let id = user
                .and_then(|u| u.id)
                .ok_or_else(|| not_found(ReferenceKind::User, name))?;
            ids.push(id);
        }
        Ok(ids)
    }

    async fn resolve_groups<S: AsRef<str> + Sync>(
        &self,
        names: &[S],
    ) -> Result<Vec<String>, SyncError> {
        let tree = self
            .api
            .list_groups(self.realm)
            .await
            .map_err(SyncError::remote("list groups"))?;
        let groups = flatten_groups(&tree);
        names
            .iter()
            .map(|name| find_group(&groups, name.as_ref()).map(|g| g.id.clone()))
            .collect()
    }

    /// Plain names are realm roles; `clientId/role` names are client roles
    async fn resolve_roles<S: AsRef<str> + Sync>(
        &self,
        names: &[S],
    ) -> Result<Vec<String>, SyncError> {
        let mut realm_roles: Option<HashMap<String, String>> = None;
        let mut client_roles: HashMap<String, HashMap<String, String>> = HashMap::new();
        let mut ids = Vec::with_capacity(names.len());

        for name in names {
            let name = name.as_ref();
            let id = match name.split_once('/') {
                Some((client_id, role)) => {
                    if !client_roles.contains_key(client_id) {
                        let client_uuid = self.client_uuid_of(client_id).await?;
                        let roles = self
                            .api
                            .list_client_roles(self.realm, &client_uuid)
                            .await
                            .map_err(SyncError::remote(format!(
                                "list roles of client {client_id:?}"
                            )))?;
                        client_roles.insert(client_id.to_string(), index_roles(roles));
                    }
                    client_roles
                        .get(client_id)
                        .and_then(|roles| roles.get(role))
                        .cloned()
                }
                None => {
                    if realm_roles.is_none() {
                        let roles = self
                            .api
                            .list_realm_roles(self.realm)
                            .await
                            .map_err(SyncError::remote("list realm roles"))?;
                        realm_roles = Some(index_roles(roles));
                    }
                    realm_roles.as_ref().and_then(|roles| roles.get(name)).cloned()
                }
            };
            ids.push(id.ok_or_else(|| not_found(ReferenceKind::Role, name))?);
        }
        Ok(ids)
    }
}

fn not_found(kind: ReferenceKind, name: &str) -> SyncError {
    SyncError::ReferenceNotFound {
        kind,
        name: name.to_string(),
    }
}

fn lookup<S: AsRef<str>>(
    kind: ReferenceKind,
    names: &[S],
    remote: impl Iterator<Item = (String, String)>,
) -> Result<Vec<String>, SyncError> {
    let index: HashMap<String, String> = remote.collect();
    names
        .iter()
        .map(|name| {
            let name = name.as_ref();
            index.get(name).cloned().ok_or_else(|| not_found(kind, name))
        })
        .collect()
}

fn index_roles(roles: Vec<RoleRepresentation>) -> HashMap<String, String> {
    roles
        .into_iter()
        .filter_map(|r| r.id.map(|id| (r.name, id)))
        .collect()
}

fn pick_roles<S: AsRef<str>>(
    roles: Vec<RoleRepresentation>,
    names: &[S],
) -> Result<Vec<RoleRepresentation>, SyncError> {
    let by_name: HashMap<&str, &RoleRepresentation> =
        roles.iter().map(|r| (r.name.as_str(), r)).collect();
    names
        .iter()
        .map(|name| {
            let name = name.as_ref();
            by_name
                .get(name)
                .map(|r| (*r).clone())
                .ok_or_else(|| not_found(ReferenceKind::Role, name))
        })
        .collect()
}

/// Every group of the tree, parents before children
#[must_use]
pub fn flatten_groups(tree: &[GroupRepresentation]) -> Vec<&GroupRepresentation> {
    let mut flat = Vec::new();
    let mut stack: Vec<&GroupRepresentation> = tree.iter().rev().collect();
    while let Some(group) = stack.pop() {
        flat.push(group);
        stack.extend(group.sub_groups.iter().rev());
    }
    flat
}

/// Match by full path when the name starts with `/`, otherwise by name anywhere
fn find_group<'g>(
    groups: &[&'g GroupRepresentation],
    name: &str,
) -> Result<&'g GroupRepresentation, SyncError> {
    let matches: Vec<&GroupRepresentation> = if name.starts_with('/') {
        groups.iter().copied().filter(|g| g.path == name).collect()
    } else {
        groups.iter().copied().filter(|g| g.name == name).collect()
    };
    match matches.as_slice() {
        [] => Err(not_found(ReferenceKind::Group, name)),
        [group] => Ok(group),
        many => Err(SyncError::Configuration(format!(
            "group name {name:?} is ambiguous, use the full path: {}",
            many.iter()
                .map(|g| g.path.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}
