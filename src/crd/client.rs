//! # Client Sub-resources
//!
//! Roles, protocol mappers, the service account and fine-grained admin permissions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Role scoped to this client
#[derive(Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientRole {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Realm role created for this client
#[derive(Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RealmRole {
    pub name: String,
    /// Existing realm role that gets this role as a composite child
    #[serde(default)]
    pub composite: Option<String>,
}

/// Protocol mapper attached directly to the client
#[derive(Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolMapper {
    pub name: String,
    #[serde(default = "crate::crd::default_protocol")]
    pub protocol: String,
    /// Mapper implementation, e.g. `oidc-usermodel-attribute-mapper`
    pub protocol_mapper: String,
    #[serde(default)]
    pub config: BTreeMap<String, String>,
}

/// Service account settings for confidential clients
#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccount {
    #[serde(default)]
    pub enabled: bool,
    /// Realm roles mapped to the service account user
    #[serde(default)]
    pub realm_roles: Vec<String>,
    /// Client roles mapped to the service account user, grouped by client
    #[serde(default)]
    pub client_roles: Vec<ServiceAccountClientRoles>,
    /// Groups the service account user belongs to
    #[serde(default)]
    pub groups: Vec<String>,
    /// User attributes of the service account user, left alone when unset
    #[serde(default)]
    pub attributes: Option<BTreeMap<String, Vec<String>>>,
}

#[derive(Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccountClientRoles {
    /// `clientId` of the client that owns the roles
    pub client_id: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Fine-grained admin permissions for this client
#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FineGrainedPermission {
    #[serde(default)]
    pub scope_permissions: Vec<ScopePermission>,
}

/// Policies attached to one management scope (e.g. `view`, `manage`, `token-exchange`)
#[derive(Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScopePermission {
    pub name: String,
    /// Names of policies defined in the `realm-management` client
    #[serde(default)]
    pub policies: Vec<String>,
}
