//! # Keycloak Representations
//!
//! JSON payloads of the Keycloak admin REST API.
//!
//! Only the fields the controller reads or writes are modelled; unknown fields
//! are ignored on decode and absent optional fields are omitted on encode.
//!
//! API Reference: <https://www.keycloak.org/docs-api/latest/rest-api/index.html>

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientRepresentation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub client_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub enabled: bool,
    pub public_client: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_url: Option<String>,
    pub redirect_uris: Vec<String>,
    pub web_origins: Vec<String>,
    pub direct_access_grants_enabled: bool,
    pub standard_flow_enabled: bool,
    pub implicit_flow_enabled: bool,
    pub service_accounts_enabled: bool,
    pub authorization_services_enabled: bool,
    pub attributes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoleRepresentation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub composite: bool,
    pub client_role: bool,
    /// UUID of the owning client for client roles, realm ID for realm roles
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroupRepresentation {
    pub id: String,
    pub name: String,
    pub path: String,
    /// Newer servers report only the count and serve children separately
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_group_count: Option<u64>,
    pub sub_groups: Vec<GroupRepresentation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserRepresentation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub username: String,
    pub enabled: bool,
    pub attributes: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientScopeRepresentation {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
}

/// Which client scope list a realm client scope is linked into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeBinding {
    Default,
    Optional,
}

impl ScopeBinding {
    /// Path segment used by the admin API
    #[must_use]
    pub fn path_segment(self) -> &'static str {
        match self {
            Self::Default => "default-client-scopes",
            Self::Optional => "optional-client-scopes",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProtocolMapperRepresentation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub protocol: String,
    pub protocol_mapper: String,
    pub config: BTreeMap<String, String>,
}

/// Authorization scope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScopeRepresentation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Authorization resource; Keycloak names its identifier `_id`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceRepresentation {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(rename = "icon_uri", skip_serializing_if = "Option::is_none")]
    pub icon_uri: Option<String>,
    pub owner_managed_access: bool,
    pub uris: Vec<String>,
    pub attributes: BTreeMap<String, Vec<String>>,
    pub scopes: Vec<ScopeRepresentation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPolicyEntry {
    pub id: String,
    pub extend_children: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolePolicyEntry {
    pub id: String,
    pub required: bool,
}

/// Authorization policy of any type
///
/// Only the fields of the policy's own type are set; the rest stay `None`
/// and are left out of the payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyRepresentation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub policy_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision_strategy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logic: Option<String>,
    /// aggregate: policy IDs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policies: Option<Vec<String>>,
    /// client: client UUIDs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clients: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<GroupPolicyEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups_claim: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<RolePolicyEntry>>,
    /// user: user IDs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_before: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_on_or_after: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_month: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_month_end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month_end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hour: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hour_end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minute: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minute_end: Option<String>,
}

/// Resource or scope permission
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PermissionRepresentation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub permission_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision_strategy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logic: Option<String>,
    /// Policy IDs
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<String>,
    /// Resource IDs
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<String>,
    /// Scope IDs
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
}

/// Fine-grained admin permission state of a client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManagementPermissionReference {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    /// Management scope name to the ID of its permission in `realm-management`
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub scope_permissions: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resource_uses_keycloak_field_names() {
        let resource: ResourceRepresentation = serde_json::from_value(json!({
            "_id": "r-1",
            "name": "orders",
            "type": "urn:orders",
            "icon_uri": "https://example.com/icon.png",
            "ownerManagedAccess": true,
            "scopes": [{"id": "s-1", "name": "read"}]
        }))
        .expect("resource should decode");
        assert_eq!(resource.id.as_deref(), Some("r-1"));
        assert_eq!(resource.resource_type.as_deref(), Some("urn:orders"));
        assert_eq!(resource.scopes[0].name, "read");
        assert!(resource.uris.is_empty());
    }

    #[test]
    fn test_policy_omits_fields_of_other_types() {
        let policy = PolicyRepresentation {
            name: "by-user".to_string(),
            policy_type: "user".to_string(),
            users: Some(vec!["u-1".to_string()]),
            ..Default::default()
        };
        let value = serde_json::to_value(&policy).expect("policy should encode");
        assert_eq!(value["type"], "user");
        assert_eq!(value["users"], json!(["u-1"]));
        assert!(value.get("roles").is_none());
        assert!(value.get("id").is_none());
    }
}
