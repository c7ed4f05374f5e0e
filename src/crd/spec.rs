//! # KeycloakClient Spec
//!
//! Main CRD specification types and default values.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// KeycloakClient Custom Resource Definition
///
/// Declares a Keycloak client together with everything hanging off it: roles,
/// scopes, protocol mappers, the service account and authorization services.
///
/// # Example
///
/// ```yaml
/// apiVersion: keycloak.octopilot.io/v1
/// kind: KeycloakClient
/// metadata:
///   name: orders-api
///   namespace: default
/// spec:
///   clientId: orders-api
///   realm: shop
///   secret: $orders-api-credentials:clientSecret
///   redirectUris:
///     - https://orders.example.com/*
///   clientRoles:
///     - name: reader
///   authorization:
///     scopes: [read, write]
///     policies:
///       - name: readers
///         type: role
///         roles:
///           - name: orders-api/reader
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "KeycloakClient",
    group = "keycloak.octopilot.io",
    version = "v1",
    namespaced,
    status = "crate::crd::KeycloakClientStatus",
    shortname = "kcc",
    printcolumn = r#"{"name":"Client ID", "type":"string", "jsonPath":".spec.clientId"}, {"name":"Realm", "type":"string", "jsonPath":".spec.realm"}, {"name":"Status", "type":"string", "jsonPath":".status.value"}, {"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct KeycloakClientSpec {
    /// Client identifier inside the realm (the `clientId`, not the internal UUID)
    pub client_id: String,
    /// Realm that owns the client
    pub realm: String,
    /// `full` removes remote objects missing from this document, `addOnly` never deletes
    #[serde(default)]
    pub reconciliation_strategy: ReconciliationStrategy,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Public clients have no secret and cannot use a service account
    #[serde(default)]
    pub public: bool,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    /// Client secret reference
    /// Format: `$secretName:key`, or a bare Secret name (key `clientSecret`)
    /// Empty lets Keycloak generate the secret
    #[serde(default)]
    pub secret: String,
    /// Root URL
    #[serde(default)]
    pub web_url: Option<String>,
    /// Base URL
    #[serde(default)]
    pub home_url: Option<String>,
    #[serde(default)]
    pub admin_url: Option<String>,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    #[serde(default)]
    pub web_origins: Vec<String>,
    /// Direct access grants (resource owner password flow)
    #[serde(default)]
    pub direct_access: bool,
    #[serde(default = "default_true")]
    pub standard_flow_enabled: bool,
    #[serde(default)]
    pub implicit_flow_enabled: bool,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub client_roles: Vec<crate::crd::ClientRole>,
    /// Realm roles created on behalf of this client
    #[serde(default)]
    pub realm_roles: Vec<crate::crd::RealmRole>,
    /// Realm client scopes linked as default scopes
    #[serde(default)]
    pub default_client_scopes: Vec<String>,
    /// Realm client scopes linked as optional scopes
    #[serde(default)]
    pub optional_client_scopes: Vec<String>,
    #[serde(default)]
    pub protocol_mappers: Vec<crate::crd::ProtocolMapper>,
    #[serde(default)]
    pub service_account: Option<crate::crd::ServiceAccount>,
    /// Authorization services; enables them on the client when set
    #[serde(default)]
    pub authorization: Option<crate::crd::Authorization>,
    #[serde(default)]
    pub admin_fine_grained_permissions_enabled: bool,
    /// Fine-grained admin permission policies (requires `adminFineGrainedPermissionsEnabled`)
    #[serde(default)]
    pub permission: Option<crate::crd::FineGrainedPermission>,
}

/// Whether remote objects absent from the document are removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum ReconciliationStrategy {
    /// Create, update and delete so the remote side matches exactly
    #[default]
    Full,
    /// Create and update only
    AddOnly,
}

impl ReconciliationStrategy {
    #[must_use]
    pub fn allows_delete(self) -> bool {
        matches!(self, Self::Full)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::AddOnly => "addOnly",
        }
    }
}

impl KeycloakClient {
    /// True when the preserve-on-deletion annotation is set to `true`
    #[must_use]
    pub fn preserve_resources_on_deletion(&self) -> bool {
        self.metadata
            .annotations
            .as_ref()
            .and_then(|ann| ann.get(crate::constants::PRESERVE_RESOURCES_ON_DELETION_ANNOTATION))
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }

    /// True when the manual reconcile annotation is present
    #[must_use]
    pub fn has_manual_trigger(&self) -> bool {
        self.metadata
            .annotations
            .as_ref()
            .is_some_and(|ann| ann.contains_key(crate::constants::RECONCILE_TRIGGER_ANNOTATION))
    }

    #[must_use]
    pub fn is_being_deleted(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    /// Remote client UUID recorded by a previous reconciliation
    #[must_use]
    pub fn remote_client_uuid(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|s| s.client_id.as_deref())
            .filter(|id| !id.is_empty())
    }

    #[must_use]
    pub fn failure_count(&self) -> i64 {
        self.status.as_ref().map_or(0, |s| s.failure_count)
    }
}

/// Default value for the client protocol
pub fn default_protocol() -> String {
    "openid-connect".to_string()
}

/// Default value for boolean true
pub fn default_true() -> bool {
    true
}
