//! # Authorization Services
//!
//! Scopes, resources, policies and permissions of a client's resource server.
//!
//! Policies and permissions are tagged by `type`; variant-specific fields sit
//! next to the common ones:
//!
//! ```yaml
//! policies:
//!   - name: office-hours
//!     type: time
//!     notBefore: "2024-01-01 00:00:00"
//!     notOnOrAfter: "2030-01-01 00:00:00"
//!     hour: "8"
//!     hourEnd: "18"
//!   - name: admins-only
//!     type: group
//!     logic: NEGATIVE
//!     groups:
//!       - name: admins
//!         extendChildren: true
//! ```

use schemars::{JsonSchema, Schema, SchemaGenerator, json_schema};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::borrow::Cow;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Authorization {
    /// Authorization scope names
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub policies: Vec<Policy>,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

/// Protected resource of the resource server
#[derive(Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default, rename = "type")]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub icon_uri: Option<String>,
    #[serde(default)]
    pub owner_managed_access: bool,
    #[serde(default)]
    pub uris: Vec<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, Vec<String>>,
    /// Authorization scope names
    #[serde(default)]
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionStrategy {
    #[default]
    Unanimous,
    Affirmative,
    Consensus,
}

impl DecisionStrategy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unanimous => "UNANIMOUS",
            Self::Affirmative => "AFFIRMATIVE",
            Self::Consensus => "CONSENSUS",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Logic {
    #[default]
    Positive,
    Negative,
}

impl Logic {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "POSITIVE",
            Self::Negative => "NEGATIVE",
        }
    }
}

/// Authorization policy
///
/// `type` picks the policy kind: `aggregate` combines other policies, `client`,
/// `group`, `role` and `user` grant access by identity, and `time` grants access
/// inside a time window. Role names are realm roles unless written `clientId/role`.
#[derive(Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub decision_strategy: DecisionStrategy,
    #[serde(default)]
    pub logic: Logic,
    #[serde(flatten)]
    pub kind: PolicyKind,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PolicyKind {
    Aggregate {
        #[serde(default)]
        policies: Vec<String>,
    },
    // by `clientId`
    Client {
        #[serde(default)]
        clients: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    Group {
        #[serde(default)]
        groups: Vec<GroupDefinition>,
        #[serde(default)]
        groups_claim: Option<String>,
    },
    Role {
        #[serde(default)]
        roles: Vec<RoleDefinition>,
    },
    Time(TimePolicy),
    // by username
    User {
        #[serde(default)]
        users: Vec<String>,
    },
}

impl PolicyKind {
    /// Policy type as Keycloak names it in paths and payloads
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Aggregate { .. } => "aggregate",
            Self::Client { .. } => "client",
            Self::Group { .. } => "group",
            Self::Role { .. } => "role",
            Self::Time(_) => "time",
            Self::User { .. } => "user",
        }
    }
}

impl JsonSchema for PolicyKind {
    fn schema_name() -> Cow<'static, str> {
        Cow::Borrowed("PolicyKind")
    }

    fn inline_schema() -> bool {
        true
    }

    // Structural schemas forbid per-variant `type` properties, so every
    // variant's fields are listed side by side on one object
    fn json_schema(generator: &mut SchemaGenerator) -> Schema {
        let mut properties = serde_json::Map::new();
        properties.insert(
            "type".to_string(),
            json!({
                "type": "string",
                "enum": ["aggregate", "client", "group", "role", "time", "user"],
                "description": "Policy type"
            }),
        );
        properties.insert(
            "policies".to_string(),
            json!(generator.subschema_for::<Vec<String>>()),
        );
        properties.insert(
            "clients".to_string(),
            json!(generator.subschema_for::<Vec<String>>()),
        );
        properties.insert(
            "groups".to_string(),
            json!(generator.subschema_for::<Vec<GroupDefinition>>()),
        );
        properties.insert(
            "groupsClaim".to_string(),
            json!(generator.subschema_for::<Option<String>>()),
        );
        properties.insert(
            "roles".to_string(),
            json!(generator.subschema_for::<Vec<RoleDefinition>>()),
        );
        properties.insert(
            "users".to_string(),
            json!(generator.subschema_for::<Vec<String>>()),
        );
        if let Some(Value::Object(window)) = TimePolicy::json_schema(generator).get("properties") {
            properties.extend(window.clone());
        }

        json_schema!({
            "type": "object",
            "required": ["type"],
            "properties": properties
        })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GroupDefinition {
    /// Group name; nested groups are matched anywhere in the tree
    pub name: String,
    #[serde(default)]
    pub extend_children: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoleDefinition {
    pub name: String,
    #[serde(default)]
    pub required: bool,
}

/// Time window, values are passed to Keycloak as text
#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimePolicy {
    /// Format: `yyyy-MM-dd HH:mm:ss`
    #[serde(default)]
    pub not_before: Option<String>,
    /// Format: `yyyy-MM-dd HH:mm:ss`
    #[serde(default)]
    pub not_on_or_after: Option<String>,
    #[serde(default)]
    pub day_month: Option<String>,
    #[serde(default)]
    pub day_month_end: Option<String>,
    #[serde(default)]
    pub month: Option<String>,
    #[serde(default)]
    pub month_end: Option<String>,
    #[serde(default)]
    pub hour: Option<String>,
    #[serde(default)]
    pub hour_end: Option<String>,
    #[serde(default)]
    pub minute: Option<String>,
    #[serde(default)]
    pub minute_end: Option<String>,
}

/// Authorization permission
///
/// A `resource` permission applies to whole resources, a `scope` permission to
/// scopes, optionally narrowed to resources.
#[derive(Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub decision_strategy: DecisionStrategy,
    #[serde(default)]
    pub logic: Logic,
    /// Policy names
    #[serde(default)]
    pub policies: Vec<String>,
    /// Resource names
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(flatten)]
    pub kind: PermissionKind,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PermissionKind {
    Resource {},
    Scope {
        /// Authorization scope names
        #[serde(default)]
        scopes: Vec<String>,
    },
}

impl PermissionKind {
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Resource {} => "resource",
            Self::Scope { .. } => "scope",
        }
    }
}

impl JsonSchema for PermissionKind {
    fn schema_name() -> Cow<'static, str> {
        Cow::Borrowed("PermissionKind")
    }

    fn inline_schema() -> bool {
        true
    }

    fn json_schema(generator: &mut SchemaGenerator) -> Schema {
        let scopes = generator.subschema_for::<Vec<String>>();
        json_schema!({
            "type": "object",
            "required": ["type"],
            "properties": {
                "type": {
                    "type": "string",
                    "enum": ["resource", "scope"],
                    "description": "Permission type"
                },
                "scopes": scopes
            }
        })
    }
}
