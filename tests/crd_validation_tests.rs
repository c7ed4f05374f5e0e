//! # CRD Validation Tests
//!
//! Tests for the `KeycloakClient` CRD to catch schema drift early.
//! These tests validate that sample resources deserialize with the expected
//! defaults, that tagged policy and permission types parse, and that the
//! generated CRD carries the status subresource.

use keycloak_client_controller::controller::reconciler::validation::{
    ValidationError, validate_keycloak_client,
};
use keycloak_client_controller::crd::{
    DecisionStrategy, KeycloakClient, Logic, PermissionKind, PolicyKind, ReconciliationStrategy,
};
use kube::CustomResourceExt;

fn parse(yaml: &str) -> KeycloakClient {
    serde_yaml::from_str(yaml).expect("Should deserialize KeycloakClient")
}

/// Test a minimal resource picks up every default
#[test]
fn test_minimal_client_defaults() {
    let client = parse(
        r"
apiVersion: keycloak.octopilot.io/v1
kind: KeycloakClient
metadata:
  name: orders-api
  namespace: default
spec:
  clientId: orders-api
  realm: shop
",
    );

    let spec = &client.spec;
    assert_eq!(spec.client_id, "orders-api");
    assert_eq!(spec.realm, "shop");
    assert_eq!(spec.reconciliation_strategy, ReconciliationStrategy::Full);
    assert!(spec.enabled);
    assert!(!spec.public);
    assert_eq!(spec.protocol, "openid-connect");
    assert!(spec.secret.is_empty());
    assert!(spec.standard_flow_enabled);
    assert!(!spec.direct_access);
    assert!(spec.client_roles.is_empty());
    assert!(spec.service_account.is_none());
    assert!(spec.authorization.is_none());
    assert!(!spec.admin_fine_grained_permissions_enabled);
    assert!(client.status.is_none());
    assert!(validate_keycloak_client(spec).is_ok());
}

/// Test every policy type deserializes into its variant
#[test]
fn test_policy_types() {
    let client = parse(
        r"
apiVersion: keycloak.octopilot.io/v1
kind: KeycloakClient
metadata:
  name: orders-api
spec:
  clientId: orders-api
  realm: shop
  authorization:
    policies:
      - name: all-of-them
        type: aggregate
        decisionStrategy: AFFIRMATIVE
        policies: [readers, billing]
      - name: billing
        type: client
        clients: [billing-api]
      - name: ops
        type: group
        groupsClaim: groups
        groups:
          - name: ops
            extendChildren: true
      - name: readers
        type: role
        logic: NEGATIVE
        roles:
          - name: orders-api/reader
            required: true
          - name: offline_access
      - name: office-hours
        type: time
        hour: '9'
        hourEnd: '17'
      - name: alice
        type: user
        users: [alice]
",
    );

    let policies = &client
        .spec
        .authorization
        .as_ref()
        .expect("authorization should be set")
        .policies;
    let types: Vec<_> = policies.iter().map(|p| p.kind.type_name()).collect();
    assert_eq!(
        types,
        vec!["aggregate", "client", "group", "role", "time", "user"]
    );

    assert_eq!(policies[0].decision_strategy, DecisionStrategy::Affirmative);
    assert_eq!(policies[1].decision_strategy, DecisionStrategy::Unanimous);
    match &policies[2].kind {
        PolicyKind::Group {
            groups,
            groups_claim,
        } => {
            assert_eq!(groups_claim.as_deref(), Some("groups"));
            assert!(groups[0].extend_children);
        }
        other => panic!("expected group policy, got {other:?}"),
    }
    assert_eq!(policies[3].logic, Logic::Negative);
    match &policies[3].kind {
        PolicyKind::Role { roles } => {
            assert_eq!(roles.len(), 2);
            assert!(roles[0].required);
            assert!(!roles[1].required);
        }
        other => panic!("expected role policy, got {other:?}"),
    }
    match &policies[4].kind {
        PolicyKind::Time(window) => {
            assert_eq!(window.hour.as_deref(), Some("9"));
            assert_eq!(window.hour_end.as_deref(), Some("17"));
            assert!(window.not_before.is_none());
        }
        other => panic!("expected time policy, got {other:?}"),
    }
}

/// Test resource and scope permissions
#[test]
fn test_permission_types() {
    let client = parse(
        r"
apiVersion: keycloak.octopilot.io/v1
kind: KeycloakClient
metadata:
  name: orders-api
spec:
  clientId: orders-api
  realm: shop
  authorization:
    scopes: [read, write]
    resources:
      - name: orders
        type: urn:orders
        uris: [/orders/*]
        scopes: [read, write]
    permissions:
      - name: orders-resource
        type: resource
        resources: [orders]
        policies: [readers]
      - name: orders-write
        type: scope
        scopes: [write]
        policies: [writers]
",
    );

    let authorization = client.spec.authorization.expect("authorization");
    assert_eq!(
        authorization.resources[0].resource_type.as_deref(),
        Some("urn:orders")
    );
    assert!(matches!(
        authorization.permissions[0].kind,
        PermissionKind::Resource {}
    ));
    assert_eq!(authorization.permissions[0].resources, vec!["orders"]);
    match &authorization.permissions[1].kind {
        PermissionKind::Scope { scopes } => assert_eq!(scopes, &vec!["write".to_string()]),
        other => panic!("expected scope permission, got {other:?}"),
    }
}

/// Test an unknown policy type is rejected at parse time
#[test]
fn test_unknown_policy_type_is_rejected() {
    let result: Result<KeycloakClient, _> = serde_yaml::from_str(
        r"
apiVersion: keycloak.octopilot.io/v1
kind: KeycloakClient
metadata:
  name: orders-api
spec:
  clientId: orders-api
  realm: shop
  authorization:
    policies:
      - name: js
        type: js
",
    );
    assert!(result.is_err());
}

/// Test service account, fine-grained permissions and add-only strategy
#[test]
fn test_service_account_and_fine_grained_permissions() {
    let client = parse(
        r"
apiVersion: keycloak.octopilot.io/v1
kind: KeycloakClient
metadata:
  name: orders-api
spec:
  clientId: orders-api
  realm: shop
  reconciliationStrategy: addOnly
  secret: $orders-api-credentials:secret
  serviceAccount:
    enabled: true
    realmRoles: [offline-user]
    clientRoles:
      - clientId: billing
        roles: [invoice-reader]
    groups: [integrations]
    attributes:
      team: [orders]
  adminFineGrainedPermissionsEnabled: true
  permission:
    scopePermissions:
      - name: token-exchange
        policies: [exchangers]
",
    );

    let spec = &client.spec;
    assert_eq!(spec.reconciliation_strategy, ReconciliationStrategy::AddOnly);
    assert!(!spec.reconciliation_strategy.allows_delete());
    let sa = spec.service_account.as_ref().expect("service account");
    assert!(sa.enabled);
    assert_eq!(sa.client_roles[0].client_id, "billing");
    let attributes = sa.attributes.as_ref().expect("attributes");
    assert_eq!(attributes["team"], vec!["orders".to_string()]);
    let permission = spec.permission.as_ref().expect("permission");
    assert_eq!(permission.scope_permissions[0].name, "token-exchange");
    assert!(validate_keycloak_client(spec).is_ok());
}

/// Test cross-field rules that the schema cannot express
#[test]
fn test_cross_field_rules() {
    let public_with_authorization = parse(
        r"
apiVersion: keycloak.octopilot.io/v1
kind: KeycloakClient
metadata:
  name: spa
spec:
  clientId: spa
  realm: shop
  public: true
  authorization:
    scopes: [read]
",
    );
    assert_eq!(
        validate_keycloak_client(&public_with_authorization.spec),
        Err(ValidationError::PublicAuthorization)
    );

    let permission_without_flag = parse(
        r"
apiVersion: keycloak.octopilot.io/v1
kind: KeycloakClient
metadata:
  name: orders-api
spec:
  clientId: orders-api
  realm: shop
  permission:
    scopePermissions:
      - name: view
",
    );
    assert_eq!(
        validate_keycloak_client(&permission_without_flag.spec),
        Err(ValidationError::PermissionWithoutFineGrained)
    );

    let bad_secret = parse(
        r"
apiVersion: keycloak.octopilot.io/v1
kind: KeycloakClient
metadata:
  name: orders-api
spec:
  clientId: orders-api
  realm: shop
  secret: $Not_A_Secret
",
    );
    assert!(matches!(
        validate_keycloak_client(&bad_secret.spec),
        Err(ValidationError::InvalidSecretReference { .. })
    ));
}

/// Test status fields round through the camelCase names the cluster stores
#[test]
fn test_status_deserializes() {
    let client = parse(
        r"
apiVersion: keycloak.octopilot.io/v1
kind: KeycloakClient
metadata:
  name: orders-api
spec:
  clientId: orders-api
  realm: shop
status:
  value: OK
  clientId: 0b6b3c7e-2f44-4c1e-9a8e-8b6f1f0c2d11
  failureCount: 0
  observedGeneration: 3
  nextReconcileTime: '2026-05-01T09:00:00+00:00'
  conditions:
    - type: Ready
      status: 'True'
      reason: ReconciliationSucceeded
",
    );

    assert_eq!(
        client.remote_client_uuid(),
        Some("0b6b3c7e-2f44-4c1e-9a8e-8b6f1f0c2d11")
    );
    assert_eq!(client.failure_count(), 0);
    let status = client.status.expect("status");
    assert_eq!(status.value.as_deref(), Some("OK"));
    assert_eq!(status.observed_generation, Some(3));
    assert_eq!(status.conditions[0].r#type, "Ready");
}

/// Test the generated CRD identity, printer columns and status subresource
#[test]
fn test_generated_crd() {
    let crd = KeycloakClient::crd();
    assert_eq!(
        crd.metadata.name.as_deref(),
        Some("keycloakclients.keycloak.octopilot.io")
    );
    assert_eq!(crd.spec.group, "keycloak.octopilot.io");
    assert_eq!(crd.spec.scope, "Namespaced");
    assert_eq!(crd.spec.names.kind, "KeycloakClient");
    assert_eq!(
        crd.spec.names.short_names.as_deref(),
        Some(&["kcc".to_string()][..])
    );

    let version = &crd.spec.versions[0];
    assert_eq!(version.name, "v1");
    assert!(
        version
            .subresources
            .as_ref()
            .and_then(|s| s.status.as_ref())
            .is_some()
    );
    let columns: Vec<_> = version
        .additional_printer_columns
        .as_ref()
        .expect("printer columns")
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(columns, vec!["Client ID", "Realm", "Status", "Ready"]);

    let schema = serde_json::to_value(&version.schema).expect("schema serializes");
    let spec_schema = &schema["openAPIV3Schema"]["properties"]["spec"];
    let required: Vec<_> = spec_schema["required"]
        .as_array()
        .expect("required list")
        .iter()
        .filter_map(|v| v.as_str())
        .collect();
    assert!(required.contains(&"clientId"));
    assert!(required.contains(&"realm"));
    assert!(spec_schema["properties"]["reconciliationStrategy"].is_object());

    // Tagged policy and permission types flatten into one structural object
    let authorization = &spec_schema["properties"]["authorization"]["properties"];
    let policy = &authorization["policies"]["items"];
    assert!(policy.get("oneOf").is_none());
    assert_eq!(
        policy["properties"]["type"]["enum"],
        serde_json::json!(["aggregate", "client", "group", "role", "time", "user"])
    );
    for field in ["name", "decisionStrategy", "groups", "roles", "hourEnd", "users"] {
        assert!(
            policy["properties"][field].is_object(),
            "policy schema should list {field}"
        );
    }
    let permission = &authorization["permissions"]["items"];
    assert_eq!(
        permission["properties"]["type"]["enum"],
        serde_json::json!(["resource", "scope"])
    );
    assert!(permission["properties"]["scopes"].is_object());
}
