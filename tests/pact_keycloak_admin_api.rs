//! Pact contract tests for the Keycloak Admin REST API
//!
//! These tests define the contract between the Keycloak Client Controller and the
//! Keycloak admin API. Requests are made by the real REST connector against a
//! Pact mock server, so paths, auth headers and error mapping are all covered.

#[cfg(test)]
mod common;

use common::init_rustls;
use keycloak_client_controller::config::{KeycloakConfig, KeycloakCredentials};
use keycloak_client_controller::keycloak::{
    ClientRepresentation, KeycloakConnector, KeycloakError, RestConnector, RoleRepresentation,
};
use pact_consumer::prelude::*;
use serde_json::json;

const CONSUMER: &str = "Keycloak-Client-Controller";
const PROVIDER: &str = "Keycloak-Admin-API";

/// Token request answered for the client credentials grant
fn token_interaction(pact_builder: &mut PactBuilder) {
    pact_builder.interaction("request an admin access token", "", |mut i| {
        i.given("the admin-cli client accepts client credentials");
        i.request
            .method("POST")
            .path("/realms/master/protocol/openid-connect/token")
            .header("content-type", "application/x-www-form-urlencoded");
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "access_token": "test-token",
                "expires_in": 60,
                "token_type": "Bearer"
            }));
        i
    });
}

/// Connector configuration pointing at the mock server
fn config_for(mock_url: &str) -> KeycloakConfig {
    KeycloakConfig {
        // mock_server.url() renders with a trailing slash
        url: mock_url.trim_end_matches('/').to_string(),
        auth_realm: "master".to_string(),
        client_id: "admin-cli".to_string(),
        credentials: KeycloakCredentials::ClientCredentials {
            client_secret: "admin-secret".to_string(),
        },
        request_timeout_secs: 5,
    }
}

#[tokio::test]
async fn test_keycloak_get_client_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new(CONSUMER, PROVIDER);
    token_interaction(&mut pact_builder);

    pact_builder.interaction("look up a client by clientId", "", |mut i| {
        i.given("client orders-api exists in realm shop");
        i.request
            .method("GET")
            .path("/admin/realms/shop/clients")
            .query_param("clientId", "orders-api")
            .header("authorization", "Bearer test-token");
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!([{
                "id": "6c1f0d0e-8d7a-4f5b-9a55-3c1a0f6f2a10",
                "clientId": "orders-api",
                "enabled": true,
                "publicClient": false,
                "protocol": "openid-connect",
                "serviceAccountsEnabled": true,
                "redirectUris": ["https://orders.example.com/*"],
                "webOrigins": []
            }]));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let connector =
        RestConnector::new(config_for(mock_server.url().as_str())).expect("Failed to build connector");

    let api = connector.connect().await.expect("Failed to connect");
    let client = api
        .get_client("shop", "orders-api")
        .await
        .expect("Failed to get client")
        .expect("client should exist");

    assert_eq!(
        client.id.as_deref(),
        Some("6c1f0d0e-8d7a-4f5b-9a55-3c1a0f6f2a10")
    );
    assert!(client.service_accounts_enabled);
    assert_eq!(client.redirect_uris, vec!["https://orders.example.com/*"]);
}

#[tokio::test]
async fn test_keycloak_create_client_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new(CONSUMER, PROVIDER);
    token_interaction(&mut pact_builder);

    let client = ClientRepresentation {
        client_id: "orders-api".to_string(),
        enabled: true,
        secret: Some("s3cr3t".to_string()),
        ..Default::default()
    };
    // Request bodies are matched strictly, so the contract is the full payload
    let payload = serde_json::to_value(&client).expect("client serializes");
    assert_eq!(payload["clientId"], "orders-api");
    assert_eq!(payload["secret"], "s3cr3t");
    assert!(payload.get("id").is_none());

    pact_builder.interaction("create a confidential client", "", |mut i| {
        i.given("realm shop exists");
        i.request
            .method("POST")
            .path("/admin/realms/shop/clients")
            .header("authorization", "Bearer test-token")
            .header("content-type", "application/json")
            .json_body(payload.clone());
        i.response.status(201).header(
            "location",
            "http://keycloak/admin/realms/shop/clients/6c1f0d0e-8d7a-4f5b-9a55-3c1a0f6f2a10",
        );
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let connector =
        RestConnector::new(config_for(mock_server.url().as_str())).expect("Failed to build connector");
    let api = connector.connect().await.expect("Failed to connect");

    let id = api
        .create_client("shop", &client)
        .await
        .expect("Failed to create client");

    assert_eq!(id, "6c1f0d0e-8d7a-4f5b-9a55-3c1a0f6f2a10");
}

#[tokio::test]
async fn test_keycloak_create_client_role_server_error_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new(CONSUMER, PROVIDER);
    token_interaction(&mut pact_builder);

    pact_builder.interaction("create a client role while Keycloak is failing", "", |mut i| {
        i.given("the Keycloak database is unavailable");
        i.request
            .method("POST")
            .path("/admin/realms/shop/clients/c-1/roles")
            .header("authorization", "Bearer test-token");
        i.response
            .status(503)
            .header("content-type", "application/json")
            .json_body(json!({ "error": "unknown_error" }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let connector =
        RestConnector::new(config_for(mock_server.url().as_str())).expect("Failed to build connector");
    let api = connector.connect().await.expect("Failed to connect");

    let role = RoleRepresentation {
        name: "reader".to_string(),
        client_role: true,
        ..Default::default()
    };
    let error = api
        .create_client_role("shop", "c-1", &role)
        .await
        .expect_err("creation should fail");

    match &error {
        KeycloakError::Api { status, body, .. } => {
            assert_eq!(*status, 503);
            assert!(body.contains("unknown_error"));
        }
        other => panic!("expected API error, got {other:?}"),
    }
    assert!(error.is_transient());
}

#[tokio::test]
async fn test_keycloak_delete_missing_client_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new(CONSUMER, PROVIDER);
    token_interaction(&mut pact_builder);

    pact_builder.interaction("delete a client that no longer exists", "", |mut i| {
        i.given("client gone-uuid does not exist in realm shop");
        i.request
            .method("DELETE")
            .path("/admin/realms/shop/clients/gone-uuid")
            .header("authorization", "Bearer test-token");
        i.response
            .status(404)
            .header("content-type", "application/json")
            .json_body(json!({ "error": "Could not find client" }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let connector =
        RestConnector::new(config_for(mock_server.url().as_str())).expect("Failed to build connector");
    let api = connector.connect().await.expect("Failed to connect");

    let error = api
        .delete_client("shop", "gone-uuid")
        .await
        .expect_err("deletion should report not found");
    assert!(error.is_not_found());
}

#[tokio::test]
async fn test_keycloak_rejected_credentials_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new(CONSUMER, PROVIDER);

    pact_builder.interaction("request a token with invalid credentials", "", |mut i| {
        i.given("the admin-cli client rejects the secret");
        i.request
            .method("POST")
            .path("/realms/master/protocol/openid-connect/token");
        i.response
            .status(401)
            .header("content-type", "application/json")
            .json_body(json!({
                "error": "unauthorized_client",
                "error_description": "Invalid client or Invalid client credentials"
            }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let connector =
        RestConnector::new(config_for(mock_server.url().as_str())).expect("Failed to build connector");

    let Err(error) = connector.connect().await else {
        panic!("connect should fail with rejected credentials");
    };
    assert!(error.is_unavailable());
    assert!(error.to_string().contains("401"));
}
