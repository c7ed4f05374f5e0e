//! Admin token acquisition and the REST connector.

use crate::config::{KeycloakConfig, KeycloakCredentials};
use crate::keycloak::{KeycloakApi, KeycloakConnector, KeycloakError, KeycloakRestClient};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{Instrument, debug, info_span};

/// OpenID Connect token endpoint response
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: u64,
}

/// Request an admin access token
///
/// Every failure is reported as [`KeycloakError::Unavailable`]: without a token
/// nothing else can proceed.
///
/// # Errors
/// Returns `Unavailable` if the token endpoint cannot be reached, rejects the
/// credentials or returns an unreadable body.
pub async fn fetch_access_token(
    http_client: &Client,
    config: &KeycloakConfig,
) -> Result<String, KeycloakError> {
    let url = format!(
        "{}/realms/{}/protocol/openid-connect/token",
        config.url, config.auth_realm
    );

    let mut form: Vec<(&str, &str)> = vec![("client_id", config.client_id.as_str())];
    match &config.credentials {
        KeycloakCredentials::Password { username, password } => {
            form.push(("grant_type", "password"));
            form.push(("username", username.as_str()));
            form.push(("password", password.as_str()));
        }
        KeycloakCredentials::ClientCredentials { client_secret } => {
            form.push(("grant_type", "client_credentials"));
            form.push(("client_secret", client_secret.as_str()));
        }
    }

    let response = http_client
        .post(&url)
        .form(&form)
        .send()
        .await
        .map_err(|e| KeycloakError::Unavailable(format!("token request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(KeycloakError::Unavailable(format!(
            "token endpoint returned {status}: {body}"
        )));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| KeycloakError::Unavailable(format!("unreadable token response: {e}")))?;
    debug!(expires_in = token.expires_in, "keycloak.token.acquired");
    Ok(token.access_token)
}

/// Connects to Keycloak over HTTP with the configured admin credentials
pub struct RestConnector {
    http_client: Client,
    config: KeycloakConfig,
}

impl std::fmt::Debug for RestConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestConnector")
            .field("url", &self.config.url)
            .field("auth_realm", &self.config.auth_realm)
            .finish_non_exhaustive()
    }
}

impl RestConnector {
    /// Create a connector with its own HTTP client
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built
    pub fn new(config: KeycloakConfig) -> Result<Self, reqwest::Error> {
        let http_client = super::build_http_client(config.request_timeout())?;
        Ok(Self {
            http_client,
            config,
        })
    }
}

#[async_trait]
impl KeycloakConnector for RestConnector {
    async fn connect(&self) -> Result<Arc<dyn KeycloakApi>, KeycloakError> {
        let span = info_span!(
            "keycloak.connect",
            url = self.config.url.as_str(),
            auth_realm = self.config.auth_realm.as_str()
        );
        let token = fetch_access_token(&self.http_client, &self.config)
            .instrument(span)
            .await?;
        Ok(Arc::new(KeycloakRestClient::new(
            self.http_client.clone(),
            &self.config.url,
            token,
        )))
    }
}
