//! # Keycloak Connection Configuration
//!
//! Admin API endpoint and credentials, loaded from environment variables.

use crate::config::controller::{env_var_opt, env_var_or_default, env_var_or_default_str};
use std::time::Duration;

/// How the controller authenticates against the Keycloak token endpoint
#[derive(Clone, PartialEq, Eq)]
pub enum KeycloakCredentials {
    /// Resource owner password grant (typically an admin user in `master`)
    Password { username: String, password: String },
    /// Client credentials grant using a confidential admin client
    ClientCredentials { client_secret: String },
}

impl std::fmt::Debug for KeycloakCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            Self::ClientCredentials { .. } => f
                .debug_struct("ClientCredentials")
                .field("client_secret", &"***")
                .finish(),
        }
    }
}

/// Keycloak admin API configuration
#[derive(Debug, Clone)]
pub struct KeycloakConfig {
    /// Base URL of the Keycloak server, without a trailing slash
    pub url: String,
    /// Realm that issues admin tokens
    pub auth_realm: String,
    /// Client used to request admin tokens
    pub client_id: String,
    pub credentials: KeycloakCredentials,
    /// Upper bound for every admin API call (seconds)
    pub request_timeout_secs: u64,
}

impl KeycloakConfig {
    /// Load configuration from environment variables
    ///
    /// A password grant is used when both `KEYCLOAK_USERNAME` and `KEYCLOAK_PASSWORD`
    /// are set, otherwise the client credentials grant with `KEYCLOAK_CLIENT_SECRET`.
    ///
    /// # Errors
    /// Returns an error when `KEYCLOAK_URL` is missing or no credentials are configured.
    pub fn from_env() -> anyhow::Result<Self> {
        use crate::constants::*;

        let url = env_var_opt("KEYCLOAK_URL")
            .ok_or_else(|| anyhow::anyhow!("KEYCLOAK_URL must be set"))?;

        let credentials = match (env_var_opt("KEYCLOAK_USERNAME"), env_var_opt("KEYCLOAK_PASSWORD")) {
            (Some(username), Some(password)) => KeycloakCredentials::Password { username, password },
            _ => {
                let client_secret = env_var_opt("KEYCLOAK_CLIENT_SECRET").ok_or_else(|| {
                    anyhow::anyhow!(
                        "either KEYCLOAK_USERNAME/KEYCLOAK_PASSWORD or KEYCLOAK_CLIENT_SECRET must be set"
                    )
                })?;
                KeycloakCredentials::ClientCredentials { client_secret }
            }
        };

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            auth_realm: env_var_or_default_str("KEYCLOAK_AUTH_REALM", DEFAULT_KEYCLOAK_AUTH_REALM),
            client_id: env_var_or_default_str("KEYCLOAK_CLIENT_ID", DEFAULT_KEYCLOAK_ADMIN_CLIENT_ID),
            credentials,
            request_timeout_secs: env_var_or_default(
                "KEYCLOAK_REQUEST_TIMEOUT_SECS",
                DEFAULT_KEYCLOAK_REQUEST_TIMEOUT_SECS,
            ),
        })
    }

    /// Config pointing at an explicit URL with password credentials
    #[must_use]
    pub fn with_password(url: &str, username: &str, password: &str) -> Self {
        use crate::constants::*;
        Self {
            url: url.trim_end_matches('/').to_string(),
            auth_realm: DEFAULT_KEYCLOAK_AUTH_REALM.to_string(),
            client_id: DEFAULT_KEYCLOAK_ADMIN_CLIENT_ID.to_string(),
            credentials: KeycloakCredentials::Password {
                username: username.to_string(),
                password: password.to_string(),
            },
            request_timeout_secs: DEFAULT_KEYCLOAK_REQUEST_TIMEOUT_SECS,
        }
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
