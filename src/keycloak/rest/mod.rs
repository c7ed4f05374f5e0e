//! Keycloak Admin REST Client
//!
//! Native REST implementation of [`KeycloakApi`](crate::keycloak::KeycloakApi).
//! Uses reqwest for HTTP requests and the OpenID Connect token endpoint for
//! authentication.
//!
//! - Works directly with Pact HTTP mock servers
//! - One shared `reqwest::Client` per process, safe for concurrent use
//! - Every call is bounded by the client-level request timeout
//!
//! References:
//! - [Keycloak Admin REST API](https://www.keycloak.org/docs-api/latest/rest-api/index.html)

mod api;
mod auth;

pub use auth::{RestConnector, TokenResponse, fetch_access_token};

use crate::keycloak::KeycloakError;
use crate::observability::metrics;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tracing::debug;

/// Keycloak admin REST client bound to one access token
pub struct KeycloakRestClient {
    http_client: Client,
    base_url: String,
    access_token: String,
}

impl std::fmt::Debug for KeycloakRestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeycloakRestClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Build the shared HTTP client with the request timeout applied to every call
///
/// # Errors
/// Returns an error if the TLS backend cannot be initialised
pub fn build_http_client(request_timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(request_timeout)
        .user_agent(concat!("keycloak-client-controller/", env!("CARGO_PKG_VERSION")))
        .build()
}

impl KeycloakRestClient {
    /// Create a client for an already obtained access token
    #[must_use]
    pub fn new(http_client: Client, base_url: &str, access_token: String) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token,
        }
    }

    /// Path prefix of all realm-scoped admin endpoints
    fn realm_path(realm: &str) -> String {
        format!("/admin/realms/{realm}")
    }

    fn authz_path(realm: &str, client_uuid: &str) -> String {
        format!(
            "{}/clients/{client_uuid}/authz/resource-server",
            Self::realm_path(realm)
        )
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http_client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.access_token)
    }

    /// Send a request and map transport and status failures to [`KeycloakError`]
    async fn execute(
        &self,
        operation: &str,
        method: &Method,
        request: RequestBuilder,
    ) -> Result<Response, KeycloakError> {
        let start = Instant::now();
        let result = request.send().await;
        let elapsed = start.elapsed().as_secs_f64();

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                metrics::record_api_request(method.as_str(), "error", elapsed);
                if e.is_timeout() {
                    return Err(KeycloakError::Timeout(operation.to_string()));
                }
                return Err(KeycloakError::Transport {
                    operation: operation.to_string(),
                    source: e,
                });
            }
        };

        let status = response.status();
        metrics::record_api_request(method.as_str(), status.as_str(), elapsed);
        debug!(operation, status = status.as_u16(), elapsed, "keycloak.request");

        if status.is_success() {
            return Ok(response);
        }
        Err(Self::handle_error_response(operation, status, response).await)
    }

    async fn handle_error_response(
        operation: &str,
        status: StatusCode,
        response: Response,
    ) -> KeycloakError {
        if status == StatusCode::NOT_FOUND {
            return KeycloakError::NotFound(operation.to_string());
        }
        let body = response.text().await.unwrap_or_default();
        KeycloakError::Api {
            operation: operation.to_string(),
            status: status.as_u16(),
            body,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, KeycloakError> {
        let response = self
            .execute(operation, &Method::GET, self.request(Method::GET, path).query(query))
            .await?;
        response.json::<T>().await.map_err(|e| KeycloakError::Decode {
            operation: operation.to_string(),
            message: e.to_string(),
        })
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        operation: &str,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<Response, KeycloakError> {
        let request = self.request(method.clone(), path).json(body);
        self.execute(operation, &method, request).await
    }

    async fn put_empty(&self, operation: &str, path: &str) -> Result<(), KeycloakError> {
        self.execute(operation, &Method::PUT, self.request(Method::PUT, path))
            .await
            .map(|_| ())
    }

    async fn delete(&self, operation: &str, path: &str) -> Result<(), KeycloakError> {
        self.execute(operation, &Method::DELETE, self.request(Method::DELETE, path))
            .await
            .map(|_| ())
    }
}

/// Last path segment of a `Location` header, which is the new object's ID
fn id_from_location(operation: &str, response: &Response) -> Result<String, KeycloakError> {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|location| location.trim_end_matches('/').rsplit('/').next())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| KeycloakError::Decode {
            operation: operation.to_string(),
            message: "response has no Location header".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        assert_eq!(KeycloakRestClient::realm_path("shop"), "/admin/realms/shop");
        assert_eq!(
            KeycloakRestClient::authz_path("shop", "c-1"),
            "/admin/realms/shop/clients/c-1/authz/resource-server"
        );
    }

    #[test]
    fn test_debug_hides_token() {
        let client = KeycloakRestClient::new(Client::new(), "http://kc/", "secret-token".into());
        let rendered = format!("{client:?}");
        assert!(rendered.contains("http://kc"));
        assert!(!rendered.contains("secret-token"));
    }
}
