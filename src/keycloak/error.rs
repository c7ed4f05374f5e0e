//! Errors returned by the Keycloak admin API layer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeycloakError {
    /// The addressed object does not exist (HTTP 404)
    #[error("{0} not found")]
    NotFound(String),

    /// Keycloak cannot be reached or refused our credentials while connecting
    #[error("keycloak is unavailable: {0}")]
    Unavailable(String),

    /// The call exceeded the configured request timeout
    #[error("request to {0} timed out")]
    Timeout(String),

    /// Keycloak answered with a non-success status
    #[error("keycloak returned {status} for {operation}: {body}")]
    Api {
        operation: String,
        status: u16,
        body: String,
    },

    /// Connection-level failure during a call
    #[error("transport error during {operation}")]
    Transport {
        operation: String,
        #[source]
        source: reqwest::Error,
    },

    /// The response body could not be decoded
    #[error("unable to decode response of {operation}: {message}")]
    Decode { operation: String, message: String },
}

impl KeycloakError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Errors raised while connecting or authenticating
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    /// Errors worth retrying as-is: timeouts, 5xx, 429 and connection failures
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Transport { .. } | Self::Unavailable(_) => true,
            Self::Api { status, .. } => *status >= 500 || *status == 429,
            Self::NotFound(_) | Self::Decode { .. } => false,
        }
    }
}
