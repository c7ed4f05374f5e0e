//! # Validation
//!
//! Checks a `KeycloakClient` before anything is sent to Keycloak.
//!
//! Validation failures are configuration errors: they are retried with the
//! normal backoff and reported with reason `ConfigurationError`.

mod document;
mod secrets;

pub use document::validate_keycloak_client;
pub use secrets::SecretReference;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },

    /// Two items of one collection share a name
    #[error("duplicate {collection} name {name:?}")]
    DuplicateName {
        collection: &'static str,
        name: String,
    },

    #[error("a public client cannot have a service account")]
    PublicServiceAccount,

    #[error("a public client cannot enable authorization services")]
    PublicAuthorization,

    #[error("permission is set but adminFineGrainedPermissionsEnabled is false")]
    PermissionWithoutFineGrained,

    #[error("invalid secret reference {reference:?}: {reason}")]
    InvalidSecretReference { reference: String, reason: String },

    #[error("client secret {key:?} not found in Secret {namespace}/{name}")]
    MissingSecret {
        namespace: String,
        name: String,
        key: String,
    },
}
