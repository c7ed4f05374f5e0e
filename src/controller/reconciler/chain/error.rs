//! # Sync Errors
//!
//! Errors raised by chain steps, and the classification the control loop uses
//! to pick a retry strategy and a condition reason.

use crate::controller::reconciler::chain::resolver::ReferenceKind;
use crate::controller::reconciler::status::conditions::StepKey;
use crate::controller::reconciler::validation::ValidationError;
use crate::keycloak::KeycloakError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// A name in the document does not exist on the server
    #[error("{kind} {name:?} not found")]
    ReferenceNotFound { kind: ReferenceKind, name: String },

    /// The document asks for something that cannot be expressed remotely
    #[error("{0}")]
    Configuration(String),

    /// Building the remote payload for one desired item failed
    #[error("unable to convert {kind} {name:?}")]
    Convert {
        kind: &'static str,
        name: String,
        #[source]
        source: Box<SyncError>,
    },

    /// A Keycloak call failed
    #[error("unable to {action}")]
    Remote {
        action: String,
        #[source]
        source: KeycloakError,
    },
}

impl SyncError {
    /// Wrap a Keycloak error with the action that was attempted
    pub fn remote(action: impl Into<String>) -> impl FnOnce(KeycloakError) -> Self {
        let action = action.into();
        move |source| Self::Remote { action, source }
    }

    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::ReferenceNotFound { .. } | Self::Configuration(_) => ErrorClass::Configuration,
            Self::Convert { source, .. } => source.class(),
            Self::Remote { source, .. } => ErrorClass::of_keycloak(source),
        }
    }
}

/// A step failed; everything the step applied before the failure stays applied
#[derive(Debug, Error)]
#[error("failed to sync {step}")]
pub struct ChainError {
    pub step: StepKey,
    #[source]
    pub source: SyncError,
}

/// How the control loop treats a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The document is wrong, references something missing or was rejected by
    /// Keycloak; retried with backoff
    Configuration,
    /// Timeouts, 5xx, 429 and connection failures; retried with backoff
    Transient,
    /// Keycloak could not be reached while connecting; fixed retry, not counted
    UpstreamUnavailable,
}

impl ErrorClass {
    /// Classify by walking the error chain for the first known error type
    #[must_use]
    pub fn of(error: &anyhow::Error) -> Self {
        for cause in error.chain() {
            if let Some(chain_error) = cause.downcast_ref::<ChainError>() {
                return chain_error.source.class();
            }
            if let Some(sync_error) = cause.downcast_ref::<SyncError>() {
                return sync_error.class();
            }
            if cause.downcast_ref::<ValidationError>().is_some() {
                return Self::Configuration;
            }
            if let Some(keycloak_error) = cause.downcast_ref::<KeycloakError>() {
                return Self::of_keycloak(keycloak_error);
            }
        }
        Self::Transient
    }

    /// Requests Keycloak rejects outright (4xx other than 429, undecodable
    /// answers) point at the document rather than the server
    #[must_use]
    pub fn of_keycloak(error: &KeycloakError) -> Self {
        if error.is_unavailable() {
            Self::UpstreamUnavailable
        } else if error.is_transient() {
            Self::Transient
        } else {
            Self::Configuration
        }
    }

    /// Condition reason for a failure of this class
    #[must_use]
    pub fn reason(self) -> &'static str {
        match self {
            Self::Configuration => "ConfigurationError",
            Self::Transient | Self::UpstreamUnavailable => "KeycloakAPIError",
        }
    }
}
