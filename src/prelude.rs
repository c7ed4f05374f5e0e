//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ```rust
//! use keycloak_client_controller::prelude::*;
//! ```

// CRD types - most commonly used
pub use crate::crd::*;

// Keycloak admin API seam - implement these to substitute the server
pub use crate::keycloak::{KeycloakApi, KeycloakConnector, KeycloakError, RestConnector};

// Reconciler types - core controller functionality
pub use crate::controller::reconciler::{
    reconcile, run_attempt, Reconciler, ReconcilerError, TriggerSource,
};

// Config types - for configuration management
pub use crate::config::{ControllerConfig, KeycloakConfig, KeycloakCredentials};
