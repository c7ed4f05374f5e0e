//! # Configuration
//!
//! Controller and Keycloak connection settings.
//!
//! - `controller`: requeue timings, watch backoff, worker pool and HTTP server settings
//! - `keycloak`: admin API endpoint and credentials

pub mod controller;
pub mod keycloak;

pub use controller::ControllerConfig;
pub use keycloak::{KeycloakConfig, KeycloakCredentials};
