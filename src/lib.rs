//! Keycloak Client Controller Library
//!
//! Reconciles `KeycloakClient` documents into clients of a Keycloak realm:
//! the client itself, its roles, scopes, protocol mappers, service account,
//! authorization services and fine-grained admin permissions.
//!
//! ## Quick Start
//!
//! ```rust
//! use keycloak_client_controller::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod keycloak;
pub mod observability;
pub mod prelude;
pub mod runtime;
