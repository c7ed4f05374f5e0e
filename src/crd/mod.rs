//! # Custom Resource Definitions
//!
//! CRD types for the Keycloak Client Controller.
//!
//! ## Module Structure
//!
//! - `spec.rs` - Main CRD specification and default values
//! - `client.rs` - Roles, protocol mappers, service account, fine-grained permissions
//! - `authorization.rs` - Authorization scopes, resources, policies and permissions
//! - `status.rs` - Status types for tracking reconciliation state

mod authorization;
mod client;
mod spec;
mod status;

pub use authorization::{
    Authorization, DecisionStrategy, GroupDefinition, Logic, Permission, PermissionKind, Policy,
    PolicyKind, Resource, RoleDefinition, TimePolicy,
};
pub use client::{
    ClientRole, FineGrainedPermission, ProtocolMapper, RealmRole, ScopePermission,
    ServiceAccount, ServiceAccountClientRoles,
};
pub use spec::{
    KeycloakClient, KeycloakClientSpec, ReconciliationStrategy, default_protocol, default_true,
};
pub use status::{Condition, KeycloakClientStatus};
