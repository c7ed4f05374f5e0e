//! # Document Validation
//!
//! Structural checks on `KeycloakClientSpec` that Keycloak would otherwise
//! reject halfway through a reconciliation.

use crate::controller::reconciler::validation::{SecretReference, ValidationError};
use crate::crd::KeycloakClientSpec;
use std::collections::HashSet;

/// Validate a document
///
/// # Errors
/// Returns the first problem found.
pub fn validate_keycloak_client(spec: &KeycloakClientSpec) -> Result<(), ValidationError> {
    if spec.client_id.trim().is_empty() {
        return Err(ValidationError::EmptyField { field: "clientId" });
    }
    if spec.realm.trim().is_empty() {
        return Err(ValidationError::EmptyField { field: "realm" });
    }

    if spec.public && spec.service_account.as_ref().is_some_and(|sa| sa.enabled) {
        return Err(ValidationError::PublicServiceAccount);
    }
    if spec.public && spec.authorization.is_some() {
        return Err(ValidationError::PublicAuthorization);
    }
    if spec.permission.is_some() && !spec.admin_fine_grained_permissions_enabled {
        return Err(ValidationError::PermissionWithoutFineGrained);
    }
    if !spec.public {
        SecretReference::parse(&spec.secret)?;
    }

    unique_names("client role", spec.client_roles.iter().map(|r| r.name.as_str()))?;
    unique_names("realm role", spec.realm_roles.iter().map(|r| r.name.as_str()))?;
    unique_names(
        "protocol mapper",
        spec.protocol_mappers.iter().map(|m| m.name.as_str()),
    )?;

    if let Some(authorization) = &spec.authorization {
        unique_names(
            "authorization scope",
            authorization.scopes.iter().map(String::as_str),
        )?;
        unique_names(
            "authorization resource",
            authorization.resources.iter().map(|r| r.name.as_str()),
        )?;
        // Policies and permissions share one namespace in Keycloak
        unique_names(
            "authorization policy",
            authorization
                .policies
                .iter()
                .map(|p| p.name.as_str())
                .chain(authorization.permissions.iter().map(|p| p.name.as_str())),
        )?;
    }

    if let Some(permission) = &spec.permission {
        unique_names(
            "fine-grained permission scope",
            permission.scope_permissions.iter().map(|s| s.name.as_str()),
        )?;
    }

    Ok(())
}

fn unique_names<'a>(
    collection: &'static str,
    names: impl Iterator<Item = &'a str>,
) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for name in names {
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyField {
                field: "name",
            });
        }
        if !seen.insert(name) {
            return Err(ValidationError::DuplicateName {
                collection,
                name: name.to_string(),
            });
        }
    }
    Ok(())
}
