//! # Variant Converter
//!
//! Builds admin API payloads from authorization declarations. Every name is
//! resolved to its remote ID; the first unknown name fails the conversion.
//! Conversions only read from Keycloak.

use crate::controller::reconciler::chain::error::SyncError;
use crate::controller::reconciler::chain::resolver::{ReferenceKind, Resolver};
use crate::crd::{
    GroupDefinition, Permission, PermissionKind, Policy, PolicyKind, Resource, RoleDefinition,
    TimePolicy,
};
use crate::keycloak::{
    GroupPolicyEntry, PermissionRepresentation, PolicyRepresentation, ResourceRepresentation,
    RolePolicyEntry, ScopeRepresentation,
};

/// # Errors
/// Fails when one of the resource's scopes does not exist.
pub async fn convert_resource(
    resolver: &Resolver<'_>,
    resource: &Resource,
) -> Result<ResourceRepresentation, SyncError> {
    let scope_ids = resolver
        .resolve_all(ReferenceKind::Scope, &resource.scopes)
        .await?;
    let scopes = resource
        .scopes
        .iter()
        .zip(scope_ids)
        .map(|(name, id)| ScopeRepresentation {
            id: Some(id),
            name: name.clone(),
            display_name: None,
        })
        .collect();

    Ok(ResourceRepresentation {
        id: None,
        name: resource.name.clone(),
        display_name: resource.display_name.clone(),
        resource_type: resource.resource_type.clone(),
        icon_uri: resource.icon_uri.clone(),
        owner_managed_access: resource.owner_managed_access,
        uris: resource.uris.clone(),
        attributes: resource.attributes.clone(),
        scopes,
    })
}

/// # Errors
/// Fails when a referenced policy, client, group, role or user does not exist.
pub async fn convert_policy(
    resolver: &Resolver<'_>,
    policy: &Policy,
) -> Result<PolicyRepresentation, SyncError> {
    let common = PolicyRepresentation {
        id: None,
        name: policy.name.clone(),
        policy_type: policy.kind.type_name().to_string(),
        description: policy.description.clone(),
        decision_strategy: Some(policy.decision_strategy.as_str().to_string()),
        logic: Some(policy.logic.as_str().to_string()),
        ..Default::default()
    };

    match &policy.kind {
        PolicyKind::Aggregate { policies } => Ok(PolicyRepresentation {
            policies: Some(resolver.resolve_all(ReferenceKind::Policy, policies).await?),
            ..common
        }),
        PolicyKind::Client { clients } => Ok(PolicyRepresentation {
            clients: Some(resolver.resolve_all(ReferenceKind::Client, clients).await?),
            ..common
        }),
        PolicyKind::Group {
            groups,
            groups_claim,
        } => Ok(PolicyRepresentation {
            groups: Some(group_entries(resolver, groups).await?),
            groups_claim: groups_claim.clone(),
            ..common
        }),
        PolicyKind::Role { roles } => Ok(PolicyRepresentation {
            roles: Some(role_entries(resolver, roles).await?),
            ..common
        }),
        PolicyKind::Time(window) => Ok(time_policy(common, window)),
        PolicyKind::User { users } => Ok(PolicyRepresentation {
            users: Some(resolver.resolve_all(ReferenceKind::User, users).await?),
            ..common
        }),
    }
}

/// # Errors
/// Fails when a referenced policy, resource or scope does not exist.
pub async fn convert_permission(
    resolver: &Resolver<'_>,
    permission: &Permission,
) -> Result<PermissionRepresentation, SyncError> {
    let policies = resolver
        .resolve_all(ReferenceKind::Policy, &permission.policies)
        .await?;
    let resources = resolver
        .resolve_all(ReferenceKind::Resource, &permission.resources)
        .await?;
    let scopes = match &permission.kind {
        PermissionKind::Resource {} => Vec::new(),
        PermissionKind::Scope { scopes } => {
            resolver.resolve_all(ReferenceKind::Scope, scopes).await?
        }
    };

    Ok(PermissionRepresentation {
        id: None,
        name: permission.name.clone(),
        permission_type: permission.kind.type_name().to_string(),
        description: permission.description.clone(),
        decision_strategy: Some(permission.decision_strategy.as_str().to_string()),
        logic: Some(permission.logic.as_str().to_string()),
        policies,
        resources,
        scopes,
    })
}

async fn group_entries(
    resolver: &Resolver<'_>,
    groups: &[GroupDefinition],
) -> Result<Vec<GroupPolicyEntry>, SyncError> {
    let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
    let ids = resolver.resolve_all(ReferenceKind::Group, &names).await?;
    Ok(groups
        .iter()
        .zip(ids)
        .map(|(group, id)| GroupPolicyEntry {
            id,
            extend_children: group.extend_children,
        })
        .collect())
}

async fn role_entries(
    resolver: &Resolver<'_>,
    roles: &[RoleDefinition],
) -> Result<Vec<RolePolicyEntry>, SyncError> {
    let names: Vec<&str> = roles.iter().map(|r| r.name.as_str()).collect();
    let ids = resolver.resolve_all(ReferenceKind::Role, &names).await?;
    Ok(roles
        .iter()
        .zip(ids)
        .map(|(role, id)| RolePolicyEntry {
            id,
            required: role.required,
        })
        .collect())
}

fn time_policy(common: PolicyRepresentation, window: &TimePolicy) -> PolicyRepresentation {
    PolicyRepresentation {
        not_before: window.not_before.clone(),
        not_on_or_after: window.not_on_or_after.clone(),
        day_month: window.day_month.clone(),
        day_month_end: window.day_month_end.clone(),
        month: window.month.clone(),
        month_end: window.month_end.clone(),
        hour: window.hour.clone(),
        hour_end: window.hour_end.clone(),
        minute: window.minute.clone(),
        minute_end: window.minute_end.clone(),
        ..common
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{DecisionStrategy, Logic};

    #[test]
    fn test_time_policy_copies_window_and_common_fields() {
        let policy = Policy {
            name: "office-hours".to_string(),
            description: Some("weekdays only".to_string()),
            decision_strategy: DecisionStrategy::Affirmative,
            logic: Logic::Negative,
            kind: PolicyKind::Time(TimePolicy {
                not_before: Some("2024-01-01 00:00:00".to_string()),
                hour: Some("8".to_string()),
                hour_end: Some("18".to_string()),
                ..Default::default()
            }),
        };
        let common = PolicyRepresentation {
            name: policy.name.clone(),
            policy_type: policy.kind.type_name().to_string(),
            description: policy.description.clone(),
            decision_strategy: Some(policy.decision_strategy.as_str().to_string()),
            logic: Some(policy.logic.as_str().to_string()),
            ..Default::default()
        };
        let PolicyKind::Time(window) = &policy.kind else {
            panic!("time policy expected");
        };
        let converted = time_policy(common, window);

        assert_eq!(converted.policy_type, "time");
        assert_eq!(converted.logic.as_deref(), Some("NEGATIVE"));
        assert_eq!(converted.decision_strategy.as_deref(), Some("AFFIRMATIVE"));
        assert_eq!(converted.hour.as_deref(), Some("8"));
        assert_eq!(converted.hour_end.as_deref(), Some("18"));
        assert!(converted.not_on_or_after.is_none());
        assert!(converted.users.is_none());
    }
}
