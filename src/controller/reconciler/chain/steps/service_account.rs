//! Service account user of a confidential client.
//!
//! Realm role mappings, client role mappings and group membership are synced by
//! name: missing ones are added, extra ones removed unless the strategy is
//! `addOnly`. Declared attributes are merged under `addOnly` and replaced under
//! `full`; without a declaration the user's attributes are not touched.

use crate::controller::reconciler::chain::diff_sync::SyncReport;
use crate::controller::reconciler::chain::error::SyncError;
use crate::controller::reconciler::chain::resolver::{ReferenceKind, Resolver};
use crate::controller::reconciler::chain::{ChainContext, SyncStep};
use crate::controller::reconciler::status::{StepKey, SyncOutcome};
use crate::crd::{KeycloakClient, ReconciliationStrategy, ServiceAccount};
use crate::keycloak::{KeycloakApi, RoleRepresentation, UserRepresentation};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceAccountStep;

#[async_trait]
impl SyncStep for ServiceAccountStep {
    fn key(&self) -> StepKey {
        StepKey::ServiceAccount
    }

    async fn sync(
        &self,
        ctx: &mut ChainContext<'_>,
        document: &KeycloakClient,
    ) -> Result<SyncOutcome, SyncError> {
        let Some(account) = document.spec.service_account.as_ref().filter(|sa| sa.enabled) else {
            return Ok(SyncOutcome::not_configured("service account is not enabled"));
        };
        if document.spec.public {
            return Err(SyncError::Configuration(
                "service account can not be configured with a public client".to_string(),
            ));
        }

        let sync = ServiceAccountSync {
            api: ctx.api(),
            realm: ctx.realm(),
            resolver: ctx.realm_resolver(),
            strategy: ctx.strategy(),
        };
        let user = sync
            .api
            .get_service_account_user(sync.realm, ctx.client_uuid()?)
            .await
            .map_err(SyncError::remote("get service account user"))?;
        let user_id = user.id.clone().ok_or_else(|| {
            SyncError::Configuration("service account user has no ID".to_string())
        })?;

        let mut report = SyncReport::default();
        sync.realm_roles(&user_id, account, &mut report).await?;
        sync.client_roles(&user_id, account, &mut report).await?;
        sync.groups(&user_id, account, &mut report).await?;

        let attributes = account
            .attributes
            .as_ref()
            .map(|desired| merge_attributes(&user.attributes, desired, sync.strategy));
        if let Some(attributes) = attributes.filter(|merged| *merged != user.attributes) {
            let updated = UserRepresentation {
                attributes,
                ..user
            };
            sync.api
                .update_user(sync.realm, &user_id, &updated)
                .await
                .map_err(SyncError::remote("update service account attributes"))?;
            report.updated.push("attributes".to_string());
        }

        Ok(SyncOutcome::Applied(report))
    }
}

struct ServiceAccountSync<'a> {
    api: &'a dyn KeycloakApi,
    realm: &'a str,
    resolver: Resolver<'a>,
    strategy: ReconciliationStrategy,
}

impl ServiceAccountSync<'_> {
    async fn realm_roles(
        &self,
        user_id: &str,
        account: &ServiceAccount,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        let desired = self.resolver.realm_roles(&account.realm_roles).await?;
        let current = self
            .api
            .list_user_realm_roles(self.realm, user_id)
            .await
            .map_err(SyncError::remote("list service account realm roles"))?;
        let (add, remove) = role_changes(&desired, &current, self.strategy);

        if !add.is_empty() {
            self.api
                .add_user_realm_roles(self.realm, user_id, &add)
                .await
                .map_err(SyncError::remote("add service account realm roles"))?;
            report.created.extend(add.iter().map(|r| r.name.clone()));
        }
        if !remove.is_empty() {
            self.api
                .remove_user_realm_roles(self.realm, user_id, &remove)
                .await
                .map_err(SyncError::remote("remove service account realm roles"))?;
            report.deleted.extend(remove.iter().map(|r| r.name.clone()));
        }
        Ok(())
    }

    async fn client_roles(
        &self,
        user_id: &str,
        account: &ServiceAccount,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        for mapping in &account.client_roles {
            let (client_uuid, desired) = self
                .resolver
                .client_roles(&mapping.client_id, &mapping.roles)
                .await?;
            let current = self
                .api
                .list_user_client_roles(self.realm, user_id, &client_uuid)
                .await
                .map_err(SyncError::remote(format!(
                    "list service account roles of client {:?}",
                    mapping.client_id
                )))?;
            let (add, remove) = role_changes(&desired, &current, self.strategy);

            if !add.is_empty() {
                self.api
                    .add_user_client_roles(self.realm, user_id, &client_uuid, &add)
                    .await
                    .map_err(SyncError::remote(format!(
                        "add service account roles of client {:?}",
                        mapping.client_id
                    )))?;
                report.created.extend(
                    add.iter()
                        .map(|r| format!("{}/{}", mapping.client_id, r.name)),
                );
            }
            if !remove.is_empty() {
                self.api
                    .remove_user_client_roles(self.realm, user_id, &client_uuid, &remove)
                    .await
                    .map_err(SyncError::remote(format!(
                        "remove service account roles of client {:?}",
                        mapping.client_id
                    )))?;
                report.deleted.extend(
                    remove
                        .iter()
                        .map(|r| format!("{}/{}", mapping.client_id, r.name)),
                );
            }
        }
        Ok(())
    }

    async fn groups(
        &self,
        user_id: &str,
        account: &ServiceAccount,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        let desired_ids = self
            .resolver
            .resolve_all(ReferenceKind::Group, &account.groups)
            .await?;
        let current = self
            .api
            .list_user_groups(self.realm, user_id)
            .await
            .map_err(SyncError::remote("list service account groups"))?;
        let current_ids: HashSet<&str> = current.iter().map(|g| g.id.as_str()).collect();

        for (name, group_id) in account.groups.iter().zip(&desired_ids) {
            if current_ids.contains(group_id.as_str()) {
                continue;
            }
            self.api
                .add_user_to_group(self.realm, user_id, group_id)
                .await
                .map_err(SyncError::remote(format!(
                    "add service account to group {name:?}"
                )))?;
            report.created.push(format!("group {name}"));
        }

        if self.strategy.allows_delete() {
            let desired: HashSet<&str> = desired_ids.iter().map(String::as_str).collect();
            for group in current.iter().filter(|g| !desired.contains(g.id.as_str())) {
                match self.api.remove_user_from_group(self.realm, user_id, &group.id).await {
                    Ok(()) => {}
                    Err(e) if e.is_not_found() => {
                        debug!(group = group.path.as_str(), "Group membership already gone");
                    }
                    Err(e) => {
                        return Err(SyncError::Remote {
                            action: format!("remove service account from group {:?}", group.path),
                            source: e,
                        });
                    }
                }
                report.deleted.push(format!("group {}", group.path));
            }
        }
        Ok(())
    }
}

/// Roles to add and, under `full`, roles to remove, compared by name
fn role_changes(
    desired: &[RoleRepresentation],
    current: &[RoleRepresentation],
    strategy: ReconciliationStrategy,
) -> (Vec<RoleRepresentation>, Vec<RoleRepresentation>) {
    let current_names: HashSet<&str> = current.iter().map(|r| r.name.as_str()).collect();
    let desired_names: HashSet<&str> = desired.iter().map(|r| r.name.as_str()).collect();

    let add = desired
        .iter()
        .filter(|r| !current_names.contains(r.name.as_str()))
        .cloned()
        .collect();
    let remove = if strategy.allows_delete() {
        current
            .iter()
            .filter(|r| !desired_names.contains(r.name.as_str()))
            .cloned()
            .collect()
    } else {
        Vec::new()
    };
    (add, remove)
}

/// Attributes after applying the desired ones
///
/// `addOnly` appends missing values to existing keys and keeps other keys;
/// `full` replaces the whole map.
fn merge_attributes(
    current: &BTreeMap<String, Vec<String>>,
    desired: &BTreeMap<String, Vec<String>>,
    strategy: ReconciliationStrategy,
) -> BTreeMap<String, Vec<String>> {
    if strategy.allows_delete() {
        return desired.clone();
    }
    let mut merged = current.clone();
    for (key, values) in desired {
        let existing = merged.entry(key.clone()).or_default();
        for value in values {
            if !existing.contains(value) {
                existing.push(value.clone());
            }
        }
    }
    merged
}
