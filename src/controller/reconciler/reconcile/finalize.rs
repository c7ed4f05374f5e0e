//! # Finalization
//!
//! The finalizer keeps a deleted `KeycloakClient` around until its remote
//! client is gone. The terminal pass deletes the remote client, unless the
//! preserve annotation is set, and then releases the finalizer.

use crate::constants::{FIELD_MANAGER, FINALIZER_NAME};
use crate::controller::reconciler::reconcile::{next_status, plan_next_attempt};
use crate::controller::reconciler::status::write_status;
use crate::controller::reconciler::types::{Reconciler, ReconcilerError};
use crate::crd::KeycloakClient;
use crate::keycloak::KeycloakConnector;
use crate::observability;
use anyhow::{Context, Result};
use kube::api::{Patch, PatchParams};
use kube::{Api, ResourceExt};
use kube_runtime::controller::Action;
use tracing::{debug, info, warn};

/// What the terminal pass did to the remote client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionOutcome {
    /// Preserve annotation set; nothing was sent to Keycloak
    Preserved,
    /// Remote client with this UUID was deleted
    Deleted(String),
    /// No remote client existed
    AlreadyGone,
}

#[must_use]
pub fn has_finalizer(document: &KeycloakClient) -> bool {
    document.finalizers().iter().any(|f| f == FINALIZER_NAME)
}

/// Delete the remote client a document owns
///
/// The UUID recorded in status is used when present; otherwise the client is
/// looked up by `clientId`. Not-found counts as done.
///
/// # Errors
/// Connection failures and failed Keycloak calls.
pub async fn delete_remote_client(
    connector: &dyn KeycloakConnector,
    document: &KeycloakClient,
) -> Result<DeletionOutcome> {
    if document.preserve_resources_on_deletion() {
        return Ok(DeletionOutcome::Preserved);
    }

    let spec = &document.spec;
    let api = connector
        .connect()
        .await
        .context("Failed to connect to Keycloak")?;

    let client_uuid = match document.remote_client_uuid() {
        Some(uuid) => uuid.to_string(),
        None => {
            let found = api
                .get_client(&spec.realm, &spec.client_id)
                .await
                .with_context(|| format!("Failed to look up client {:?}", spec.client_id))?;
            match found.and_then(|client| client.id) {
                Some(uuid) => uuid,
                None => return Ok(DeletionOutcome::AlreadyGone),
            }
        }
    };

    match api.delete_client(&spec.realm, &client_uuid).await {
        Ok(()) => Ok(DeletionOutcome::Deleted(client_uuid)),
        Err(e) if e.is_not_found() => Ok(DeletionOutcome::AlreadyGone),
        Err(e) => Err(e).with_context(|| {
            format!(
                "Failed to delete client {:?} from realm {:?}",
                spec.client_id, spec.realm
            )
        }),
    }
}

/// Add the finalizer if it is missing
pub async fn ensure_finalizer(api: &Api<KeycloakClient>, document: &KeycloakClient) -> Result<()> {
    if has_finalizer(document) {
        return Ok(());
    }
    let mut finalizers = document.finalizers().to_vec();
    finalizers.push(FINALIZER_NAME.to_string());
    patch_finalizers(api, document, finalizers).await?;
    debug!(resource.name = document.name_any().as_str(), "Added finalizer");
    Ok(())
}

/// Drop the finalizer so the document can go away
pub async fn remove_finalizer(api: &Api<KeycloakClient>, document: &KeycloakClient) -> Result<()> {
    let finalizers: Vec<String> = document
        .finalizers()
        .iter()
        .filter(|f| *f != FINALIZER_NAME)
        .cloned()
        .collect();
    patch_finalizers(api, document, finalizers).await
}

async fn patch_finalizers(
    api: &Api<KeycloakClient>,
    document: &KeycloakClient,
    finalizers: Vec<String>,
) -> Result<()> {
    let name = document.name_any();
    // resourceVersion turns the merge patch into a conditional update
    let patch = serde_json::json!({
        "metadata": {
            "finalizers": finalizers,
            "resourceVersion": document.resource_version(),
        }
    });
    api.patch(&name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(patch))
        .await
        .with_context(|| format!("Failed to update finalizers of KeycloakClient {name}"))?;
    Ok(())
}

/// Terminal pass for a document that is being deleted
pub async fn finalize(
    api: &Api<KeycloakClient>,
    document: &KeycloakClient,
    ctx: &Reconciler,
) -> Result<Action, ReconcilerError> {
    let name = document.name_any();
    if !has_finalizer(document) {
        return Ok(Action::await_change());
    }

    match delete_remote_client(ctx.connector.as_ref(), document).await {
        Ok(outcome) => {
            match &outcome {
                DeletionOutcome::Preserved => info!(
                    "🗑️  KeycloakClient {} deleted, keeping client {:?} in Keycloak (preserve annotation set)",
                    name, document.spec.client_id
                ),
                DeletionOutcome::Deleted(uuid) => info!(
                    "🗑️  Deleted client {:?} ({}) from realm {:?}",
                    document.spec.client_id, uuid, document.spec.realm
                ),
                DeletionOutcome::AlreadyGone => info!(
                    "🗑️  Client {:?} no longer exists in realm {:?}",
                    document.spec.client_id, document.spec.realm
                ),
            }
            remove_finalizer(api, document).await?;
            Ok(Action::await_change())
        }
        Err(e) => {
            let result: Result<()> = Err(e);
            let plan = plan_next_attempt(&result, document.failure_count(), &ctx.config);
            warn!(
                resource.name = name.as_str(),
                error = plan.value.as_str(),
                "❌ Failed to delete remote client, retrying in {}s",
                plan.requeue_after.as_secs()
            );
            observability::metrics::increment_reconciliation_errors();

            let previous = document.status.clone().unwrap_or_default();
            let status = next_status(
                Some(&previous),
                &plan,
                None,
                previous.observed_generation,
                previous.conditions.clone(),
                chrono::Utc::now(),
            );
            if let Err(e) = write_status(api, &name, &status).await {
                warn!("Failed to record deletion failure: {:#}", e);
            }

            observability::metrics::increment_requeues_total(plan.requeue_reason());
            Ok(Action::requeue(plan.requeue_after))
        }
    }
}
