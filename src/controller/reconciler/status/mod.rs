//! # Status Management
//!
//! Writes reconciliation results back to `KeycloakClient` status.
//!
//! - `conditions.rs` - Per-step conditions, the condition table and reporter
//!
//! Status is written with merge patches, so `conditions` is always replaced as
//! a whole list.

pub mod conditions;

pub use conditions::{
    ConditionReporter, ConditionTable, READY_CONDITION, RECONCILIATION_SUCCEEDED, SkipReason,
    StatusSink, StepKey, SyncOutcome,
};

use crate::constants::{FIELD_MANAGER, RECONCILE_TRIGGER_ANNOTATION};
use crate::crd::{Condition, KeycloakClient, KeycloakClientStatus};
use anyhow::{Context, Result};
use async_trait::async_trait;
use kube::Api;
use kube::api::{Patch, PatchParams};
use tracing::debug;

/// Persists conditions to the status subresource of one `KeycloakClient`
pub struct KubeStatusSink {
    api: Api<KeycloakClient>,
    name: String,
}

impl KubeStatusSink {
    #[must_use]
    pub fn new(api: Api<KeycloakClient>, name: impl Into<String>) -> Self {
        Self {
            api,
            name: name.into(),
        }
    }
}

impl std::fmt::Debug for KubeStatusSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStatusSink")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl StatusSink for KubeStatusSink {
    async fn write_conditions(&self, conditions: &[Condition]) -> Result<()> {
        let patch = serde_json::json!({
            "status": {
                "conditions": conditions
            }
        });
        self.api
            .patch_status(
                &self.name,
                &PatchParams::apply(FIELD_MANAGER),
                &Patch::Merge(patch),
            )
            .await
            .with_context(|| format!("Failed to write conditions of KeycloakClient {}", self.name))?;
        Ok(())
    }
}

/// Replace the whole status of a `KeycloakClient`
pub async fn write_status(
    api: &Api<KeycloakClient>,
    name: &str,
    status: &KeycloakClientStatus,
) -> Result<()> {
    let patch = serde_json::json!({
        "status": status
    });
    api.patch_status(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(patch))
        .await
        .with_context(|| format!("Failed to update status of KeycloakClient {name}"))?;
    debug!(resource.name = name, value = ?status.value, "Status updated");
    Ok(())
}

/// Remove the manual reconcile annotation after a successful run
pub async fn clear_manual_trigger_annotation(api: &Api<KeycloakClient>, name: &str) -> Result<()> {
    let patch = serde_json::json!({
        "metadata": {
            "annotations": {
                RECONCILE_TRIGGER_ANNOTATION: serde_json::Value::Null
            }
        }
    });
    api.patch(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(patch))
        .await
        .with_context(|| {
            format!("Failed to clear manual trigger annotation of KeycloakClient {name}")
        })?;
    debug!(resource.name = name, "Cleared manual trigger annotation");
    Ok(())
}
