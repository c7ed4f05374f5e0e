//! # KeycloakClient Status
//!
//! Status types for tracking reconciliation state and conditions.

use serde::{Deserialize, Serialize};

/// Status of the KeycloakClient resource
#[derive(Debug, Clone, Deserialize, Serialize, Default, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KeycloakClientStatus {
    /// `OK` after a successful reconciliation, otherwise the full error chain
    #[serde(default)]
    pub value: Option<String>,
    /// Internal UUID of the remote client
    #[serde(default)]
    pub client_id: Option<String>,
    /// Consecutive failed reconciliations; reset on success
    #[serde(default)]
    pub failure_count: i64,
    /// Per-step conditions plus the overall `Ready` condition
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub observed_generation: Option<i64>,
    #[serde(default)]
    pub last_reconcile_time: Option<String>,
    /// Next scheduled reconciliation time (RFC3339)
    /// Used to persist the requeue schedule across watch restarts
    #[serde(default)]
    pub next_reconcile_time: Option<String>,
}

/// Condition represents a condition of a resource
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    pub r#type: String,
    /// Status of the condition (True, False, Unknown)
    pub status: String,
    #[serde(default)]
    pub observed_generation: Option<i64>,
    #[serde(default)]
    pub last_transition_time: Option<String>,
    /// Machine-readable reason, e.g. `ClientRolesSynced`
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
