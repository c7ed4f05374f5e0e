//! # Conditions
//!
//! Per-step conditions on `KeycloakClient` status.
//!
//! Each chain step owns exactly one condition slot, keyed by [`StepKey`]. A new
//! outcome replaces the slot; `lastTransitionTime` only moves when the status
//! flips. The overall `Ready` condition is kept after the step slots.

use crate::controller::reconciler::chain::diff_sync::SyncReport;
use crate::controller::reconciler::chain::error::{ErrorClass, SyncError};
use crate::crd::Condition;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// Condition type of the overall outcome
pub const READY_CONDITION: &str = "Ready";

/// Reason of a successful `Ready` condition
pub const RECONCILIATION_SUCCEEDED: &str = "ReconciliationSucceeded";

/// Chain steps, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StepKey {
    Client,
    ClientRoles,
    RealmRoles,
    ClientScopes,
    ProtocolMappers,
    ServiceAccount,
    AuthorizationScopes,
    Resources,
    Policies,
    Permissions,
    FineGrained,
}

impl StepKey {
    pub const ALL: [StepKey; 11] = [
        Self::Client,
        Self::ClientRoles,
        Self::RealmRoles,
        Self::ClientScopes,
        Self::ProtocolMappers,
        Self::ServiceAccount,
        Self::AuthorizationScopes,
        Self::Resources,
        Self::Policies,
        Self::Permissions,
        Self::FineGrained,
    ];

    /// Name used in error messages and logs
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::ClientRoles => "client roles",
            Self::RealmRoles => "realm roles",
            Self::ClientScopes => "client scopes",
            Self::ProtocolMappers => "protocol mappers",
            Self::ServiceAccount => "service account",
            Self::AuthorizationScopes => "authorization scopes",
            Self::Resources => "authorization resources",
            Self::Policies => "authorization policies",
            Self::Permissions => "authorization permissions",
            Self::FineGrained => "admin fine-grained permissions",
        }
    }

    #[must_use]
    pub fn condition_type(self) -> &'static str {
        match self {
            Self::Client => "ClientSynced",
            Self::ClientRoles => "ClientRolesSynced",
            Self::RealmRoles => "RealmRolesSynced",
            Self::ClientScopes => "ClientScopesSynced",
            Self::ProtocolMappers => "ProtocolMappersSynced",
            Self::ServiceAccount => "ServiceAccountSynced",
            Self::AuthorizationScopes => "AuthorizationScopesSynced",
            Self::Resources => "AuthorizationResourcesSynced",
            Self::Policies => "AuthorizationPoliciesSynced",
            Self::Permissions => "AuthorizationPermissionsSynced",
            Self::FineGrained => "AdminFineGrainedPermissionsSynced",
        }
    }

    /// Reason recorded when the step applied its changes
    ///
    /// The client step reports `ClientCreated` or `ClientUpdated` instead.
    #[must_use]
    pub fn synced_reason(self) -> &'static str {
        self.condition_type()
    }

    #[must_use]
    pub fn from_condition_type(condition_type: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|step| step.condition_type() == condition_type)
    }
}

impl fmt::Display for StepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a step did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The document does not ask for this step
    NotConfigured,
    /// Only deletes were needed and the strategy is `addOnly`
    SkippedAddOnly,
}

impl SkipReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotConfigured => "NotConfigured",
            Self::SkippedAddOnly => "SkippedAddOnly",
        }
    }
}

/// Result of one chain step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Applied(SyncReport),
    Skipped { reason: SkipReason, message: String },
    Failed { class: ErrorClass, message: String },
}

impl SyncOutcome {
    pub fn not_configured(message: impl Into<String>) -> Self {
        Self::Skipped {
            reason: SkipReason::NotConfigured,
            message: message.into(),
        }
    }

    pub fn skipped_add_only(message: impl Into<String>) -> Self {
        Self::Skipped {
            reason: SkipReason::SkippedAddOnly,
            message: message.into(),
        }
    }

    /// Failure outcome carrying the step's own error chain
    #[must_use]
    pub fn failed(error: &SyncError) -> Self {
        Self::Failed {
            class: error.class(),
            message: error_chain(error),
        }
    }

    /// Condition status: `True`, `False` or `Unknown`
    #[must_use]
    pub fn status(&self) -> &'static str {
        match self {
            Self::Applied(_) => "True",
            Self::Failed { .. } => "False",
            Self::Skipped { .. } => "Unknown",
        }
    }

    fn reason(&self, step: StepKey) -> &'static str {
        match self {
            Self::Applied(report) if step == StepKey::Client => {
                if report.created.is_empty() {
                    "ClientUpdated"
                } else {
                    "ClientCreated"
                }
            }
            Self::Applied(_) => step.synced_reason(),
            Self::Skipped { reason, .. } => reason.as_str(),
            Self::Failed { class, .. } => class.reason(),
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Applied(report) => report.summary(),
            Self::Skipped { message, .. } | Self::Failed { message, .. } => message.clone(),
        }
    }
}

/// `error: cause: cause` rendering of a std error chain
fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Step conditions keyed by [`StepKey`] plus the `Ready` condition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionTable {
    steps: BTreeMap<StepKey, Condition>,
    ready: Option<Condition>,
}

impl ConditionTable {
    /// Rebuild the table from persisted status; unknown condition types are dropped
    #[must_use]
    pub fn from_conditions(conditions: &[Condition]) -> Self {
        let mut table = Self::default();
        for condition in conditions {
            if condition.r#type == READY_CONDITION {
                table.ready = Some(condition.clone());
            } else if let Some(step) = StepKey::from_condition_type(&condition.r#type) {
                table.steps.insert(step, condition.clone());
            }
        }
        table
    }

    #[must_use]
    pub fn get(&self, step: StepKey) -> Option<&Condition> {
        self.steps.get(&step)
    }

    #[must_use]
    pub fn ready(&self) -> Option<&Condition> {
        self.ready.as_ref()
    }

    pub fn upsert(&mut self, step: StepKey, outcome: &SyncOutcome, generation: Option<i64>) {
        let condition = Condition {
            r#type: step.condition_type().to_string(),
            status: outcome.status().to_string(),
            observed_generation: generation,
            last_transition_time: None,
            reason: Some(outcome.reason(step).to_string()),
            message: Some(outcome.message()),
        };
        let previous = self.steps.get(&step);
        let condition = stamp_transition(previous, condition);
        self.steps.insert(step, condition);
    }

    pub fn set_ready(&mut self, ready: bool, reason: &str, message: &str, generation: Option<i64>) {
        let condition = Condition {
            r#type: READY_CONDITION.to_string(),
            status: if ready { "True" } else { "False" }.to_string(),
            observed_generation: generation,
            last_transition_time: None,
            reason: Some(reason.to_string()),
            message: Some(message.to_string()),
        };
        self.ready = Some(stamp_transition(self.ready.as_ref(), condition));
    }

    /// Step conditions in chain order, then `Ready`
    #[must_use]
    pub fn to_conditions(&self) -> Vec<Condition> {
        self.steps
            .values()
            .chain(self.ready.as_ref())
            .cloned()
            .collect()
    }
}

fn stamp_transition(previous: Option<&Condition>, mut next: Condition) -> Condition {
    next.last_transition_time = match previous {
        Some(previous) if previous.status == next.status => previous
            .last_transition_time
            .clone()
            .or_else(|| Some(chrono::Utc::now().to_rfc3339())),
        _ => Some(chrono::Utc::now().to_rfc3339()),
    };
    next
}

/// Where conditions are persisted
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn write_conditions(&self, conditions: &[Condition]) -> anyhow::Result<()>;
}

/// Records step outcomes and persists them after every step
///
/// Persisting is best-effort: a failed write is logged and the chain goes on.
pub struct ConditionReporter<'a> {
    table: ConditionTable,
    sink: &'a dyn StatusSink,
    generation: Option<i64>,
}

impl fmt::Debug for ConditionReporter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionReporter")
            .field("table", &self.table)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl<'a> ConditionReporter<'a> {
    #[must_use]
    pub fn new(sink: &'a dyn StatusSink, generation: Option<i64>, existing: &[Condition]) -> Self {
        Self {
            table: ConditionTable::from_conditions(existing),
            sink,
            generation,
        }
    }

    pub async fn record(&mut self, step: StepKey, outcome: &SyncOutcome) {
        self.table.upsert(step, outcome, self.generation);
        if let Err(e) = self.sink.write_conditions(&self.table.to_conditions()).await {
            warn!(
                step = step.as_str(),
                error = %format!("{e:#}"),
                "Failed to persist condition, continuing"
            );
        }
    }

    #[must_use]
    pub fn table(&self) -> &ConditionTable {
        &self.table
    }

    #[must_use]
    pub fn into_table(self) -> ConditionTable {
        self.table
    }
}
