//! # Reconciliation Logic
//!
//! One attempt per call: validate the document, resolve its client secret, run
//! the chain against Keycloak, then write the outcome to status and decide when
//! to come back.
//!
//! Failures are handled here rather than in the error policy: the failure
//! count is part of the status, so the next delay is computed from what the
//! document itself records. Only failures to write status reach the error
//! policy.

mod finalize;

pub use finalize::{
    DeletionOutcome, delete_remote_client, ensure_finalizer, finalize, has_finalizer,
    remove_finalizer,
};

use crate::config::ControllerConfig;
use crate::constants::STATUS_OK;
use crate::controller::backoff::LinearBackoff;
use crate::controller::reconciler::chain::{Chain, ErrorClass};
use crate::controller::reconciler::secret::resolve_client_secret;
use crate::controller::reconciler::status::{
    ConditionReporter, KubeStatusSink, RECONCILIATION_SUCCEEDED, clear_manual_trigger_annotation,
    write_status,
};
use crate::controller::reconciler::types::{Reconciler, ReconcilerError, TriggerSource};
use crate::controller::reconciler::validation::validate_keycloak_client;
use crate::crd::{Condition, KeycloakClient, KeycloakClientStatus};
use crate::keycloak::KeycloakConnector;
use crate::observability;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use kube::{Api, ResourceExt};
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How an attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Succeeded,
    Failed(ErrorClass),
}

/// What the control loop does after an attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptPlan {
    pub outcome: AttemptOutcome,
    pub requeue_after: Duration,
    /// Failure count to store in status
    pub failure_count: i64,
    /// `OK`, or the fully wrapped error
    pub value: String,
}

impl AttemptPlan {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.outcome == AttemptOutcome::Succeeded
    }

    /// Label for the requeue metric
    #[must_use]
    pub fn requeue_reason(&self) -> &'static str {
        match self.outcome {
            AttemptOutcome::Succeeded => "success",
            AttemptOutcome::Failed(ErrorClass::UpstreamUnavailable) => "keycloak-unavailable",
            AttemptOutcome::Failed(_) => "error-backoff",
        }
    }

    /// Reason of the `Ready` condition
    #[must_use]
    pub fn ready_reason(&self) -> &'static str {
        match self.outcome {
            AttemptOutcome::Succeeded => RECONCILIATION_SUCCEEDED,
            AttemptOutcome::Failed(class) => class.reason(),
        }
    }
}

/// Decide the next delay and failure count from the result of an attempt
///
/// - success: count reset, requeue after the success interval
/// - Keycloak unavailable: count untouched, fixed retry
/// - anything else: `base * (count + 1)`, then the count goes up by one
pub fn plan_next_attempt<T>(
    result: &Result<T>,
    failure_count: i64,
    config: &ControllerConfig,
) -> AttemptPlan {
    let error = match result {
        Ok(_) => {
            return AttemptPlan {
                outcome: AttemptOutcome::Succeeded,
                requeue_after: config.success_requeue_duration(),
                failure_count: 0,
                value: STATUS_OK.to_string(),
            };
        }
        Err(error) => error,
    };

    let class = ErrorClass::of(error);
    let value = format!("{error:#}");
    let failure_count = failure_count.max(0);

    if class == ErrorClass::UpstreamUnavailable {
        return AttemptPlan {
            outcome: AttemptOutcome::Failed(class),
            requeue_after: config.keycloak_unavailable_requeue_duration(),
            failure_count,
            value,
        };
    }

    AttemptPlan {
        outcome: AttemptOutcome::Failed(class),
        requeue_after: LinearBackoff::new(config.failure_backoff_base_duration())
            .delay(failure_count),
        failure_count: failure_count.saturating_add(1),
        value,
    }
}

/// Status after an attempt
///
/// `clientId` keeps its previous value when the attempt did not learn one.
#[must_use]
pub fn next_status(
    previous: Option<&KeycloakClientStatus>,
    plan: &AttemptPlan,
    client_uuid: Option<String>,
    generation: Option<i64>,
    conditions: Vec<Condition>,
    now: DateTime<Utc>,
) -> KeycloakClientStatus {
    let next_reconcile_time = chrono::Duration::from_std(plan.requeue_after)
        .ok()
        .and_then(|delay| now.checked_add_signed(delay))
        .map(|at| at.to_rfc3339());

    KeycloakClientStatus {
        value: Some(plan.value.clone()),
        client_id: client_uuid.or_else(|| previous.and_then(|s| s.client_id.clone())),
        failure_count: plan.failure_count,
        conditions,
        observed_generation: generation,
        last_reconcile_time: Some(now.to_rfc3339()),
        next_reconcile_time,
    }
}

/// Connect to Keycloak and run the standard chain
///
/// Returns the UUID of the remote client.
///
/// # Errors
/// `KeycloakError::Unavailable` when no session can be opened, otherwise the
/// failing step as `ChainError`, both with context.
pub async fn run_attempt(
    connector: &dyn KeycloakConnector,
    document: &KeycloakClient,
    secret: Option<String>,
    reporter: &mut ConditionReporter<'_>,
) -> Result<String> {
    let spec = &document.spec;
    let api = connector
        .connect()
        .await
        .context("Failed to connect to Keycloak")?;

    let ctx = Chain::standard()
        .run(api.as_ref(), document, &spec.realm, secret, reporter)
        .await
        .with_context(|| {
            format!(
                "Failed to reconcile client {:?} in realm {:?}",
                spec.client_id, spec.realm
            )
        })?;

    ctx.into_client_uuid()
        .context("Client step finished without a client UUID")
}

/// Validate, resolve the secret and run the chain
async fn attempt(
    ctx: &Reconciler,
    document: &KeycloakClient,
    namespace: &str,
    reporter: &mut ConditionReporter<'_>,
) -> Result<String> {
    validate_keycloak_client(&document.spec).context("Invalid KeycloakClient")?;

    let secret = if document.spec.public {
        None
    } else {
        resolve_client_secret(&ctx.client, namespace, &document.spec.secret)
            .await
            .context("Failed to resolve client secret")?
    };

    run_attempt(ctx.connector.as_ref(), document, secret, reporter).await
}

/// Main reconciliation function
pub async fn reconcile(
    document: Arc<KeycloakClient>,
    ctx: Arc<Reconciler>,
    trigger_source: TriggerSource,
) -> Result<Action, ReconcilerError> {
    let start = Instant::now();
    let name = document.name_any();
    let namespace = document.namespace().unwrap_or_else(|| "default".to_string());
    let api: Api<KeycloakClient> = Api::namespaced(ctx.client.clone(), &namespace);

    info!(
        "🔄 Reconciling KeycloakClient: {}/{} (trigger source: {})",
        namespace,
        name,
        trigger_source.as_str()
    );
    observability::metrics::increment_reconciliations();

    if document.is_being_deleted() {
        return finalize(&api, &document, &ctx).await;
    }
    ensure_finalizer(&api, &document).await?;

    let generation = document.metadata.generation;
    let sink = KubeStatusSink::new(api.clone(), name.clone());
    let existing = document
        .status
        .as_ref()
        .map(|s| s.conditions.as_slice())
        .unwrap_or_default();
    let mut reporter = ConditionReporter::new(&sink, generation, existing);

    let result = attempt(&ctx, &document, &namespace, &mut reporter).await;
    let plan = plan_next_attempt(&result, document.failure_count(), &ctx.config);

    let mut table = reporter.into_table();
    let ready_message = if plan.succeeded() {
        format!(
            "client {:?} is in sync with realm {:?}",
            document.spec.client_id, document.spec.realm
        )
    } else {
        plan.value.clone()
    };
    table.set_ready(plan.succeeded(), plan.ready_reason(), &ready_message, generation);

    let status = next_status(
        document.status.as_ref(),
        &plan,
        result.as_ref().ok().cloned(),
        generation,
        table.to_conditions(),
        Utc::now(),
    );
    write_status(&api, &name, &status).await?;

    if plan.succeeded() {
        if document.has_manual_trigger() {
            if let Err(e) = clear_manual_trigger_annotation(&api, &name).await {
                warn!("Failed to clear manual trigger annotation: {:#}", e);
            } else {
                debug!("Cleared manual trigger annotation after successful reconciliation");
            }
        }
        info!(
            "✅ Reconciliation complete for {}/{} (duration: {:.2}s)",
            namespace,
            name,
            start.elapsed().as_secs_f64()
        );
    } else {
        observability::metrics::increment_reconciliation_errors();
        warn!(
            resource.name = name.as_str(),
            resource.namespace = namespace.as_str(),
            failure_count = plan.failure_count,
            error = plan.value.as_str(),
            "❌ Reconciliation failed"
        );
    }

    observability::metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());
    observability::metrics::increment_requeues_total(plan.requeue_reason());
    info!(
        "📅 Next reconciliation of {}/{} in {}s ({})",
        namespace,
        name,
        plan.requeue_after.as_secs(),
        plan.requeue_reason()
    );
    Ok(Action::requeue(plan.requeue_after))
}
