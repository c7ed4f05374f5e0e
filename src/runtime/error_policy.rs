//! # Error Policy
//!
//! Error handling for the controller watch loop.
//!
//! Failed attempts are handled inside `reconcile`, which records status and
//! schedules the linear backoff itself. What reaches this module are errors
//! the reconcile function could not record, such as a failed status write.

use crate::controller::reconciler::{Reconciler, ReconcilerError};
use crate::crd::KeycloakClient;
use crate::observability;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{Instrument, error, info, warn};

/// Handle reconciliation errors with a fixed requeue
pub fn handle_reconciliation_error(
    obj: Arc<KeycloakClient>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler>,
) -> Action {
    let name = obj.metadata.name.as_deref().unwrap_or("unknown");
    let namespace = obj.metadata.namespace.as_deref().unwrap_or("default");

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.name = name,
        resource.namespace = namespace,
        error = %error
    );
    let _error_guard = error_span.enter();

    error!("Reconciliation error for {}: {}", name, error);
    observability::metrics::increment_reconciliation_errors();

    let requeue_after = ctx.config.reconciliation_error_requeue_duration();
    let next_trigger_time = chrono::Utc::now()
        + chrono::Duration::from_std(requeue_after).unwrap_or(chrono::Duration::zero());

    info!(
        "🔄 Retrying in {}s (trigger source: error-requeue)",
        requeue_after.as_secs()
    );
    info!(
        "📅 Next retry scheduled: {} (in {}s, trigger source: error-requeue)",
        next_trigger_time.to_rfc3339(),
        requeue_after.as_secs()
    );

    observability::metrics::increment_requeues_total("error-requeue");
    Action::requeue(requeue_after)
}

/// How a watch stream error should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchErrorKind {
    /// RBAC revoked or token expired
    Unauthorized,
    /// Resource version too old; normal after restarts
    Expired,
    /// API server storage reinitializing
    Throttled,
    /// Deleted object or missing CRD
    NotFound,
    Other,
}

impl WatchErrorKind {
    /// Classify a formatted controller error
    ///
    /// 404 is checked before 401: a plain-text 404 body surfaces as a serde
    /// error wrapped in `WatchFailed`, which can also mention authorization.
    #[must_use]
    pub fn classify(error_string: &str) -> Self {
        let is_not_found = error_string.contains("ObjectNotFound")
            || error_string.contains("404")
            || error_string.contains("not found");
        let is_401 = (error_string.contains("401") || error_string.contains("Unauthorized"))
            && !is_not_found;
        let is_410 = error_string.contains("410")
            || error_string.contains("too old resource version")
            || error_string.contains("Expired")
            || error_string.contains("Gone");
        let is_429 = error_string.contains("429")
            || error_string.contains("storage is (re)initializing")
            || error_string.contains("TooManyRequests");

        if is_401 {
            Self::Unauthorized
        } else if is_410 {
            Self::Expired
        } else if is_429 {
            Self::Throttled
        } else if is_not_found {
            Self::NotFound
        } else {
            Self::Other
        }
    }
}

/// Handle watch stream errors with appropriate classification and backoff
///
/// Returns `None` to filter out the error (allow restart) or `Some(())` to continue.
pub async fn handle_watch_stream_error(
    error_string: &str,
    backoff: &Arc<AtomicU64>,
    max_backoff_ms: u64,
    watch_restart_delay_secs: u64,
) -> Option<()> {
    let error_span = tracing::span!(
        tracing::Level::WARN,
        "controller.watch.error",
        error = %error_string
    );
    async {
        match WatchErrorKind::classify(error_string) {
            WatchErrorKind::Unauthorized => {
                error!(
                    "❌ Watch authentication failed (401 Unauthorized) - RBAC may have been revoked or token expired"
                );
                error!("🔍 SRE Diagnostics:");
                error!("   1. Verify the controller ClusterRole and ClusterRoleBinding still exist");
                error!("   2. Verify the controller ServiceAccount still exists");
                error!("   3. Verify RBAC permissions are still active:");
                error!(
                    "      kubectl auth can-i list keycloakclients --as=system:serviceaccount:<namespace>:keycloak-client-controller --all-namespaces"
                );
                warn!(
                    "⏳ Waiting {}s before retrying watch (RBAC may need time to propagate)...",
                    watch_restart_delay_secs
                );
                tokio::time::sleep(Duration::from_secs(watch_restart_delay_secs)).await;
                None
            }
            WatchErrorKind::Expired => {
                warn!(
                    "Watch resource version expired (410) - this is normal during pod restarts, watch will restart"
                );
                warn!(error_type = "410", "watch.error.resource_version_expired");
                None
            }
            WatchErrorKind::Throttled => {
                let current_backoff = backoff.load(Ordering::Relaxed);
                warn!(
                    "API server storage reinitializing (429), backing off for {}ms before restart...",
                    current_backoff
                );
                tokio::time::sleep(Duration::from_millis(current_backoff)).await;
                let new_backoff = std::cmp::min(current_backoff.saturating_mul(2), max_backoff_ms);
                backoff.store(new_backoff, Ordering::Relaxed);
                None
            }
            WatchErrorKind::NotFound => {
                let resource_info = if error_string.contains("integer `404`") {
                    "CRD or resource may have been deleted (404 returned as plain text)"
                } else if error_string.contains("KeycloakClient") {
                    "KeycloakClient resource"
                } else {
                    "Resource"
                };
                warn!(
                    "{} not found (404) - this may be normal if resource was deleted or CRD is missing. Error: {}",
                    resource_info, error_string
                );
                Some(())
            }
            WatchErrorKind::Other => {
                error!("Controller stream error: {}", error_string);
                tokio::time::sleep(Duration::from_secs(watch_restart_delay_secs)).await;
                None
            }
        }
    }
    .instrument(error_span)
    .await
}
