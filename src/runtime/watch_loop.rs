//! # Watch Loop
//!
//! Controller watch loop that monitors `KeycloakClient` resources and triggers
//! reconciliation when changes are detected.
//!
//! The controller runs at most one reconciliation per document at a time and
//! bounds the total with `max_concurrent_reconciliations`. Status writes fire
//! watch events of their own; those are filtered out by [`decide`] unless the
//! document carries a manual trigger or its scheduled time has come.

use crate::config::ControllerConfig;
use crate::controller::reconciler::{Reconciler, ReconcilerError, TriggerSource, reconcile};
use crate::controller::server::ServerState;
use crate::crd::KeycloakClient;
use crate::runtime::error_policy::{handle_reconciliation_error, handle_watch_stream_error};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use kube::api::Api;
use kube_runtime::{Controller, controller, controller::Action, watcher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{Instrument, debug, error, info, warn};

/// Scheduled times are treated as due this early, absorbing timer jitter
const SCHEDULE_TOLERANCE_SECS: i64 = 2;

/// What to do with a watch event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchDecision {
    Reconcile(TriggerSource),
    /// Nothing changed; wait for the next scheduled attempt if one is recorded
    Skip { requeue_after: Option<Duration> },
}

/// Decide whether a watch event needs a reconciliation
#[must_use]
pub fn decide(document: &KeycloakClient, now: DateTime<Utc>) -> WatchDecision {
    if document.is_being_deleted() {
        return WatchDecision::Reconcile(TriggerSource::Deletion);
    }
    if document.has_manual_trigger() {
        return WatchDecision::Reconcile(TriggerSource::ManualAnnotation);
    }

    let generation = document.metadata.generation.unwrap_or(0);
    let status = document.status.as_ref();
    let observed_generation = status.and_then(|s| s.observed_generation).unwrap_or(0);
    if observed_generation == 0 || generation != observed_generation {
        return WatchDecision::Reconcile(TriggerSource::SpecChange);
    }

    let next_time = status
        .and_then(|s| s.next_reconcile_time.as_deref())
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map(|t| t.with_timezone(&Utc));
    match next_time {
        Some(next) if now >= next - chrono::Duration::seconds(SCHEDULE_TOLERANCE_SECS) => {
            WatchDecision::Reconcile(TriggerSource::Scheduled)
        }
        Some(next) => WatchDecision::Skip {
            requeue_after: (next - now).to_std().ok(),
        },
        None => WatchDecision::Skip {
            requeue_after: None,
        },
    }
}

/// Run the controller watch loop
///
/// Sets up the Kubernetes controller, handles graceful shutdown and restarts
/// the watch when its stream ends.
pub async fn run_watch_loop(
    documents: Api<KeycloakClient>,
    reconciler: Arc<Reconciler>,
    server_state: Arc<ServerState>,
    config: ControllerConfig,
) -> Result<(), anyhow::Error> {
    info!("Starting controller watch loop...");

    let backoff_duration_ms = Arc::new(AtomicU64::new(config.backoff_start_ms));

    // Mark server as not ready when SIGTERM/SIGINT is received
    let shutdown_server_state = server_state.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received shutdown signal (SIGINT/SIGTERM), initiating graceful shutdown...");

        shutdown_server_state
            .is_ready
            .store(false, Ordering::Relaxed);
        info!("Marked server as not ready, waiting for in-flight reconciliations to complete...");
    });

    loop {
        if !server_state.is_ready.load(Ordering::Relaxed) {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        let backoff_clone = backoff_duration_ms.clone();
        let backoff_start_ms = config.backoff_start_ms;
        let max_backoff_ms = config.backoff_max_ms;
        let watch_restart_delay_secs = config.watch_restart_delay_secs;
        let watch_span = tracing::span!(
            tracing::Level::INFO,
            "controller.watch",
            operation = "watch_loop"
        );
        watch_span.in_scope(|| {
            info!(
                max_concurrent_reconciliations = config.max_concurrent_reconciliations,
                "Starting controller watch..."
            );
        });
        let controller_future =
            Controller::new(documents.clone(), watcher::Config::default().any_semantic())
                .with_config(
                    controller::Config::default()
                        .concurrency(config.max_concurrent_reconciliations),
                )
                .shutdown_on_signal()
                .run(
                    create_reconcile_fn,
                    handle_reconciliation_error,
                    reconciler.clone(),
                )
                .filter_map(move |x| {
                    let backoff = backoff_clone.clone();
                    async move {
                        match &x {
                            Ok(_) => {
                                backoff.store(backoff_start_ms, Ordering::Relaxed);
                                debug!("watch.event.success");
                                Some(x)
                            }
                            Err(e) => {
                                let error_string = format!("{e:?}");
                                handle_watch_stream_error(
                                    &error_string,
                                    &backoff,
                                    max_backoff_ms,
                                    watch_restart_delay_secs,
                                )
                                .await
                                .map(|()| x)
                            }
                        }
                    }
                })
                .for_each(|_| futures::future::ready(()));

        controller_future.instrument(watch_span).await;

        if !server_state.is_ready.load(Ordering::Relaxed) {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        let delay = config.watch_restart_delay_after_end_duration();
        warn!(
            "Controller watch stream ended, restarting in {} seconds...",
            delay.as_secs()
        );
        tokio::time::sleep(delay).await;
    }

    info!("Controller stopped gracefully");
    Ok(())
}

/// Create the reconciliation function for the controller
fn create_reconcile_fn(
    obj: Arc<KeycloakClient>,
    ctx: Arc<Reconciler>,
) -> impl std::future::Future<Output = Result<Action, ReconcilerError>> + Send {
    let name = obj
        .metadata
        .name
        .as_deref()
        .unwrap_or("unknown")
        .to_string();
    let namespace = obj
        .metadata
        .namespace
        .as_deref()
        .unwrap_or("default")
        .to_string();
    let resource_version = obj
        .metadata
        .resource_version
        .as_deref()
        .unwrap_or("unknown")
        .to_string();
    let generation = obj.metadata.generation.unwrap_or(0);
    let observed_generation = obj
        .status
        .as_ref()
        .and_then(|s| s.observed_generation)
        .unwrap_or(0);

    let reconcile_span = tracing::span!(
        tracing::Level::INFO,
        "controller.watch.reconcile",
        resource.name = name.as_str(),
        resource.namespace = namespace.as_str(),
        resource.version = resource_version.as_str(),
        resource.generation = generation,
        resource.observed_generation = observed_generation,
        event.r#type = "watch_triggered"
    );
    async move {
        let trigger_source = match decide(&obj, Utc::now()) {
            WatchDecision::Reconcile(trigger_source) => trigger_source,
            WatchDecision::Skip { requeue_after } => {
                debug!(
                    resource.name = name.as_str(),
                    resource.namespace = namespace.as_str(),
                    generation = generation,
                    observed_generation = observed_generation,
                    "Skipping reconciliation - spec unchanged and next attempt not yet due"
                );
                // Keep the recorded schedule alive across watch restarts
                return Ok(requeue_after.map_or_else(Action::await_change, Action::requeue));
            }
        };

        debug!(
            resource.name = name.as_str(),
            resource.namespace = namespace.as_str(),
            generation = generation,
            observed_generation = observed_generation,
            trigger_source = trigger_source.as_str(),
            "watch.event.received"
        );

        let result = reconcile(obj, ctx, trigger_source).await;

        match &result {
            Ok(action) => {
                debug!(resource.name = name.as_str(), action = ?action, "watch.event.reconciled");
            }
            Err(e) => {
                error!(resource.name = name.as_str(), error = %e, "watch.event.reconciliation_failed");
            }
        }

        result
    }
    .instrument(reconcile_span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::RECONCILE_TRIGGER_ANNOTATION;
    use crate::crd::KeycloakClientStatus;
    use std::collections::BTreeMap;

    fn document(generation: i64, status: Option<KeycloakClientStatus>) -> KeycloakClient {
        let mut document: KeycloakClient = serde_json::from_value(serde_json::json!({
            "apiVersion": "keycloak.octopilot.io/v1",
            "kind": "KeycloakClient",
            "metadata": { "name": "web", "namespace": "apps" },
            "spec": { "realm": "main", "clientId": "web" }
        }))
        .expect("valid document");
        document.metadata.generation = Some(generation);
        document.status = status;
        document
    }

    fn fixed_now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .expect("valid timestamp")
            .with_timezone(&Utc)
    }

    fn observed(generation: i64, next: Option<DateTime<Utc>>) -> KeycloakClientStatus {
        KeycloakClientStatus {
            observed_generation: Some(generation),
            next_reconcile_time: next.map(|t| t.to_rfc3339()),
            ..Default::default()
        }
    }

    #[test]
    fn test_first_sighting_reconciles() {
        assert_eq!(
            decide(&document(1, None), fixed_now()),
            WatchDecision::Reconcile(TriggerSource::SpecChange)
        );
    }

    #[test]
    fn test_generation_change_reconciles() {
        let now = fixed_now();
        let next = now + chrono::Duration::seconds(600);
        assert_eq!(
            decide(&document(3, Some(observed(2, Some(next)))), now),
            WatchDecision::Reconcile(TriggerSource::SpecChange)
        );
    }

    #[test]
    fn test_status_only_change_waits_for_schedule() {
        let now = fixed_now();
        let next = now + chrono::Duration::seconds(600);
        assert_eq!(
            decide(&document(2, Some(observed(2, Some(next)))), now),
            WatchDecision::Skip {
                requeue_after: Some(Duration::from_secs(600))
            }
        );
    }

    #[test]
    fn test_due_schedule_reconciles_within_tolerance() {
        let now = fixed_now();
        let next = now + chrono::Duration::seconds(1);
        assert_eq!(
            decide(&document(2, Some(observed(2, Some(next)))), now),
            WatchDecision::Reconcile(TriggerSource::Scheduled)
        );
    }

    #[test]
    fn test_no_schedule_awaits_change() {
        assert_eq!(
            decide(&document(2, Some(observed(2, None))), fixed_now()),
            WatchDecision::Skip {
                requeue_after: None
            }
        );
    }

    #[test]
    fn test_manual_trigger_reconciles() {
        let now = fixed_now();
        let next = now + chrono::Duration::seconds(600);
        let mut doc = document(2, Some(observed(2, Some(next))));
        doc.metadata.annotations = Some(BTreeMap::from([(
            RECONCILE_TRIGGER_ANNOTATION.to_string(),
            now.to_rfc3339(),
        )]));
        assert_eq!(
            decide(&doc, now),
            WatchDecision::Reconcile(TriggerSource::ManualAnnotation)
        );
    }

    #[test]
    fn test_deletion_always_reconciles() {
        let now = fixed_now();
        let next = now + chrono::Duration::seconds(600);
        let mut doc = document(2, Some(observed(2, Some(next))));
        doc.metadata.deletion_timestamp =
            serde_json::from_value(serde_json::json!("2026-01-01T00:00:00Z"))
                .expect("valid timestamp");
        assert_eq!(
            decide(&doc, now),
            WatchDecision::Reconcile(TriggerSource::Deletion)
        );
    }
}
