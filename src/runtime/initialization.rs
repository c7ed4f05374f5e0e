//! # Initialization
//!
//! Controller initialization logic including rustls setup, tracing, metrics,
//! server startup, and Kubernetes client setup.

use crate::config::{ControllerConfig, KeycloakConfig};
use crate::controller::reconciler::{Reconciler, TriggerSource, reconcile};
use crate::controller::server::{ServerState, start_server};
use crate::crd::KeycloakClient;
use crate::keycloak::RestConnector;
use crate::observability;
use anyhow::{Context, Result};
use kube::{Client, ResourceExt, api::Api, api::ListParams};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{Instrument, error, info, warn};

/// Initialization result containing all necessary components for the controller
pub struct InitializationResult {
    pub client: Client,
    /// API for `KeycloakClient` documents across all namespaces
    pub documents: Api<KeycloakClient>,
    pub reconciler: Arc<Reconciler>,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
    pub controller_config: ControllerConfig,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field(
                "server_ready",
                &self.server_state.is_ready.load(Ordering::Relaxed),
            )
            .field("controller_config", &self.controller_config)
            .finish_non_exhaustive()
    }
}

/// Initialize the controller runtime
///
/// This function handles:
/// - rustls crypto provider setup
/// - Tracing subscriber setup
/// - Metrics registration
/// - HTTP server startup
/// - Kubernetes client creation
/// - Keycloak connector and reconciler setup
/// - Reconcile existing resources
pub async fn initialize() -> Result<InitializationResult> {
    // Required for rustls 0.23+ before anything opens a TLS connection
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        anyhow::bail!("Failed to install rustls crypto provider");
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keycloak_client_controller=info".into()),
        )
        .init();

    info!("Starting Keycloak Client Controller");
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    observability::metrics::register_metrics()?;

    let controller_config = ControllerConfig::from_env();
    let keycloak_config =
        KeycloakConfig::from_env().context("Failed to load Keycloak configuration")?;
    info!(
        keycloak.url = keycloak_config.url.as_str(),
        keycloak.auth_realm = keycloak_config.auth_realm.as_str(),
        "Loaded Keycloak configuration"
    );

    let server_state = Arc::new(ServerState {
        is_ready: Arc::new(AtomicBool::new(false)),
    });

    // Start the HTTP server in the background but wait for it before reconciling
    let server_state_clone = server_state.clone();
    let server_port = controller_config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });
    wait_for_server_ready(&server_state, &server_handle, &controller_config).await?;

    let client = Client::try_default().await?;
    let documents: Api<KeycloakClient> = Api::all(client.clone());

    let connector =
        RestConnector::new(keycloak_config).context("Failed to build Keycloak HTTP client")?;
    let reconciler = Arc::new(Reconciler::new(
        client.clone(),
        Arc::new(connector),
        controller_config.clone(),
    ));

    // Documents created before the controller started are reconciled up front
    reconcile_existing_resources(&documents, &reconciler).await;

    info!("Controller initialized, starting watch loop...");

    Ok(InitializationResult {
        client,
        documents,
        reconciler,
        server_state,
        controller_config,
    })
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
    config: &ControllerConfig,
) -> Result<()> {
    let startup_timeout = std::time::Duration::from_secs(config.server_startup_timeout_secs);
    let poll_interval = std::time::Duration::from_millis(config.server_poll_interval_ms);
    let start_time = std::time::Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state.is_ready.load(Ordering::Relaxed) {
            info!("HTTP server is ready and accepting connections");
            break;
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }

    Ok(())
}

/// Group document names by namespace, both sorted
fn resources_by_namespace(items: &[KeycloakClient]) -> BTreeMap<String, Vec<String>> {
    let mut by_namespace: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for item in items {
        by_namespace
            .entry(item.namespace().unwrap_or_else(|| "default".to_string()))
            .or_default()
            .push(item.name_any());
    }
    for names in by_namespace.values_mut() {
        names.sort();
    }
    by_namespace
}

/// Reconcile existing `KeycloakClient` resources before starting the watch
async fn reconcile_existing_resources(documents: &Api<KeycloakClient>, reconciler: &Arc<Reconciler>) {
    let existing_resources_span = tracing::span!(
        tracing::Level::INFO,
        "controller.startup.reconcile_existing",
        operation = "reconcile_existing_resources"
    );
    reconcile_existing_in_span(documents, reconciler)
        .instrument(existing_resources_span)
        .await;
}

async fn reconcile_existing_in_span(documents: &Api<KeycloakClient>, reconciler: &Arc<Reconciler>) {
    let list = match documents.list(&ListParams::default()).await {
        Ok(list) => list,
        Err(e) => {
            error!("CRD is not queryable; {:?}. Is the CRD installed?", e);
            error!("Installation: cargo run --bin crdgen | kubectl apply -f -");
            warn!("Continuing despite CRD queryability check failure - controller will retry");
            return;
        }
    };

    info!(
        "CRD is queryable, found {} existing KeycloakClient resources",
        list.items.len()
    );
    if list.items.is_empty() {
        info!("No existing KeycloakClient resources found, watch will pick up new resources");
        return;
    }

    let by_namespace = resources_by_namespace(&list.items);
    info!("Keycloak Client Controller - Startup Resource Summary");
    info!("Total Resources: {}", list.items.len());
    info!("Namespaces: {}", by_namespace.len());
    for (namespace, names) in &by_namespace {
        info!("Namespace: {}", namespace);
        info!(
            "  Resources ({}): {}",
            names.len(),
            if names.len() <= 3 {
                names.join(", ")
            } else {
                format!("{}, ... ({} total)", names[..3].join(", "), names.len())
            }
        );
    }

    for item in list.items {
        let name = item.name_any();
        let namespace = item.namespace().unwrap_or_else(|| "default".to_string());

        let resource_span = tracing::span!(
            tracing::Level::INFO,
            "controller.startup.reconcile_resource",
            resource.name = name.as_str(),
            resource.namespace = namespace.as_str(),
            resource.kind = "KeycloakClient"
        );
        let trigger_source = if item.is_being_deleted() {
            TriggerSource::Deletion
        } else {
            TriggerSource::Startup
        };
        let result = reconcile(Arc::new(item), reconciler.clone(), trigger_source)
            .instrument(resource_span.clone())
            .await;
        resource_span.in_scope(|| {
            match result {
                Ok(_action) => {
                    info!(
                        resource.name = name.as_str(),
                        resource.namespace = namespace.as_str(),
                        "reconciliation.success"
                    );
                }
                Err(e) => {
                    // One failure does not stop the rest of the startup pass
                    error!(resource.name = name.as_str(), resource.namespace = namespace.as_str(), error = %e, "reconciliation.error");
                }
            }
        });
    }

    info!("Completed startup pass over existing resources");
}
