//! # Keycloak Client Controller
//!
//! A Kubernetes controller that reconciles `KeycloakClient` documents into
//! clients of a Keycloak realm through the Keycloak admin REST API.
//!
//! ## Overview
//!
//! For every document the controller keeps the remote client, its roles,
//! client scopes, protocol mappers, service account, authorization services
//! and fine-grained admin permissions in line with the document. Each piece is
//! reported as a condition on the document, and the remote client is deleted
//! with the document unless the preserve annotation is set.
//!
//! ## Configuration
//!
//! - `KEYCLOAK_URL`, `KEYCLOAK_AUTH_REALM`, `KEYCLOAK_CLIENT_ID`
//! - `KEYCLOAK_USERNAME`/`KEYCLOAK_PASSWORD` or `KEYCLOAK_CLIENT_SECRET`
//! - `SUCCESS_RECONCILE_TIMEOUT_SECS`, `FAILURE_BACKOFF_BASE_SECS`,
//!   `KEYCLOAK_UNAVAILABLE_REQUEUE_SECS`, `MAX_CONCURRENT_RECONCILIATIONS`
//! - `METRICS_PORT` for `/metrics`, `/healthz` and `/readyz`
//! - `RUST_LOG` for the log filter

use anyhow::Result;
use keycloak_client_controller::runtime::initialization::initialize;
use keycloak_client_controller::runtime::watch_loop::run_watch_loop;

#[tokio::main]
async fn main() -> Result<()> {
    let init = initialize().await?;

    run_watch_loop(
        init.documents,
        init.reconciler,
        init.server_state,
        init.controller_config,
    )
    .await
}
