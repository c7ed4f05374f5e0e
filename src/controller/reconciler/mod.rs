//! # Reconciler
//!
//! Core reconciliation logic for `KeycloakClient` resources.
//!
//! The reconciler:
//! - Validates the document and resolves its client secret
//! - Runs the reconciliation chain against the Keycloak admin API
//! - Records one condition per chain step, plus `Ready`
//! - Schedules the next attempt from the outcome
//! - Deletes the remote client when the document goes away
//!
//! ## Reconciliation Flow
//!
//! 1. Add the finalizer (or run the terminal pass when deleting)
//! 2. Validate the document
//! 3. Read the client secret from its Kubernetes Secret
//! 4. Connect to Keycloak
//! 5. Run the chain: client, roles, scopes, mappers, service account,
//!    authorization, fine-grained permissions
//! 6. Write status and requeue

pub mod chain;
pub mod reconcile;
pub mod secret;
pub mod status;
pub mod types;
pub mod validation;

// Re-export public API
pub use reconcile::{AttemptOutcome, AttemptPlan, plan_next_attempt, reconcile, run_attempt};
pub use types::{Reconciler, ReconcilerError, TriggerSource};
