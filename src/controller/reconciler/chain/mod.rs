//! # Reconciliation Chain
//!
//! Ordered pipeline of sync steps that brings one Keycloak client in line with
//! its `KeycloakClient` document.
//!
//! ## Module Structure
//!
//! - `context.rs` - Per-cycle state shared by the steps
//! - `diff_sync.rs` - Generic create/update/delete engine for named collections
//! - `resolver.rs` - Name to ID resolution across kinds
//! - `convert.rs` - Authorization payload builders
//! - `error.rs` - Step errors and their classification
//! - `steps/` - The steps themselves
//!
//! ## Execution
//!
//! Steps run one after another. Each outcome is recorded as a condition before
//! the next step starts; the first failure stops the chain and leaves earlier
//! changes in place.

pub mod context;
pub mod convert;
pub mod diff_sync;
pub mod error;
pub mod resolver;
pub mod steps;

pub use context::ChainContext;
pub use diff_sync::{RemoteEntityIndex, RemoteEntry, SyncReport, SyncTarget, diff_sync};
pub use error::{ChainError, ErrorClass, SyncError};
pub use resolver::{ReferenceKind, Resolver};

use crate::controller::reconciler::status::{ConditionReporter, StepKey, SyncOutcome};
use crate::crd::KeycloakClient;
use crate::keycloak::KeycloakApi;
use crate::observability::metrics;
use async_trait::async_trait;
use tracing::{Instrument, debug, info_span, warn};

/// One step of the chain
///
/// Steps hold no state of their own; everything they learn during a cycle goes
/// into the [`ChainContext`].
#[async_trait]
pub trait SyncStep: Send + Sync {
    fn key(&self) -> StepKey;

    async fn sync(
        &self,
        ctx: &mut ChainContext<'_>,
        document: &KeycloakClient,
    ) -> Result<SyncOutcome, SyncError>;
}

/// Ordered list of steps
pub struct Chain {
    steps: Vec<Box<dyn SyncStep>>,
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.steps.iter().map(|step| step.key()))
            .finish()
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::standard()
    }
}

impl Chain {
    #[must_use]
    pub fn new(steps: Vec<Box<dyn SyncStep>>) -> Self {
        Self { steps }
    }

    /// The eleven steps of a full client reconciliation
    #[must_use]
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(steps::ClientStep),
            Box::new(steps::ClientRolesStep),
            Box::new(steps::RealmRolesStep),
            Box::new(steps::ClientScopesStep),
            Box::new(steps::ProtocolMappersStep),
            Box::new(steps::ServiceAccountStep),
            Box::new(steps::AuthorizationScopesStep),
            Box::new(steps::AuthorizationResourcesStep),
            Box::new(steps::AuthorizationPoliciesStep),
            Box::new(steps::AuthorizationPermissionsStep),
            Box::new(steps::FineGrainedPermissionsStep),
        ])
    }

    /// Keys of the steps, in execution order
    #[must_use]
    pub fn keys(&self) -> Vec<StepKey> {
        self.steps.iter().map(|step| step.key()).collect()
    }

    /// Run every step against `document`
    ///
    /// Returns the context so the caller can read what the steps learned, most
    /// importantly the client UUID.
    ///
    /// # Errors
    /// The first failing step, wrapped as [`ChainError`].
    pub async fn run<'a>(
        &self,
        api: &'a dyn KeycloakApi,
        document: &KeycloakClient,
        realm: &'a str,
        secret: Option<String>,
        reporter: &mut ConditionReporter<'_>,
    ) -> Result<ChainContext<'a>, ChainError> {
        let mut ctx = ChainContext::new(
            api,
            realm,
            document.spec.reconciliation_strategy,
            secret,
        );

        for step in &self.steps {
            let key = step.key();
            let span = info_span!("chain.step", step = key.as_str(), realm = realm);
            match step.sync(&mut ctx, document).instrument(span).await {
                Ok(outcome) => {
                    debug!(step = key.as_str(), status = outcome.status(), "Step finished");
                    reporter.record(key, &outcome).await;
                }
                Err(source) => {
                    warn!(
                        step = key.as_str(),
                        error = %source,
                        "Step failed, stopping chain"
                    );
                    metrics::increment_step_failures(key.as_str());
                    reporter.record(key, &SyncOutcome::failed(&source)).await;
                    return Err(ChainError { step: key, source });
                }
            }
        }

        Ok(ctx)
    }
}
